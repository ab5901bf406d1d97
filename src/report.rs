use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;

use crate::dataset::{MergeSummary, SeasonRecord};
use crate::identity::Resolution;
use crate::team_canon::normalize_team_name;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberStats {
    pub name: String,
    pub appearances: usize,
    pub seasons: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub team: String,
    pub canonical: String,
    pub members: Vec<MemberStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    pub unique_names: usize,
    pub affected_names: usize,
    pub groups: Vec<DuplicateGroup>,
}

impl DuplicateReport {
    /// `records` must still carry the pre-mapping names.
    pub fn build(records: &[SeasonRecord], resolution: &Resolution) -> Self {
        let unique_names = records
            .iter()
            .map(|r| r.athlete_full_name.as_str())
            .filter(|n| !n.is_empty())
            .collect::<HashSet<_>>()
            .len();

        let mut stats: BTreeMap<(String, &str), (usize, BTreeSet<i32>)> = BTreeMap::new();
        for r in records {
            let key = normalize_team_name(r.team_name.as_deref());
            let entry = stats
                .entry((key, r.athlete_full_name.as_str()))
                .or_default();
            entry.0 += 1;
            if let Some(year) = r.season_year {
                entry.1.insert(year);
            }
        }

        let groups = resolution
            .clusters
            .iter()
            .map(|cluster| DuplicateGroup {
                team: cluster.team.clone(),
                canonical: cluster.canonical.clone(),
                members: cluster
                    .members
                    .iter()
                    .map(|name| {
                        let (appearances, seasons) = stats
                            .get(&(cluster.team_key.clone(), name.as_str()))
                            .map(|(n, s)| (*n, s.iter().copied().collect()))
                            .unwrap_or_default();
                        MemberStats {
                            name: name.clone(),
                            appearances,
                            seasons,
                        }
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();

        Self {
            unique_names,
            affected_names: groups.iter().map(|g| g.members.len()).sum(),
            groups,
        }
    }

    pub fn affected_pct(&self) -> f64 {
        if self.unique_names == 0 {
            return 0.0;
        }
        self.affected_names as f64 / self.unique_names as f64 * 100.0
    }
}

impl fmt::Display for DuplicateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unique athlete names: {}", self.unique_names)?;
        writeln!(f, "Duplicate groups: {}", self.groups.len())?;
        writeln!(
            f,
            "Names affected: {} ({:.2}%)",
            self.affected_names,
            self.affected_pct()
        )?;
        for (idx, group) in self.groups.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "{}. Team: {} -> {}", idx + 1, group.team, group.canonical)?;
            for m in &group.members {
                let seasons = m
                    .seasons
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(
                    f,
                    "   - {} (appearances: {}, seasons: [{}])",
                    m.name, m.appearances, seasons
                )?;
            }
        }
        Ok(())
    }
}

/// Records per team spelling, alphabetical. Blank names are skipped.
pub fn team_counts<'a, I>(names: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        *counts.entry(name.to_string()).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows read: {}", self.rows_read)?;
        writeln!(
            f,
            "Rows written: {} ({} duplicates removed)",
            self.rows_written, self.duplicates_removed
        )?;
        writeln!(
            f,
            "Athletes: {} -> {}",
            self.athletes_before, self.athletes_after
        )?;
        writeln!(f, "Teams: {} -> {}", self.teams_before, self.teams_after)?;
        writeln!(
            f,
            "Name clusters: {} ({} names standardized)",
            self.clusters, self.names_standardized
        )?;
        writeln!(
            f,
            "Corrections applied: {}, pending review: {}",
            self.corrections_applied, self.review_pending
        )?;
        write!(f, "Records with pace data: {}", self.records_with_pace)
    }
}
