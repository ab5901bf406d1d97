use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::team_canon::normalize_team_name;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// 1 - edit distance / longer length.
    #[default]
    Levenshtein,
    JaroWinkler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusteringMode {
    /// Each unclaimed name seeds a cluster and claims every later unclaimed
    /// name that matches the seed directly. Order dependent.
    #[default]
    FirstMatch,
    /// Connected components of the match graph inside a surname group.
    Transitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub similarity_threshold: f64,
    pub substring_rule: bool,
    pub metric: SimilarityMetric,
    pub clustering: ClusteringMode,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            substring_rule: true,
            metric: SimilarityMetric::default(),
            clustering: ClusteringMode::default(),
        }
    }
}

impl ResolverConfig {
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let a = a.to_lowercase();
        let b = b.to_lowercase();
        match self.metric {
            SimilarityMetric::Levenshtein => strsim::normalized_levenshtein(&a, &b),
            SimilarityMetric::JaroWinkler => strsim::jaro_winkler(&a, &b),
        }
    }

    /// Whether two names (already known to share team and surname) look
    /// like the same athlete.
    pub fn is_match(&self, a: &str, b: &str) -> bool {
        if self.similarity(a, b) >= self.similarity_threshold {
            return true;
        }
        if !self.substring_rule {
            return false;
        }
        let first_a = first_and_last(a).0.to_lowercase();
        let first_b = first_and_last(b).0.to_lowercase();
        first_a.contains(&first_b) || first_b.contains(&first_a)
    }
}

/// First and last whitespace token. A single-token name has no surname.
pub fn first_and_last(full_name: &str) -> (&str, &str) {
    let parts = full_name.split_whitespace().collect::<Vec<_>>();
    match parts.as_slice() {
        [] => ("", ""),
        [only] => (*only, ""),
        [first, .., last] => (*first, *last),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCluster {
    /// Normalized team key shared by every member.
    pub team_key: String,
    /// First raw team spelling seen for that key.
    pub team: String,
    /// Raw names in first-encountered order.
    pub members: Vec<String>,
    pub canonical: String,
}

impl NameCluster {
    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .map(String::as_str)
            .filter(|name| *name != self.canonical)
    }
}

/// Longest name wins; the earliest one on ties.
pub fn choose_canonical(members: &[String]) -> Option<&String> {
    let mut best: Option<&String> = None;
    for name in members {
        let longer = best.is_none_or(|b| name.chars().count() > b.chars().count());
        if longer {
            best = Some(name);
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub team: String,
    pub original_name: String,
    pub standardized_name: String,
}

/// Team-scoped rename table.
///
/// Heuristic renames are keyed by normalized team. Curated overrides are
/// layered on top and always win; an override with no team applies on
/// every team.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMapping {
    heuristic: BTreeMap<(String, String), String>,
    overrides: BTreeMap<(String, String), String>,
    global_overrides: BTreeMap<String, String>,
    team_labels: HashMap<String, String>,
}

impl NameMapping {
    pub fn insert_heuristic(&mut self, team_key: &str, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.heuristic
            .insert((team_key.to_string(), from.to_string()), to.to_string());
    }

    pub fn insert_override(&mut self, team: Option<&str>, from: &str, to: &str) {
        let team_key = normalize_team_name(team);
        if team_key.is_empty() {
            self.global_overrides
                .insert(from.to_string(), to.to_string());
        } else {
            if let Some(label) = team {
                self.team_labels
                    .entry(team_key.clone())
                    .or_insert_with(|| label.trim().to_string());
            }
            self.overrides
                .insert((team_key, from.to_string()), to.to_string());
        }
    }

    fn label_team(&mut self, team_key: &str, label: &str) {
        self.team_labels
            .entry(team_key.to_string())
            .or_insert_with(|| label.to_string());
    }

    fn override_for(&self, team_key: &str, name: &str) -> Option<&str> {
        self.overrides
            .get(&(team_key.to_string(), name.to_string()))
            .or_else(|| self.global_overrides.get(name))
            .map(String::as_str)
    }

    /// Final name for `name` observed under `team`.
    pub fn resolve<'a>(&'a self, team: Option<&str>, name: &'a str) -> &'a str {
        let team_key = normalize_team_name(team);
        if let Some(corrected) = self.override_for(&team_key, name) {
            return corrected;
        }
        let merged = self
            .heuristic
            .get(&(team_key.clone(), name.to_string()))
            .map(String::as_str)
            .unwrap_or(name);
        self.override_for(&team_key, merged).unwrap_or(merged)
    }

    /// Heuristic renames still in effect, i.e. not shadowed by an override.
    pub fn heuristic_len(&self) -> usize {
        self.heuristic
            .keys()
            .filter(|key| {
                !self.overrides.contains_key(*key) && !self.global_overrides.contains_key(&key.1)
            })
            .count()
    }

    pub fn override_len(&self) -> usize {
        self.overrides.len() + self.global_overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heuristic.is_empty() && self.override_len() == 0
    }

    /// Every rename, overrides first, in a stable order.
    pub fn entries(&self) -> Vec<MappingEntry> {
        let label = |key: &str| {
            self.team_labels
                .get(key)
                .cloned()
                .unwrap_or_else(|| key.to_string())
        };
        let mut out = Vec::new();
        for (from, to) in &self.global_overrides {
            out.push(MappingEntry {
                team: String::new(),
                original_name: from.clone(),
                standardized_name: to.clone(),
            });
        }
        for ((team_key, from), to) in &self.overrides {
            out.push(MappingEntry {
                team: label(team_key),
                original_name: from.clone(),
                standardized_name: to.clone(),
            });
        }
        for ((team_key, from), to) in &self.heuristic {
            if self.overrides.contains_key(&(team_key.clone(), from.clone()))
                || self.global_overrides.contains_key(from)
            {
                continue;
            }
            out.push(MappingEntry {
                team: label(team_key),
                original_name: from.clone(),
                standardized_name: to.clone(),
            });
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub clusters: Vec<NameCluster>,
    pub mapping: NameMapping,
    observed: HashSet<(String, String)>,
}

impl Resolution {
    /// Whether `name` was seen under `team`; a blank team matches any team.
    pub fn observed(&self, team: Option<&str>, name: &str) -> bool {
        let team_key = normalize_team_name(team);
        if team_key.is_empty() {
            return self.observed.iter().any(|(_, seen)| seen == name);
        }
        self.observed.contains(&(team_key, name.to_string()))
    }
}

struct TeamGroup {
    label: String,
    names: Vec<String>,
    seen: HashSet<String>,
}

/// Detects nickname and typo variants of the same athlete within a team and
/// builds the rename table. Pure batch pass; never fails.
pub fn resolve<'a, I>(observations: I, cfg: &ResolverConfig) -> Resolution
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut team_order: Vec<String> = Vec::new();
    let mut teams: HashMap<String, TeamGroup> = HashMap::new();

    for (name, team) in observations {
        let name = name.trim();
        let team_key = normalize_team_name(team);
        if name.is_empty() || team_key.is_empty() {
            continue;
        }
        let group = teams.entry(team_key.clone()).or_insert_with(|| {
            team_order.push(team_key.clone());
            TeamGroup {
                label: team.unwrap_or_default().trim().to_string(),
                names: Vec::new(),
                seen: HashSet::new(),
            }
        });
        if group.seen.insert(name.to_string()) {
            group.names.push(name.to_string());
        }
    }

    let mut out = Resolution::default();
    for (team_key, group) in &teams {
        for name in &group.names {
            out.observed.insert((team_key.clone(), name.clone()));
        }
    }
    for team_key in &team_order {
        let Some(group) = teams.get(team_key) else {
            continue;
        };
        if group.names.len() < 2 {
            continue;
        }
        for surname_group in group_by_surname(&group.names) {
            if surname_group.len() < 2 {
                continue;
            }
            let member_sets = match cfg.clustering {
                ClusteringMode::FirstMatch => cluster_first_match(&surname_group, cfg),
                ClusteringMode::Transitive => cluster_transitive(&surname_group, cfg),
            };
            for members in member_sets {
                let Some(canonical) = choose_canonical(&members).cloned() else {
                    continue;
                };
                out.mapping.label_team(team_key, &group.label);
                for member in &members {
                    out.mapping.insert_heuristic(team_key, member, &canonical);
                }
                debug!(team = %group.label, canonical = %canonical, size = members.len(), "name cluster");
                out.clusters.push(NameCluster {
                    team_key: team_key.clone(),
                    team: group.label.clone(),
                    members,
                    canonical,
                });
            }
        }
    }
    out
}

fn group_by_surname(names: &[String]) -> Vec<Vec<String>> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    for name in names {
        let surname = first_and_last(name).1.to_lowercase();
        groups
            .entry(surname.clone())
            .or_insert_with(|| {
                order.push(surname);
                Vec::new()
            })
            .push(name.clone());
    }
    order
        .into_iter()
        .filter_map(|surname| groups.remove(&surname))
        .collect()
}

fn cluster_first_match(names: &[String], cfg: &ResolverConfig) -> Vec<Vec<String>> {
    let mut claimed = vec![false; names.len()];
    let mut out = Vec::new();
    for i in 0..names.len() {
        if claimed[i] {
            continue;
        }
        let mut members = vec![names[i].clone()];
        for j in (i + 1)..names.len() {
            if claimed[j] {
                continue;
            }
            if cfg.is_match(&names[i], &names[j]) {
                members.push(names[j].clone());
                claimed[j] = true;
            }
        }
        if members.len() > 1 {
            claimed[i] = true;
            out.push(members);
        }
    }
    out
}

fn cluster_transitive(names: &[String], cfg: &ResolverConfig) -> Vec<Vec<String>> {
    let mut parent = (0..names.len()).collect::<Vec<_>>();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            if cfg.is_match(&names[i], &names[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    // Lower index stays root so components keep encounter order.
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut components: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (i, name) in names.iter().enumerate() {
        let root = find(&mut parent, i);
        components.entry(root).or_default().push(name.clone());
    }
    components
        .into_values()
        .filter(|members| members.len() > 1)
        .collect()
}
