use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::identity::Resolution;
use crate::team_canon::TeamMapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionAction {
    Apply,
    Review,
}

impl CorrectionAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "apply" => Some(CorrectionAction::Apply),
            "review" => Some(CorrectionAction::Review),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correction {
    pub original_name: String,
    pub corrected_name: String,
    pub team: Option<String>,
    pub action: CorrectionAction,
    pub notes: String,
}

#[derive(Debug, Deserialize)]
struct CorrectionRow {
    original_name: String,
    #[serde(default)]
    corrected_name: String,
    #[serde(default)]
    team: String,
    action: String,
    #[serde(default)]
    notes: String,
}

/// Human-curated overrides. `apply` rows beat the heuristic resolver,
/// `review` rows are only surfaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corrections {
    entries: Vec<Correction>,
}

impl Corrections {
    pub fn new(entries: Vec<Correction>) -> Self {
        Self { entries }
    }

    pub fn from_reader<R: Read>(rdr: R, source: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let mut entries = Vec::new();
        for (idx, row) in reader.deserialize::<CorrectionRow>().enumerate() {
            // +2: one for the header row, one for 1-based lines.
            let line = idx + 2;
            let row = row.with_context(|| format!("{source}: decode correction on line {line}"))?;
            let action = CorrectionAction::parse(&row.action).ok_or_else(|| {
                anyhow!(
                    "{source}: line {line}: unknown action '{}' (expected apply or review)",
                    row.action
                )
            })?;
            if row.original_name.is_empty() {
                return Err(anyhow!("{source}: line {line}: original_name is empty"));
            }
            if action == CorrectionAction::Apply && row.corrected_name.is_empty() {
                return Err(anyhow!(
                    "{source}: line {line}: apply row for '{}' has no corrected_name",
                    row.original_name
                ));
            }
            entries.push(Correction {
                original_name: row.original_name,
                corrected_name: row.corrected_name,
                team: (!row.team.is_empty()).then_some(row.team),
                action,
                notes: row.notes,
            });
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("open corrections {}", path.display()))?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_apply(&self) -> impl Iterator<Item = &Correction> {
        self.entries
            .iter()
            .filter(|c| c.action == CorrectionAction::Apply)
    }

    pub fn to_review(&self) -> impl Iterator<Item = &Correction> {
        self.entries
            .iter()
            .filter(|c| c.action == CorrectionAction::Review)
    }

    /// Layers every `apply` row over the mapping. Returns how many were folded in.
    /// Layers `apply` rows over the heuristic mapping. Correction teams go
    /// through the same team table as the records so the keys line up.
    /// Returns how many corrections hit a name that was actually observed.
    pub fn fold_into(&self, resolution: &mut Resolution, teams: &TeamMapping) -> usize {
        let mut applied = 0usize;
        for c in self.to_apply() {
            if c.original_name == c.corrected_name {
                continue;
            }
            let team = teams.canonical(c.team.as_deref());
            resolution
                .mapping
                .insert_override(team.as_deref(), &c.original_name, &c.corrected_name);
            if resolution.observed(team.as_deref(), &c.original_name) {
                applied += 1;
            } else {
                warn!(
                    name = %c.original_name,
                    team = team.as_deref().unwrap_or("any"),
                    "correction matches no result"
                );
            }
        }
        let review = self.to_review().count();
        if applied > 0 || review > 0 {
            info!(applied, review, "name corrections loaded");
        }
        applied
    }
}
