use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

const BUILTIN_TEAM_MAPPING: &str = include_str!("../config/team_mapping.csv");

/// Comparison key for team names: lower-case, no "parish"/"school" suffix,
/// every saint spelling reduced to "st", single spaces.
///
/// Runs to a fixed point so the key of a key is itself.
pub fn normalize_team_name(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let mut current = collapse_ws(&raw.to_lowercase());
    loop {
        let next = collapse_ws(
            &current
                .replace(" parish", "")
                .replace(" school", "")
                .replace("st.", "st")
                .replace("saint", "st"),
        );
        if next == current {
            return current;
        }
        current = next;
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Deserialize)]
struct MappingRow {
    original_name: String,
    canonical_name: String,
}

/// Curated raw spelling -> canonical spelling table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMapping {
    entries: BTreeMap<String, String>,
}

impl TeamMapping {
    pub fn builtin() -> Self {
        // The embedded table is validated by the test suite.
        Self::from_reader(BUILTIN_TEAM_MAPPING.as_bytes()).unwrap_or_default()
    }

    pub fn from_pairs<I, A, B>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut entries = BTreeMap::new();
        for (original, canonical) in pairs {
            let original = original.into().trim().to_string();
            let canonical = canonical.into().trim().to_string();
            if original.is_empty() || canonical.is_empty() {
                continue;
            }
            if let Some(prev) = entries.insert(original.clone(), canonical.clone())
                && prev != canonical
            {
                return Err(anyhow!(
                    "team '{original}' mapped to both '{prev}' and '{canonical}'"
                ));
            }
        }
        for (original, canonical) in &entries {
            if let Some(next) = entries.get(canonical)
                && next != canonical
            {
                return Err(anyhow!(
                    "team mapping chains '{original}' -> '{canonical}' -> '{next}'"
                ));
            }
        }
        Ok(Self { entries })
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let mut pairs = Vec::new();
        for row in reader.deserialize::<MappingRow>() {
            let row = row.context("decode team mapping row")?;
            pairs.push((row.original_name, row.canonical_name));
        }
        Self::from_pairs(pairs)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("open team mapping {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("load team mapping {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical display name. Unknown spellings are their own canonical
    /// name; missing or blank input stays missing.
    pub fn canonical(&self, raw: Option<&str>) -> Option<String> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(
            self.entries
                .get(trimmed)
                .cloned()
                .unwrap_or_else(|| trimmed.to_string()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamVariation {
    pub normalized: String,
    /// Spelling with its record count, most frequent first.
    pub spellings: Vec<(String, usize)>,
}

/// Normalized keys observed under more than one raw spelling.
pub fn team_variations<'a, I>(names: I) -> Vec<TeamVariation>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut by_key: BTreeMap<String, HashMap<String, usize>> = BTreeMap::new();
    for name in names {
        let key = normalize_team_name(Some(name));
        if key.is_empty() {
            continue;
        }
        *by_key
            .entry(key)
            .or_default()
            .entry(name.trim().to_string())
            .or_insert(0) += 1;
    }

    by_key
        .into_iter()
        .filter(|(_, spellings)| spellings.len() > 1)
        .map(|(normalized, spellings)| {
            let mut spellings = spellings.into_iter().collect::<Vec<_>>();
            spellings.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            TeamVariation {
                normalized,
                spellings,
            }
        })
        .collect()
}
