use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::corrections::Corrections;
use crate::identity::{ClusteringMode, ResolverConfig, SimilarityMetric};
use crate::team_canon::TeamMapping;

const DEFAULT_INPUT_DIR: &str = "data/raw";
const DEFAULT_OUTPUT: &str = "data/merged/season_results.csv";

/// Loads `.env.local` then `.env`; already-set variables win.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub mapping_output: PathBuf,
    pub team_mapping: Option<PathBuf>,
    pub corrections: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub xlsx: Option<PathBuf>,
    pub resolver: ResolverConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let output = env_path("XC_OUTPUT").unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        let mut resolver = ResolverConfig::default();
        apply_resolver_env(&mut resolver)?;
        Ok(Self {
            input_dir: env_path("XC_INPUT_DIR").unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
            mapping_output: mapping_path_for(&output),
            output,
            team_mapping: env_path("XC_TEAM_MAPPING"),
            corrections: env_path("XC_CORRECTIONS"),
            db: env_path("XC_DB"),
            xlsx: env_path("XC_XLSX"),
            resolver,
        })
    }

    /// CLI flags override the environment.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        if let Some(path) = flag_value(args, "--resolver-config") {
            self.resolver = load_resolver_config(Path::new(&path))?;
        }
        if let Some(v) = flag_value(args, "--input") {
            self.input_dir = PathBuf::from(v);
        }
        if let Some(v) = flag_value(args, "--out") {
            self.output = PathBuf::from(v);
            self.mapping_output = mapping_path_for(&self.output);
        }
        if let Some(v) = flag_value(args, "--mapping-out") {
            self.mapping_output = PathBuf::from(v);
        }
        if let Some(v) = flag_value(args, "--teams") {
            self.team_mapping = Some(PathBuf::from(v));
        }
        if let Some(v) = flag_value(args, "--corrections") {
            self.corrections = Some(PathBuf::from(v));
        }
        if let Some(v) = flag_value(args, "--db") {
            self.db = Some(PathBuf::from(v));
        }
        if let Some(v) = flag_value(args, "--xlsx") {
            self.xlsx = Some(PathBuf::from(v));
        }
        if let Some(v) = flag_value(args, "--threshold") {
            self.resolver.similarity_threshold = parse_threshold(&v)?;
        }
        if has_flag(args, "--transitive") {
            self.resolver.clustering = ClusteringMode::Transitive;
        }
        if has_flag(args, "--no-substring") {
            self.resolver.substring_rule = false;
        }
        if has_flag(args, "--jaro-winkler") {
            self.resolver.metric = SimilarityMetric::JaroWinkler;
        }
        Ok(())
    }

    pub fn load_team_mapping(&self) -> Result<TeamMapping> {
        match &self.team_mapping {
            Some(path) => TeamMapping::load(path),
            None => Ok(TeamMapping::builtin()),
        }
    }

    pub fn load_corrections(&self) -> Result<Corrections> {
        match &self.corrections {
            Some(path) => Corrections::load(path),
            None => Ok(Corrections::default()),
        }
    }
}

pub fn load_resolver_config(path: &Path) -> Result<ResolverConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read resolver config {}", path.display()))?;
    let cfg = serde_json::from_str::<ResolverConfig>(&raw)
        .with_context(|| format!("parse resolver config {}", path.display()))?;
    check_threshold(cfg.similarity_threshold)
        .with_context(|| format!("resolver config {}", path.display()))?;
    Ok(cfg)
}

fn apply_resolver_env(cfg: &mut ResolverConfig) -> Result<()> {
    if let Some(raw) = env_str("XC_SIMILARITY_THRESHOLD") {
        cfg.similarity_threshold = parse_threshold(&raw).context("XC_SIMILARITY_THRESHOLD")?;
    }
    if let Some(raw) = env_str("XC_SUBSTRING_RULE") {
        cfg.substring_rule = !matches!(
            raw.to_ascii_lowercase().as_str(),
            "0" | "false" | "off" | "no"
        );
    }
    if let Some(raw) = env_str("XC_CLUSTERING") {
        cfg.clustering = match raw.to_ascii_lowercase().as_str() {
            "first_match" | "first-match" | "first" => ClusteringMode::FirstMatch,
            "transitive" => ClusteringMode::Transitive,
            other => return Err(anyhow!("XC_CLUSTERING: unknown mode '{other}'")),
        };
    }
    if let Some(raw) = env_str("XC_SIMILARITY_METRIC") {
        cfg.metric = match raw.to_ascii_lowercase().as_str() {
            "levenshtein" => SimilarityMetric::Levenshtein,
            "jaro_winkler" | "jaro-winkler" => SimilarityMetric::JaroWinkler,
            other => return Err(anyhow!("XC_SIMILARITY_METRIC: unknown metric '{other}'")),
        };
    }
    Ok(())
}

fn parse_threshold(raw: &str) -> Result<f64> {
    let v = raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid similarity threshold '{raw}'"))?;
    check_threshold(v)
}

fn check_threshold(v: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&v) {
        return Err(anyhow!("similarity threshold {v} outside 0..=1"));
    }
    Ok(v)
}

/// `season_results.csv` -> `name_mapping.csv` next to it.
pub fn mapping_path_for(output: &Path) -> PathBuf {
    output.with_file_name("name_mapping.csv")
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_str(key).map(PathBuf::from)
}

/// Accepts `--flag value` and `--flag=value`.
pub fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
