use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::columns::{ColumnMap, Field};
use crate::corrections::{Correction, Corrections};
use crate::identity::{self, MappingEntry, Resolution, ResolverConfig};
use crate::meet_file::parse_meet_filename;
use crate::name_clean::clean_athlete_name;
use crate::report::DuplicateReport;
use crate::team_canon::TeamMapping;
use crate::time_norm::{Division, PaceMetrics, parse_finish_time};

/// One row of one meet extract, as found in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResultRecord {
    pub athlete_full_name: String,
    pub team_name: Option<String>,
    pub grade: Option<String>,
    pub gender: Option<String>,
    pub division: Option<Division>,
    pub finish_time_str: Option<String>,
    pub place_overall: Option<u32>,
    pub bib: Option<String>,
    pub meet_number: Option<u32>,
    pub season_year: Option<i32>,
    pub meet_name: Option<String>,
    pub meet_series: Option<String>,
    pub source_file: String,
}

/// A season dataset row: canonical identities plus time/pace enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub record_id: String,
    pub season_year: Option<i32>,
    pub meet_number: Option<u32>,
    pub meet_name: Option<String>,
    pub meet_series: Option<String>,
    pub division: Option<Division>,
    pub gender: Option<String>,
    pub place_overall: Option<u32>,
    pub bib: Option<String>,
    pub athlete_full_name: String,
    pub team_name: Option<String>,
    pub grade: Option<String>,
    pub finish_time_str: Option<String>,
    pub finish_time_s: Option<f64>,
    pub distance_km: Option<f64>,
    pub distance_mi: Option<f64>,
    pub pace_per_km_min: Option<f64>,
    pub pace_per_km_str: Option<String>,
    pub pace_per_mi_min: Option<f64>,
    pub pace_per_mi_str: Option<String>,
    pub speed_kmh: Option<f64>,
    pub speed_mph: Option<f64>,
    pub source_file: String,
}

impl SeasonRecord {
    fn apply_pace(&mut self) {
        let (Some(seconds), Some(division)) = (self.finish_time_s, self.division) else {
            return;
        };
        let Some(m) = PaceMetrics::compute(seconds, division) else {
            return;
        };
        self.distance_km = Some(m.distance_km);
        self.distance_mi = Some(m.distance_mi);
        self.pace_per_km_min = Some(m.pace_per_km_min);
        self.pace_per_km_str = Some(m.pace_per_km_str);
        self.pace_per_mi_min = Some(m.pace_per_mi_min);
        self.pace_per_mi_str = Some(m.pace_per_mi_str);
        self.speed_kmh = Some(m.speed_kmh);
        self.speed_mph = Some(m.speed_mph);
    }

    fn dedup_key(&self) -> (String, Option<u32>, Option<String>, Option<String>) {
        (
            self.athlete_full_name.clone(),
            self.meet_number,
            self.bib.clone(),
            self.finish_time_str.clone(),
        )
    }
}

/// Stable 16-hex id over the de-duplication key.
pub fn record_id(
    athlete: &str,
    meet_number: Option<u32>,
    bib: Option<&str>,
    finish_time_str: Option<&str>,
) -> String {
    let mut h = Sha256::new();
    h.update(athlete.as_bytes());
    h.update(b"|");
    h.update(meet_number.map(|n| n.to_string()).unwrap_or_default().as_bytes());
    h.update(b"|");
    h.update(bib.unwrap_or_default().as_bytes());
    h.update(b"|");
    h.update(finish_time_str.unwrap_or_default().as_bytes());
    let digest = h.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Every `.csv` directly under `dir`, sorted by path.
pub fn find_extracts(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read extract dir {}", dir.display()))?;
    let mut out = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("list extract dir {}", dir.display()))?
            .path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            out.push(path);
        }
    }
    out.sort();
    if out.is_empty() {
        return Err(anyhow!("no .csv extracts found in {}", dir.display()));
    }
    Ok(out)
}

/// Reads one extract. Header synonyms are resolved first; columns in the
/// file win over metadata recovered from the file name.
pub fn load_extract(path: &Path) -> Result<Vec<RawResultRecord>> {
    let source = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open extract {source}"))?;
    let headers = reader
        .headers()
        .with_context(|| format!("{source}: read header row"))?
        .clone();
    let columns = ColumnMap::from_headers(headers.iter());
    columns.require_core(&source)?;
    if !columns.unknown_headers().is_empty() {
        debug!(file = %source, ignored = ?columns.unknown_headers(), "unmapped columns");
    }

    let meet = parse_meet_filename(path);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.clone());

    let mut out = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("{source}: decode row {}", idx + 2))?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let text = |field: Field| columns.get(&row, field).map(str::to_string);

        let division = columns
            .get(&row, Field::Division)
            .and_then(Division::parse)
            .or(meet.division);
        let meet_number = columns
            .get(&row, Field::MeetNumber)
            .and_then(leading_number)
            .or(meet.meet_number);
        let season_year = columns
            .get(&row, Field::SeasonYear)
            .and_then(|v| v.parse::<i32>().ok())
            .or(meet.season_year);
        let meet_series = text(Field::MeetSeries).or_else(|| meet.meet_series.clone());
        let meet_name = text(Field::MeetName).or_else(|| meet.meet_name());

        out.push(RawResultRecord {
            athlete_full_name: text(Field::AthleteFullName).unwrap_or_default(),
            team_name: text(Field::TeamName),
            grade: text(Field::Grade),
            gender: text(Field::Gender).or_else(|| meet.gender.clone()),
            division,
            finish_time_str: text(Field::FinishTimeStr).or_else(|| text(Field::GunTimeStr)),
            place_overall: columns
                .get(&row, Field::PlaceOverall)
                .and_then(leading_number),
            bib: text(Field::Bib),
            meet_number,
            season_year,
            meet_name,
            meet_series,
            source_file: file_name.clone(),
        });
    }
    debug!(file = %source, rows = out.len(), "extract loaded");
    Ok(out)
}

// "12", "12th", "12." -> 12
fn leading_number(raw: &str) -> Option<u32> {
    let digits = raw
        .trim()
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect::<String>();
    digits.parse().ok()
}

/// Loads extracts in parallel; rows come back in path order.
pub fn load_extracts(paths: &[PathBuf]) -> Result<Vec<RawResultRecord>> {
    let per_file = paths
        .par_iter()
        .map(|path| load_extract(path))
        .collect::<Result<Vec<_>>>()?;
    Ok(per_file.into_iter().flatten().collect())
}

/// A single extract file, or every extract in a directory.
pub fn load_path(path: &Path) -> Result<Vec<RawResultRecord>> {
    if path.is_dir() {
        load_extracts(&find_extracts(path)?)
    } else {
        load_extract(path)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineInputs<'a> {
    pub team_mapping: &'a TeamMapping,
    pub corrections: &'a Corrections,
    pub resolver: &'a ResolverConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub rows_read: usize,
    pub rows_written: usize,
    pub duplicates_removed: usize,
    pub athletes_before: usize,
    pub athletes_after: usize,
    pub teams_before: usize,
    pub teams_after: usize,
    pub clusters: usize,
    pub names_standardized: usize,
    pub corrections_applied: usize,
    pub review_pending: usize,
    pub records_with_pace: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SeasonBuild {
    pub records: Vec<SeasonRecord>,
    pub resolution: Resolution,
    pub duplicates: DuplicateReport,
    pub review: Vec<Correction>,
    pub summary: MergeSummary,
}

impl SeasonBuild {
    pub fn mapping_entries(&self) -> Vec<MappingEntry> {
        self.resolution.mapping.entries()
    }
}

/// Clean names, canonicalize teams, parse times, resolve athlete variants,
/// fold in corrections, enrich, de-duplicate and sort.
pub fn assemble(raw: Vec<RawResultRecord>, inputs: PipelineInputs<'_>) -> SeasonBuild {
    let rows_read = raw.len();
    let teams_before = distinct(raw.iter().filter_map(|r| r.team_name.as_deref()));

    let mut records = raw
        .into_iter()
        .map(|r| {
            let team_name = inputs.team_mapping.canonical(r.team_name.as_deref());
            let finish_time_s = r.finish_time_str.as_deref().and_then(parse_finish_time);
            SeasonRecord {
                record_id: String::new(),
                season_year: r.season_year,
                meet_number: r.meet_number,
                meet_name: r.meet_name,
                meet_series: r.meet_series,
                division: r.division,
                gender: r.gender,
                place_overall: r.place_overall,
                bib: r.bib,
                athlete_full_name: clean_athlete_name(Some(&r.athlete_full_name)),
                team_name,
                grade: r.grade,
                finish_time_str: r.finish_time_str,
                finish_time_s,
                source_file: r.source_file,
                ..SeasonRecord::default()
            }
        })
        .collect::<Vec<_>>();

    let athletes_before = distinct(records.iter().map(|r| r.athlete_full_name.as_str()));
    let teams_after = distinct(records.iter().filter_map(|r| r.team_name.as_deref()));

    let mut resolution = identity::resolve(
        records
            .iter()
            .map(|r| (r.athlete_full_name.as_str(), r.team_name.as_deref())),
        inputs.resolver,
    );
    let duplicates = DuplicateReport::build(&records, &resolution);
    let corrections_applied = inputs
        .corrections
        .fold_into(&mut resolution, inputs.team_mapping);
    let review = inputs.corrections.to_review().cloned().collect::<Vec<_>>();

    for record in &mut records {
        let resolved = resolution
            .mapping
            .resolve(record.team_name.as_deref(), &record.athlete_full_name)
            .to_string();
        record.athlete_full_name = resolved;
        record.apply_pace();
    }

    let mut seen = HashSet::new();
    records.retain(|r| seen.insert(r.dedup_key()));
    let duplicates_removed = rows_read - records.len();

    records.sort_by_key(|r| {
        (
            r.season_year.is_none(),
            r.season_year,
            r.meet_number.is_none(),
            r.meet_number,
            r.place_overall.is_none(),
            r.place_overall,
        )
    });
    for r in &mut records {
        r.record_id = record_id(
            &r.athlete_full_name,
            r.meet_number,
            r.bib.as_deref(),
            r.finish_time_str.as_deref(),
        );
    }

    let summary = MergeSummary {
        rows_read,
        rows_written: records.len(),
        duplicates_removed,
        athletes_before,
        athletes_after: distinct(records.iter().map(|r| r.athlete_full_name.as_str())),
        teams_before,
        teams_after,
        clusters: resolution.clusters.len(),
        names_standardized: resolution.mapping.heuristic_len(),
        corrections_applied,
        review_pending: review.len(),
        records_with_pace: records.iter().filter(|r| r.pace_per_km_min.is_some()).count(),
    };
    info!(
        rows = summary.rows_written,
        duplicates = summary.duplicates_removed,
        clusters = summary.clusters,
        athletes_before = summary.athletes_before,
        athletes_after = summary.athletes_after,
        "season assembled"
    );
    if summary.review_pending > 0 {
        warn!(count = summary.review_pending, "name corrections need manual review");
    }

    SeasonBuild {
        records,
        resolution,
        duplicates,
        review,
        summary,
    }
}

fn distinct<'a, I: IntoIterator<Item = &'a str>>(items: I) -> usize {
    items
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).ok();
    }
}

pub fn write_season_csv(path: &Path, records: &[SeasonRecord]) -> Result<()> {
    ensure_parent(path);
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create season csv {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("write season row {}", record.record_id))?;
    }
    writer.flush().context("flush season csv")?;
    Ok(())
}

pub fn write_name_mapping(path: &Path, entries: &[MappingEntry]) -> Result<()> {
    ensure_parent(path);
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create name mapping {}", path.display()))?;
    for entry in entries {
        writer.serialize(entry).context("write name mapping row")?;
    }
    writer.flush().context("flush name mapping")?;
    Ok(())
}
