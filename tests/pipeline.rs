use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;

use xc_season::corrections::Corrections;
use xc_season::dataset::{self, PipelineInputs, RawResultRecord, SeasonBuild};
use xc_season::identity::ResolverConfig;
use xc_season::team_canon::TeamMapping;
use xc_season::time_norm::Division;
use xc_season::{export, store};

fn fixture_path(parts: &[&str]) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    for part in parts {
        path.push(part);
    }
    path
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("xc_season_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}

fn load_fixture_extracts() -> Vec<RawResultRecord> {
    let paths = dataset::find_extracts(&fixture_path(&["extracts"])).expect("fixtures listed");
    dataset::load_extracts(&paths).expect("fixtures load")
}

fn build_with(corrections: &Corrections) -> SeasonBuild {
    let teams = TeamMapping::builtin();
    let resolver = ResolverConfig::default();
    dataset::assemble(
        load_fixture_extracts(),
        PipelineInputs {
            team_mapping: &teams,
            corrections,
            resolver: &resolver,
        },
    )
}

#[test]
fn heterogeneous_headers_load_into_one_shape() {
    let rows = load_fixture_extracts();
    assert_eq!(rows.len(), 8);

    let first = &rows[0];
    assert_eq!(first.athlete_full_name, "Gwen Smith");
    assert_eq!(first.team_name.as_deref(), Some("St. Agnes Parish"));
    assert_eq!(first.finish_time_str.as_deref(), Some("11:37.00"));
    assert_eq!(first.place_overall, Some(1));
    assert_eq!(first.bib.as_deref(), Some("101"));
    assert_eq!(first.meet_number, Some(1));
    assert_eq!(first.season_year, Some(2024));
    assert_eq!(first.division, Some(Division::Frosh));
    assert_eq!(first.gender.as_deref(), Some("Girls"));
    assert_eq!(first.source_file, "2024_meet_1_frosh_girls.csv");

    let second_meet = &rows[4];
    assert_eq!(second_meet.athlete_full_name, "Gwendolyn Smith");
    assert_eq!(second_meet.finish_time_str.as_deref(), Some("11:20.5"));
    assert_eq!(second_meet.meet_number, Some(2));
    assert_eq!(second_meet.meet_name.as_deref(), Some("Meet 2"));
}

#[test]
fn missing_time_column_names_file_and_column() {
    let path = fixture_path(&["bad", "2024_meet_3_jv_boys.csv"]);
    let err = dataset::load_extract(&path).expect_err("no time column");
    let msg = format!("{err:#}");
    assert!(msg.contains("2024_meet_3_jv_boys.csv"), "{msg}");
    assert!(msg.contains("finish_time_str"), "{msg}");
}

#[test]
fn empty_extract_dir_is_an_error() {
    let dir = scratch_dir("empty_dir");
    assert!(dataset::find_extracts(&dir).is_err());
    assert!(dataset::find_extracts(&dir.join("missing")).is_err());
}

#[test]
fn season_merges_variants_within_team_and_dedups() {
    let build = build_with(&Corrections::default());
    let s = &build.summary;
    assert_eq!(s.rows_read, 8);
    assert_eq!(s.rows_written, 7);
    assert_eq!(s.duplicates_removed, 1);
    assert_eq!(s.clusters, 1);
    assert_eq!(s.names_standardized, 1);
    assert_eq!(s.records_with_pace, 7);
    assert!(s.athletes_after <= s.athletes_before);
    assert!(s.teams_after < s.teams_before);

    for r in &build.records {
        match r.team_name.as_deref() {
            Some("St Agnes") => assert_eq!(r.athlete_full_name, "Gwendolyn Smith"),
            Some("St Joseph") => assert_eq!(r.athlete_full_name, "Gwen Smith"),
            Some("OLOH") => assert_eq!(r.athlete_full_name, "Jane Doe"),
            other => panic!("unexpected team {other:?}"),
        }
    }

    let first = &build.records[0];
    assert_eq!(first.meet_number, Some(1));
    assert_eq!(first.place_overall, Some(1));
    assert_eq!(first.finish_time_s, Some(697.0));
    assert_eq!(first.pace_per_km_str.as_deref(), Some("5:48"));
    assert_eq!(first.record_id.len(), 16);

    let ids = build
        .records
        .iter()
        .map(|r| r.record_id.as_str())
        .collect::<std::collections::HashSet<_>>();
    assert_eq!(ids.len(), build.records.len());

    assert_eq!(build.duplicates.groups.len(), 1);
    let group = &build.duplicates.groups[0];
    assert_eq!(group.canonical, "Gwendolyn Smith");
    let gwen = group
        .members
        .iter()
        .find(|m| m.name == "Gwen Smith")
        .expect("gwen listed");
    assert_eq!(gwen.appearances, 2);
    assert_eq!(gwen.seasons, [2024]);
}

#[test]
fn records_sorted_by_meet_then_place() {
    let build = build_with(&Corrections::default());
    let keys = build
        .records
        .iter()
        .map(|r| (r.meet_number, r.place_overall))
        .collect::<Vec<_>>();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn corrections_file_overrides_and_reports_review() {
    let corrections = Corrections::load(&fixture_path(&["name_corrections.csv"])).unwrap();
    assert_eq!(corrections.len(), 2);
    let build = build_with(&corrections);

    assert_eq!(build.summary.corrections_applied, 1);
    assert_eq!(build.summary.review_pending, 1);
    // Gwen's heuristic merge is shadowed by the override.
    assert_eq!(build.summary.names_standardized, 0);
    assert_eq!(build.review[0].original_name, "Jane Doe");

    let agnes = build
        .records
        .iter()
        .filter(|r| r.team_name.as_deref() == Some("St Agnes"))
        .map(|r| r.athlete_full_name.as_str())
        .collect::<Vec<_>>();
    assert!(agnes.contains(&"Gwen A. Smith"));
    assert!(agnes.contains(&"Gwendolyn Smith"));
    assert!(
        build
            .records
            .iter()
            .any(|r| r.athlete_full_name == "Jane Doe")
    );
    assert!(
        build
            .records
            .iter()
            .filter(|r| r.team_name.as_deref() == Some("St Joseph"))
            .all(|r| r.athlete_full_name == "Gwen Smith")
    );
}

#[test]
fn correction_with_raw_team_spelling_is_applied() {
    let raw = "original_name,corrected_name,team,action,notes\n\
               Jane Doe,Janet Doe,Our Lady of Hope Parish,apply,\n\
               Sam Lee,Samuel Lee,St. Mark Parish,apply,not in these results\n";
    let corrections = Corrections::from_reader(raw.as_bytes(), "inline").unwrap();
    let build = build_with(&corrections);

    let oloh = build
        .records
        .iter()
        .filter(|r| r.team_name.as_deref() == Some("OLOH"))
        .collect::<Vec<_>>();
    assert_eq!(oloh.len(), 1);
    assert_eq!(oloh[0].athlete_full_name, "Janet Doe");
    assert!(build.records.iter().all(|r| r.athlete_full_name != "Jane Doe"));
    assert_eq!(build.summary.corrections_applied, 1);
}

#[test]
fn bad_corrections_file_reports_line() {
    let raw = "original_name,corrected_name,team,action,notes\n\
               Gwen Smith,Gwendolyn Smith,St Agnes,apply,\n\
               Sam Lee,,St Mark,maybe,\n";
    let err = Corrections::from_reader(raw.as_bytes(), "corrections.csv").unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("corrections.csv"), "{msg}");
    assert!(msg.contains("line 3"), "{msg}");
}

#[test]
fn output_is_deterministic() {
    let dir = scratch_dir("deterministic");
    let a = dir.join("a.csv");
    let b = dir.join("b.csv");
    let first = build_with(&Corrections::default());
    let second = build_with(&Corrections::default());
    assert_eq!(first.records, second.records);

    dataset::write_season_csv(&a, &first.records).unwrap();
    dataset::write_season_csv(&b, &second.records).unwrap();
    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}

#[test]
fn season_csv_reloads_with_same_identities() {
    let dir = scratch_dir("reload");
    let out = dir.join("merged").join("season_results.csv");
    let build = build_with(&Corrections::default());
    dataset::write_season_csv(&out, &build.records).unwrap();
    dataset::write_name_mapping(&dir.join("name_mapping.csv"), &build.mapping_entries()).unwrap();

    let reloaded = dataset::load_extract(&out).unwrap();
    assert_eq!(reloaded.len(), build.records.len());
    for (raw, rec) in reloaded.iter().zip(&build.records) {
        assert_eq!(raw.athlete_full_name, rec.athlete_full_name);
        assert_eq!(raw.team_name, rec.team_name);
        assert_eq!(raw.meet_number, rec.meet_number);
        assert_eq!(raw.division, rec.division);
        assert_eq!(raw.finish_time_str, rec.finish_time_str);
    }

    let mapping = fs::read_to_string(dir.join("name_mapping.csv")).unwrap();
    let mut lines = mapping.lines();
    assert_eq!(lines.next(), Some("team,original_name,standardized_name"));
    assert_eq!(lines.next(), Some("St Agnes,Gwen Smith,Gwendolyn Smith"));
    assert_eq!(lines.next(), None);
}

#[test]
fn sqlite_store_round_trips_season() {
    let build = build_with(&Corrections::default());
    let mut conn = Connection::open_in_memory().unwrap();
    store::init_schema(&conn).unwrap();

    let written = store::replace_season(&mut conn, &build.records, &build.summary).unwrap();
    assert_eq!(written, build.records.len());
    assert_eq!(store::load_season(&conn).unwrap(), build.records);
    assert_eq!(store::ingest_run_count(&conn).unwrap(), 1);

    store::replace_season(&mut conn, &build.records, &build.summary).unwrap();
    assert_eq!(store::load_season(&conn).unwrap().len(), build.records.len());
    assert_eq!(store::ingest_run_count(&conn).unwrap(), 2);
}

#[test]
fn workbook_export_writes_all_sheets() {
    let dir = scratch_dir("xlsx");
    let path = dir.join("season.xlsx");
    let build = build_with(&Corrections::default());
    let report = export::export_season_workbook(&path, &build).unwrap();
    assert_eq!(report.results, 7);
    assert_eq!(report.duplicate_groups, 1);
    assert_eq!(report.mapping_rows, 1);
    assert!(fs::metadata(&path).unwrap().len() > 0);
}
