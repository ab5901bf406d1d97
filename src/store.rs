use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::dataset::{MergeSummary, SeasonRecord};
use crate::time_norm::Division;

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS results (
            record_id TEXT PRIMARY KEY,
            season_year INTEGER NULL,
            meet_number INTEGER NULL,
            meet_name TEXT NULL,
            meet_series TEXT NULL,
            division TEXT NULL,
            gender TEXT NULL,
            place_overall INTEGER NULL,
            bib TEXT NULL,
            athlete_full_name TEXT NOT NULL,
            team_name TEXT NULL,
            grade TEXT NULL,
            finish_time_str TEXT NULL,
            finish_time_s REAL NULL,
            distance_km REAL NULL,
            distance_mi REAL NULL,
            pace_per_km_min REAL NULL,
            pace_per_km_str TEXT NULL,
            pace_per_mi_min REAL NULL,
            pace_per_mi_str TEXT NULL,
            speed_kmh REAL NULL,
            speed_mph REAL NULL,
            source_file TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_results_athlete ON results(athlete_full_name);
        CREATE INDEX IF NOT EXISTS idx_results_team ON results(team_name);
        CREATE INDEX IF NOT EXISTS idx_results_meet ON results(season_year, meet_number);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            finished_at TEXT NOT NULL,
            rows_read INTEGER NOT NULL,
            rows_written INTEGER NOT NULL,
            clusters INTEGER NOT NULL,
            summary_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Replaces the stored season with `records` in one transaction and logs the run.
pub fn replace_season(
    conn: &mut Connection,
    records: &[SeasonRecord],
    summary: &MergeSummary,
) -> Result<usize> {
    let tx = conn.transaction().context("begin season transaction")?;
    tx.execute("DELETE FROM results", [])
        .context("clear results")?;
    {
        let mut stmt = tx
            .prepare(
                r#"
                INSERT INTO results (
                    record_id, season_year, meet_number, meet_name, meet_series,
                    division, gender, place_overall, bib, athlete_full_name,
                    team_name, grade, finish_time_str, finish_time_s,
                    distance_km, distance_mi, pace_per_km_min, pace_per_km_str,
                    pace_per_mi_min, pace_per_mi_str, speed_kmh, speed_mph, source_file
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                    ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
                )
                "#,
            )
            .context("prepare results insert")?;
        for r in records {
            stmt.execute(params![
                r.record_id,
                r.season_year,
                r.meet_number,
                r.meet_name,
                r.meet_series,
                r.division.map(Division::label),
                r.gender,
                r.place_overall,
                r.bib,
                r.athlete_full_name,
                r.team_name,
                r.grade,
                r.finish_time_str,
                r.finish_time_s,
                r.distance_km,
                r.distance_mi,
                r.pace_per_km_min,
                r.pace_per_km_str,
                r.pace_per_mi_min,
                r.pace_per_mi_str,
                r.speed_kmh,
                r.speed_mph,
                r.source_file,
            ])
            .with_context(|| format!("insert result {}", r.record_id))?;
        }
    }

    let summary_json = serde_json::to_string(summary).context("serialize ingest summary")?;
    tx.execute(
        "INSERT INTO ingest_runs(finished_at, rows_read, rows_written, clusters, summary_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            Utc::now().to_rfc3339(),
            summary.rows_read as i64,
            summary.rows_written as i64,
            summary.clusters as i64,
            summary_json
        ],
    )
    .context("insert ingest run")?;
    tx.commit().context("commit season transaction")?;
    Ok(records.len())
}

pub fn load_season(conn: &Connection) -> Result<Vec<SeasonRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                record_id, season_year, meet_number, meet_name, meet_series,
                division, gender, place_overall, bib, athlete_full_name,
                team_name, grade, finish_time_str, finish_time_s,
                distance_km, distance_mi, pace_per_km_min, pace_per_km_str,
                pace_per_mi_min, pace_per_mi_str, speed_kmh, speed_mph, source_file
            FROM results
            ORDER BY season_year IS NULL, season_year, meet_number IS NULL, meet_number,
                     place_overall IS NULL, place_overall, record_id
            "#,
        )
        .context("prepare load season query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(SeasonRecord {
                record_id: row.get(0)?,
                season_year: row.get(1)?,
                meet_number: row.get(2)?,
                meet_name: row.get(3)?,
                meet_series: row.get(4)?,
                division: row
                    .get::<_, Option<String>>(5)?
                    .as_deref()
                    .and_then(Division::parse),
                gender: row.get(6)?,
                place_overall: row.get(7)?,
                bib: row.get(8)?,
                athlete_full_name: row.get(9)?,
                team_name: row.get(10)?,
                grade: row.get(11)?,
                finish_time_str: row.get(12)?,
                finish_time_s: row.get(13)?,
                distance_km: row.get(14)?,
                distance_mi: row.get(15)?,
                pace_per_km_min: row.get(16)?,
                pace_per_km_str: row.get(17)?,
                pace_per_mi_min: row.get(18)?,
                pace_per_mi_str: row.get(19)?,
                speed_kmh: row.get(20)?,
                speed_mph: row.get(21)?,
                source_file: row.get(22)?,
            })
        })
        .context("query load season")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode result row")?);
    }
    Ok(out)
}

pub fn ingest_run_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM ingest_runs", [], |row| row.get(0))
        .context("count ingest runs")
}
