use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::dataset::SeasonBuild;

pub struct ExportReport {
    pub results: usize,
    pub duplicate_groups: usize,
    pub mapping_rows: usize,
}

fn opt<T: ToString>(v: &Option<T>) -> String {
    v.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn fixed(v: Option<f64>, digits: usize) -> String {
    v.map(|x| format!("{x:.digits$}")).unwrap_or_default()
}

/// Writes the season as a workbook with Results, Duplicates and NameMapping sheets.
pub fn export_season_workbook(path: &Path, build: &SeasonBuild) -> Result<ExportReport> {
    let mut results_rows = vec![
        [
            "Season", "Meet", "Meet Name", "Division", "Gender", "Place", "Bib", "Athlete",
            "Team", "Grade", "Time", "Seconds", "Pace/km", "Pace/mi", "km/h", "mph",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>(),
    ];
    for r in &build.records {
        results_rows.push(vec![
            opt(&r.season_year),
            opt(&r.meet_number),
            opt(&r.meet_name),
            opt(&r.division),
            opt(&r.gender),
            opt(&r.place_overall),
            opt(&r.bib),
            r.athlete_full_name.clone(),
            opt(&r.team_name),
            opt(&r.grade),
            opt(&r.finish_time_str),
            fixed(r.finish_time_s, 2),
            opt(&r.pace_per_km_str),
            opt(&r.pace_per_mi_str),
            fixed(r.speed_kmh, 2),
            fixed(r.speed_mph, 2),
        ]);
    }

    let mut dup_rows = vec![vec![
        "Group".to_string(),
        "Team".to_string(),
        "Standardized".to_string(),
        "Name".to_string(),
        "Appearances".to_string(),
        "Seasons".to_string(),
    ]];
    for (idx, group) in build.duplicates.groups.iter().enumerate() {
        for m in &group.members {
            dup_rows.push(vec![
                (idx + 1).to_string(),
                group.team.clone(),
                group.canonical.clone(),
                m.name.clone(),
                m.appearances.to_string(),
                m.seasons
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ]);
        }
    }

    let mut mapping_rows = vec![vec![
        "Team".to_string(),
        "Original".to_string(),
        "Standardized".to_string(),
    ]];
    for e in build.mapping_entries() {
        mapping_rows.push(vec![e.team, e.original_name, e.standardized_name]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Results")?;
        write_rows(sheet, &results_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Duplicates")?;
        write_rows(sheet, &dup_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("NameMapping")?;
        write_rows(sheet, &mapping_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        results: results_rows.len() - 1,
        duplicate_groups: build.duplicates.groups.len(),
        mapping_rows: mapping_rows.len() - 1,
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
