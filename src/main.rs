use anyhow::{Context, Result};

use xc_season::config::{self, Settings};
use xc_season::dataset::{self, PipelineInputs};
use xc_season::{export, logging, store};

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut settings = Settings::from_env()?;
    settings.apply_args(&args)?;

    let team_mapping = settings.load_team_mapping()?;
    let corrections = settings.load_corrections()?;

    let extracts = dataset::find_extracts(&settings.input_dir)?;
    tracing::info!(files = extracts.len(), dir = %settings.input_dir.display(), "loading extracts");
    let raw = dataset::load_extracts(&extracts)?;

    let build = dataset::assemble(
        raw,
        PipelineInputs {
            team_mapping: &team_mapping,
            corrections: &corrections,
            resolver: &settings.resolver,
        },
    );

    dataset::write_season_csv(&settings.output, &build.records)?;
    let mapping = build.mapping_entries();
    dataset::write_name_mapping(&settings.mapping_output, &mapping)?;

    println!("Season dataset complete");
    println!("Extracts: {}", extracts.len());
    println!("Output: {}", settings.output.display());
    println!(
        "Name mapping: {} ({} rows)",
        settings.mapping_output.display(),
        mapping.len()
    );
    println!("{}", build.summary);

    if let Some(db_path) = settings.db.as_deref() {
        let mut conn = store::open_db(db_path)?;
        let stored = store::replace_season(&mut conn, &build.records, &build.summary)
            .with_context(|| format!("store season in {}", db_path.display()))?;
        println!("DB: {} ({stored} rows)", db_path.display());
    }

    if let Some(xlsx_path) = settings.xlsx.as_deref() {
        let report = export::export_season_workbook(xlsx_path, &build)?;
        println!(
            "Workbook: {} (results={}, duplicate groups={}, mapping={})",
            xlsx_path.display(),
            report.results,
            report.duplicate_groups,
            report.mapping_rows
        );
    }

    if !build.review.is_empty() {
        println!("Corrections pending review: {}", build.review.len());
        for item in &build.review {
            println!(
                "   - {} [{}] {}",
                item.original_name,
                item.team.as_deref().unwrap_or("any team"),
                item.notes
            );
        }
    }

    Ok(())
}
