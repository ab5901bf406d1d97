use std::path::PathBuf;

use anyhow::Result;

use xc_season::config::{self, Settings, flag_value};
use xc_season::corrections::Corrections;
use xc_season::dataset::{self, PipelineInputs};
use xc_season::logging;

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut settings = Settings::from_env()?;
    settings.apply_args(&args)?;

    // Defaults to the merged season file; a directory of extracts also works.
    let source = flag_value(&args, "--input")
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.output.clone());
    let team_mapping = settings.load_team_mapping()?;
    let raw = dataset::load_path(&source)?;

    let build = dataset::assemble(
        raw,
        PipelineInputs {
            team_mapping: &team_mapping,
            corrections: &Corrections::default(),
            resolver: &settings.resolver,
        },
    );

    println!("Duplicate name report");
    println!("Source: {}", source.display());
    println!(
        "Threshold: {:.2} ({:?}, substring rule {})",
        settings.resolver.similarity_threshold,
        settings.resolver.clustering,
        if settings.resolver.substring_rule { "on" } else { "off" }
    );
    print!("{}", build.duplicates);

    if let Some(out) = flag_value(&args, "--mapping-out") {
        let out = PathBuf::from(out);
        let entries = build.mapping_entries();
        dataset::write_name_mapping(&out, &entries)?;
        println!();
        println!("Mapping: {} ({} rows)", out.display(), entries.len());
    }

    Ok(())
}
