use std::collections::HashSet;

use anyhow::Result;

use xc_season::config::{self, Settings};
use xc_season::team_canon::team_variations;
use xc_season::{dataset, logging, report};

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut settings = Settings::from_env()?;
    settings.apply_args(&args)?;
    // `--input` takes a directory of extracts or a merged season file.
    let source = settings.input_dir.clone();
    let raw = dataset::load_path(&source)?;
    let teams = raw
        .iter()
        .filter_map(|r| r.team_name.as_deref())
        .collect::<Vec<_>>();

    let counts = report::team_counts(teams.iter().copied());
    println!("Team names in {} ({} spellings)", source.display(), counts.len());
    for (team, n) in &counts {
        println!("  {team:<40} {n}");
    }

    let variations = team_variations(teams.iter().copied());
    println!();
    println!("Spelling variations: {}", variations.len());
    for v in &variations {
        println!("  [{}]", v.normalized);
        for (spelling, n) in &v.spellings {
            println!("     - {spelling} ({n})");
        }
    }

    let mapping = settings.load_team_mapping()?;
    let known = mapping
        .iter()
        .flat_map(|(raw, canon)| [raw, canon])
        .collect::<HashSet<_>>();
    let unmapped = counts
        .iter()
        .filter(|(team, _)| !known.contains(team.as_str()))
        .collect::<Vec<_>>();
    println!();
    println!("Spellings without a team mapping entry: {}", unmapped.len());
    for (team, n) in unmapped {
        println!("  {team} ({n})");
    }

    Ok(())
}
