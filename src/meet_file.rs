use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::time_norm::Division;

static MEET_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)meet[\s_-]*(\d+)").expect("valid meet regex"));
static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9])((?:19|20)[0-9]{2})(?:[^0-9]|$)").expect("valid year regex"));
static RESULTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bresults\b").expect("valid results regex"));

/// Meet metadata recoverable from an extract's file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetInfo {
    pub meet_number: Option<u32>,
    pub season_year: Option<i32>,
    pub division: Option<Division>,
    pub gender: Option<String>,
    pub meet_series: Option<String>,
}

impl MeetInfo {
    pub fn meet_name(&self) -> Option<String> {
        match (&self.meet_series, self.meet_number) {
            (Some(series), Some(n)) => Some(format!("{series} Meet {n}")),
            (Some(series), None) => Some(series.clone()),
            (None, Some(n)) => Some(format!("Meet {n}")),
            (None, None) => None,
        }
    }
}

/// Handles both saved-page names ("... Meet 2 Results JV Girls 2023.csv")
/// and normalized extract names ("2023_meet_2_jv_girls.csv").
pub fn parse_meet_filename(path: &Path) -> MeetInfo {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let meet_match = MEET_NUMBER_RE.captures(&stem);
    let meet_number = meet_match
        .as_ref()
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    let season_year = YEAR_RE
        .captures_iter(&stem)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .last();

    let tokens = stem
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect::<Vec<_>>();

    let division = division_from_tokens(&tokens);
    let gender = tokens.iter().find_map(|t| match t.as_str() {
        "boys" => Some("Boys".to_string()),
        "girls" => Some("Girls".to_string()),
        _ => None,
    });

    let series_end = meet_match
        .as_ref()
        .and_then(|c| c.get(0))
        .map(|m| m.start())
        .or_else(|| RESULTS_RE.find(&stem).map(|m| m.start()));
    let meet_series = series_end
        .map(|end| stem[..end].trim_matches(|ch: char| ch.is_whitespace() || ch == '_' || ch == '-'))
        .filter(|s| !s.is_empty() && s.chars().any(|ch| ch.is_alphabetic()))
        .map(str::to_string);

    MeetInfo {
        meet_number,
        season_year,
        division,
        gender,
        meet_series,
    }
}

fn division_from_tokens(tokens: &[String]) -> Option<Division> {
    if tokens.iter().any(|t| t == "varsity") {
        return Some(Division::Varsity);
    }
    if tokens.iter().any(|t| t == "jv") {
        return Some(Division::JuniorVarsity);
    }
    if tokens.iter().any(|t| t == "frosh") {
        return Some(Division::Frosh);
    }
    let second_grade = tokens.iter().any(|t| t == "2ndgrade")
        || tokens
            .windows(2)
            .any(|w| w[0] == "2nd" && w[1] == "grade");
    second_grade.then_some(Division::SecondGrade)
}
