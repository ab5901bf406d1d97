use std::fmt;

use serde::{Deserialize, Serialize};

pub const KM_TO_MI: f64 = 0.621371;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Division {
    #[serde(rename = "2nd Grade")]
    SecondGrade,
    Frosh,
    #[serde(rename = "JV")]
    JuniorVarsity,
    Varsity,
}

impl Division {
    pub const ALL: [Division; 4] = [
        Division::SecondGrade,
        Division::Frosh,
        Division::JuniorVarsity,
        Division::Varsity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Division::SecondGrade => "2nd Grade",
            Division::Frosh => "Frosh",
            Division::JuniorVarsity => "JV",
            Division::Varsity => "Varsity",
        }
    }

    pub fn distance_km(self) -> f64 {
        match self {
            Division::SecondGrade | Division::Frosh => 2.0,
            Division::JuniorVarsity => 3.0,
            Division::Varsity => 4.0,
        }
    }

    pub fn distance_mi(self) -> f64 {
        self.distance_km() * KM_TO_MI
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw
            .split_whitespace()
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "2ndgrade" => Some(Division::SecondGrade),
            "frosh" => Some(Division::Frosh),
            "jv" => Some(Division::JuniorVarsity),
            "varsity" => Some(Division::Varsity),
            _ => None,
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Converts `SS(.ss)`, `MM:SS(.ss)` or `HH:MM:SS(.ss)` into seconds.
///
/// Anything that is not a digit, colon or period is dropped first, so
/// labels and stray commas do not matter. Hours and minutes must be whole
/// numbers; only the last component may carry a fraction.
pub fn parse_finish_time(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == ':' || *ch == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let parts = cleaned.split(':').collect::<Vec<_>>();
    let seconds = match parts.as_slice() {
        [ss] => parse_fraction(ss)?,
        [mm, ss] => parse_whole(mm)? * 60.0 + parse_fraction(ss)?,
        [hh, mm, ss] => parse_whole(hh)? * 3600.0 + parse_whole(mm)? * 60.0 + parse_fraction(ss)?,
        _ => return None,
    };
    seconds.is_finite().then_some(seconds)
}

fn parse_whole(raw: &str) -> Option<f64> {
    raw.parse::<u64>().ok().map(|v| v as f64)
}

fn parse_fraction(raw: &str) -> Option<f64> {
    // "." alone parses as nothing useful; reject it explicitly.
    if raw.is_empty() || raw == "." {
        return None;
    }
    raw.parse::<f64>().ok()
}

/// `m:ss` with the seconds truncated, not rounded.
pub fn format_pace(pace_min: f64) -> Option<String> {
    if !pace_min.is_finite() || pace_min < 0.0 {
        return None;
    }
    let minutes = pace_min.trunc();
    let seconds = ((pace_min - minutes) * 60.0).trunc() as u32;
    Some(format!("{}:{:02}", minutes as u64, seconds.min(59)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceMetrics {
    pub distance_km: f64,
    pub distance_mi: f64,
    pub pace_per_km_min: f64,
    pub pace_per_km_str: String,
    pub pace_per_mi_min: f64,
    pub pace_per_mi_str: String,
    pub speed_kmh: f64,
    pub speed_mph: f64,
}

impl PaceMetrics {
    /// `None` when the finish time is not a positive finite number.
    pub fn compute(finish_time_s: f64, division: Division) -> Option<Self> {
        if !finish_time_s.is_finite() || finish_time_s <= 0.0 {
            return None;
        }
        let distance_km = division.distance_km();
        let distance_mi = division.distance_mi();
        let minutes = finish_time_s / 60.0;
        let hours = finish_time_s / 3600.0;

        let pace_per_km_min = minutes / distance_km;
        let pace_per_mi_min = minutes / distance_mi;
        Some(Self {
            distance_km,
            distance_mi,
            pace_per_km_min,
            pace_per_km_str: format_pace(pace_per_km_min)?,
            pace_per_mi_min,
            pace_per_mi_str: format_pace(pace_per_mi_min)?,
            speed_kmh: distance_km / hours,
            speed_mph: distance_mi / hours,
        })
    }
}
