use std::collections::HashMap;

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    PlaceOverall,
    Bib,
    AthleteFullName,
    FinishTimeStr,
    GunTimeStr,
    PaceStr,
    TeamName,
    Age,
    Grade,
    Gender,
    Division,
    MeetNumber,
    SeasonYear,
    MeetName,
    MeetSeries,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::PlaceOverall => "place_overall",
            Field::Bib => "bib",
            Field::AthleteFullName => "athlete_full_name",
            Field::FinishTimeStr => "finish_time_str",
            Field::GunTimeStr => "gun_time_str",
            Field::PaceStr => "pace_str",
            Field::TeamName => "team_name",
            Field::Age => "age",
            Field::Grade => "grade",
            Field::Gender => "gender",
            Field::Division => "division",
            Field::MeetNumber => "meet_number",
            Field::SeasonYear => "season_year",
            Field::MeetName => "meet_name",
            Field::MeetSeries => "meet_series",
        }
    }
}

const ALL_FIELDS: [Field; 15] = [
    Field::PlaceOverall,
    Field::Bib,
    Field::AthleteFullName,
    Field::FinishTimeStr,
    Field::GunTimeStr,
    Field::PaceStr,
    Field::TeamName,
    Field::Age,
    Field::Grade,
    Field::Gender,
    Field::Division,
    Field::MeetNumber,
    Field::SeasonYear,
    Field::MeetName,
    Field::MeetSeries,
];

// Header spellings seen across results-site exports, lower-cased.
static SYNONYMS: Lazy<HashMap<String, Field>> = Lazy::new(|| {
    let mut out = HashMap::new();
    let aliases: &[(&str, Field)] = &[
        ("place", Field::PlaceOverall),
        ("finish place", Field::PlaceOverall),
        ("overall place", Field::PlaceOverall),
        ("bib", Field::Bib),
        ("bib number", Field::Bib),
        ("name", Field::AthleteFullName),
        ("participant name", Field::AthleteFullName),
        ("athlete", Field::AthleteFullName),
        ("time", Field::FinishTimeStr),
        ("clock time", Field::FinishTimeStr),
        ("chip time", Field::FinishTimeStr),
        ("finish time", Field::FinishTimeStr),
        ("gun time", Field::GunTimeStr),
        ("pace", Field::PaceStr),
        ("team", Field::TeamName),
        ("team name", Field::TeamName),
        ("age", Field::Age),
        ("grade", Field::Grade),
        ("year", Field::Grade),
        ("gender", Field::Gender),
        ("division", Field::Division),
    ];
    for (alias, field) in aliases {
        out.insert((*alias).to_string(), *field);
    }
    for field in ALL_FIELDS {
        out.insert(field.column().to_string(), field);
    }
    out
});

pub fn field_for_header(header: &str) -> Option<Field> {
    let key = header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    SYNONYMS.get(&key).copied()
}

/// Header position per semantic field. The first column that claims a field
/// keeps it; later synonyms are ignored.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    index: HashMap<Field, usize>,
    unknown: Vec<String>,
}

impl ColumnMap {
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = Self::default();
        for (idx, header) in headers.into_iter().enumerate() {
            match field_for_header(header) {
                Some(field) => {
                    out.index.entry(field).or_insert(idx);
                }
                None => out.unknown.push(header.trim().to_string()),
            }
        }
        out
    }

    pub fn has(&self, field: Field) -> bool {
        self.index.contains_key(&field)
    }

    pub fn unknown_headers(&self) -> &[String] {
        &self.unknown
    }

    /// Trimmed cell for `field`, `None` when the column is absent or blank.
    pub fn get<'r>(&self, record: &'r csv::StringRecord, field: Field) -> Option<&'r str> {
        let idx = *self.index.get(&field)?;
        let value = record.get(idx)?.trim();
        (!value.is_empty()).then_some(value)
    }

    /// Name and finish time are the two columns nothing downstream can do without.
    pub fn require_core(&self, source: &str) -> Result<()> {
        if !self.has(Field::AthleteFullName) {
            return Err(anyhow!(
                "{source}: missing required column '{}'",
                Field::AthleteFullName.column()
            ));
        }
        if !self.has(Field::FinishTimeStr) && !self.has(Field::GunTimeStr) {
            return Err(anyhow!(
                "{source}: missing required column '{}'",
                Field::FinishTimeStr.column()
            ));
        }
        Ok(())
    }
}
