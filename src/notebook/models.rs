// src/notebook/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

// === ENUMS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntryStatus {
    #[default]
    Planned,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Failed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Planned => "Planned",
            EntryStatus::InProgress => "In Progress",
            EntryStatus::Completed => "Completed",
            EntryStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// === REAGENTS ===

/// A reagent row as typed into the entry form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReagentInput {
    #[validate(
        length(min = 1, max = 255, message = "Reagent name must be between 1 and 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    /// mol/L
    #[validate(range(min = 0.0, message = "Concentration cannot be negative"))]
    pub concentration: f64,
    /// mL
    #[validate(range(min = 0.0, message = "Volume cannot be negative"))]
    pub volume: f64,
}

impl ReagentInput {
    pub fn new(name: impl Into<String>, concentration: f64, volume: f64) -> Self {
        Self {
            name: name.into(),
            concentration,
            volume,
        }
    }
}

/// A reagent with its derived amounts. `moles` and `equivalents` are only
/// ever produced by `compute_stoichiometry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reagent {
    pub name: String,
    pub concentration: f64,
    pub volume: f64,
    pub moles: f64,
    pub equivalents: f64,
}

impl Reagent {
    pub fn input(&self) -> ReagentInput {
        ReagentInput::new(self.name.clone(), self.concentration, self.volume)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReactionConditions {
    /// °C
    #[validate(range(min = 0.0, message = "Temperature cannot be negative"))]
    pub temperature: f64,
    /// bar
    #[validate(range(min = 0.0, message = "Pressure cannot be negative"))]
    pub pressure: f64,
    /// mL/min
    #[validate(range(min = 0.0, message = "Flow rate cannot be negative"))]
    pub flow_rate: f64,
    /// min
    #[validate(range(min = 0.0, message = "Residence time cannot be negative"))]
    pub residence_time: f64,
}

// === LAB ENTRY ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabEntry {
    pub id: String,
    pub title: String,
    #[serde(deserialize_with = "entry_date::deserialize")]
    pub date: DateTime<Utc>,
    pub experiment_type: String,
    pub status: EntryStatus,
    pub reagents: Vec<Reagent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalyst: Option<String>,
    pub reaction_conditions: ReactionConditions,
    #[serde(default)]
    pub observations: String,
    #[serde(default, rename = "yield", skip_serializing_if = "Option::is_none")]
    pub yield_percent: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub file_urls: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_template: bool,
}

impl LabEntry {
    /// Builds a stored entry from a validated form and its derived reagents.
    pub fn from_new(id: String, entry: NewLabEntry, reagents: Vec<Reagent>) -> Self {
        Self {
            id,
            title: entry.title.trim().to_string(),
            date: entry.date,
            experiment_type: entry.experiment_type.trim().to_string(),
            status: entry.status,
            reagents,
            catalyst: normalize_optional(entry.catalyst),
            reaction_conditions: entry.reaction_conditions,
            observations: entry.observations,
            yield_percent: entry.yield_percent,
            notes: entry.notes,
            file_urls: entry.file_urls,
            tags: normalize_tags(entry.tags),
            is_template: false,
        }
    }

    pub fn reagent_inputs(&self) -> Vec<ReagentInput> {
        self.reagents.iter().map(Reagent::input).collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

// === REQUESTS ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewLabEntry {
    #[validate(
        length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: String,
    #[serde(deserialize_with = "entry_date::deserialize")]
    pub date: DateTime<Utc>,
    #[validate(
        length(min = 1, max = 100, message = "Experiment type must be between 1 and 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub experiment_type: String,
    #[serde(default)]
    pub status: EntryStatus,
    #[validate(length(min = 1, message = "At least one reagent is required"), nested)]
    pub reagents: Vec<ReagentInput>,
    #[validate(length(max = 255, message = "Catalyst cannot exceed 255 characters"))]
    pub catalyst: Option<String>,
    #[validate(nested)]
    pub reaction_conditions: ReactionConditions,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Observations cannot exceed 5000 characters"))]
    pub observations: String,
    #[serde(default, rename = "yield")]
    #[validate(range(min = 0.0, max = 100.0, message = "Yield must be between 0 and 100"))]
    pub yield_percent: Option<f64>,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Notes cannot exceed 5000 characters"))]
    pub notes: String,
    #[serde(default)]
    pub file_urls: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; absent fields keep their stored value. An empty
/// `catalyst` clears it, as does `"yield": null` for the yield.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_yield_update"))]
pub struct UpdateLabEntry {
    #[validate(
        length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "entry_date::deserialize_option")]
    pub date: Option<DateTime<Utc>>,
    #[validate(
        length(min = 1, max = 100, message = "Experiment type must be between 1 and 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub experiment_type: Option<String>,
    pub status: Option<EntryStatus>,
    #[validate(length(min = 1, message = "At least one reagent is required"), nested)]
    pub reagents: Option<Vec<ReagentInput>>,
    #[validate(length(max = 255, message = "Catalyst cannot exceed 255 characters"))]
    pub catalyst: Option<String>,
    #[validate(nested)]
    pub reaction_conditions: Option<ReactionConditions>,
    #[validate(length(max = 5000, message = "Observations cannot exceed 5000 characters"))]
    pub observations: Option<String>,
    #[serde(default, rename = "yield", deserialize_with = "deserialize_present")]
    pub yield_percent: Option<Option<f64>>,
    #[validate(length(max = 5000, message = "Notes cannot exceed 5000 characters"))]
    pub notes: Option<String>,
    pub file_urls: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl UpdateLabEntry {
    /// Merges the provided fields into `entry`. Reagents are left for the
    /// caller, which must re-derive them.
    pub fn apply_to(self, entry: &mut LabEntry) -> Option<Vec<ReagentInput>> {
        if let Some(title) = self.title {
            entry.title = title.trim().to_string();
        }
        if let Some(date) = self.date {
            entry.date = date;
        }
        if let Some(experiment_type) = self.experiment_type {
            entry.experiment_type = experiment_type.trim().to_string();
        }
        if let Some(status) = self.status {
            entry.status = status;
        }
        if self.catalyst.is_some() {
            entry.catalyst = normalize_optional(self.catalyst);
        }
        if let Some(conditions) = self.reaction_conditions {
            entry.reaction_conditions = conditions;
        }
        if let Some(observations) = self.observations {
            entry.observations = observations;
        }
        if let Some(yield_percent) = self.yield_percent {
            entry.yield_percent = yield_percent;
        }
        if let Some(notes) = self.notes {
            entry.notes = notes;
        }
        if let Some(file_urls) = self.file_urls {
            entry.file_urls = file_urls;
        }
        if let Some(tags) = self.tags {
            entry.tags = normalize_tags(tags);
        }
        self.reagents
    }
}

// === HELPERS ===

/// Trims tags, drops empty ones and removes duplicates keeping the first
/// occurrence.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut error = validator::ValidationError::new("blank");
        error.message = Some("Value cannot be blank".into());
        Err(error)
    } else {
        Ok(())
    }
}

fn validate_yield_update(update: &UpdateLabEntry) -> Result<(), validator::ValidationError> {
    match update.yield_percent {
        Some(Some(value)) if !(0.0..=100.0).contains(&value) => {
            let mut error = validator::ValidationError::new("range");
            error.message = Some("Yield must be between 0 and 100".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

/// Wraps a present field, `null` included, in `Some` so it can be told
/// apart from an absent one.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Entry dates arrive either as RFC 3339 timestamps or as bare `YYYY-MM-DD`
/// dates from the date picker; bare dates mean midnight UTC.
pub mod entry_date {
    use super::*;

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid entry date '{}'", raw)))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid entry date '{}'", raw))),
            None => Ok(None),
        }
    }
}

// === TESTS ===
