// src/notebook/query.rs
//! Filtering, sorting and tag aggregation over notebook entries.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::models::LabEntry;

// ==================== FILTER ====================

/// Inclusive calendar-day range. `to` covers the whole day, up to
/// 23:59:59.999 UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.from
            .and_then(|d| d.and_hms_milli_opt(0, 0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.to
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .map(|dt| dt.and_utc())
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        if let Some(start) = self.start() {
            if *ts < start {
                return false;
            }
        }
        if let Some(end) = self.end() {
            if *ts > end {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub date_range: DateRange,
}

impl EntryFilter {
    pub fn matches(&self, entry: &LabEntry) -> bool {
        self.matches_search(entry)
            && self.tag.as_deref().map_or(true, |tag| entry.has_tag(tag))
            && self.date_range.contains(&entry.date)
    }

    fn matches_search(&self, entry: &LabEntry) -> bool {
        let query = match self.search.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.to_lowercase(),
            _ => return true,
        };
        entry.title.to_lowercase().contains(&query) || entry.notes.to_lowercase().contains(&query)
    }
}

/// Lazily yields the non-template entries matching every part of `filter`.
/// Call again to restart.
pub fn filter_entries<'a>(
    entries: &'a [LabEntry],
    filter: &'a EntryFilter,
) -> impl Iterator<Item = &'a LabEntry> + 'a {
    entries
        .iter()
        .filter(move |entry| !entry.is_template && filter.matches(entry))
}

// ==================== SORT ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Date,
    Title,
    #[serde(alias = "experiment_type")]
    ExperimentType,
    Status,
    Yield,
    Temperature,
    Pressure,
    #[serde(alias = "flow_rate")]
    FlowRate,
    #[serde(alias = "residence_time")]
    ResidenceTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Collation used for text columns: case-insensitive first, lowercase
/// before uppercase on ties.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| b.cmp(a))
}

fn compare_by(a: &LabEntry, b: &LabEntry, field: SortField, direction: SortDirection) -> Ordering {
    let conditions = |e: &LabEntry| e.reaction_conditions;
    match field {
        SortField::Date => direction.apply(a.date.cmp(&b.date)),
        SortField::Title => direction.apply(locale_compare(&a.title, &b.title)),
        SortField::ExperimentType => direction.apply(locale_compare(&a.experiment_type, &b.experiment_type)),
        SortField::Status => direction.apply(locale_compare(a.status.as_str(), b.status.as_str())),
        // Entries without a yield go last whichever way the column is sorted
        SortField::Yield => match (a.yield_percent, b.yield_percent) {
            (Some(x), Some(y)) => direction.apply(x.total_cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortField::Temperature => {
            direction.apply(conditions(a).temperature.total_cmp(&conditions(b).temperature))
        }
        SortField::Pressure => direction.apply(conditions(a).pressure.total_cmp(&conditions(b).pressure)),
        SortField::FlowRate => direction.apply(conditions(a).flow_rate.total_cmp(&conditions(b).flow_rate)),
        SortField::ResidenceTime => {
            direction.apply(conditions(a).residence_time.total_cmp(&conditions(b).residence_time))
        }
    }
}

/// Stable sort: entries with equal keys keep their relative order.
pub fn sort_entries_in_place(entries: &mut [LabEntry], field: SortField, direction: SortDirection) {
    entries.sort_by(|a, b| compare_by(a, b, field, direction));
}

pub fn sort_entries<I>(entries: I, field: SortField, direction: SortDirection) -> Vec<LabEntry>
where
    I: IntoIterator<Item = LabEntry>,
{
    let mut sorted: Vec<LabEntry> = entries.into_iter().collect();
    sort_entries_in_place(&mut sorted, field, direction);
    sorted
}

// ==================== TAGS ====================

/// Every tag used by a non-template entry, de-duplicated and ascending.
pub fn get_all_tags(entries: &[LabEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| !entry.is_template)
        .flat_map(|entry| entry.tags.iter().cloned())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

// ==================== QUERY PARAMS ====================

/// Listing parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryQuery {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortDirection>,
}

impl EntryQuery {
    pub fn filter(&self) -> EntryFilter {
        EntryFilter {
            search: self.search.clone(),
            tag: self.tag.clone().filter(|t| !t.trim().is_empty()),
            date_range: DateRange::new(self.from, self.to),
        }
    }

    /// Newest first unless asked otherwise.
    pub fn sort(&self) -> (SortField, SortDirection) {
        (
            self.sort_by.unwrap_or_default(),
            self.sort_order.unwrap_or(SortDirection::Desc),
        )
    }
}
