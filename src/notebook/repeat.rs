// src/notebook/repeat.rs
//! Drafts derived from existing entries: "repeat experiment" and templates.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::models::{EntryStatus, LabEntry, NewLabEntry};

/// "Apr 15, 2023"
pub fn format_entry_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Pre-filled form for running `source` again. Nothing is persisted.
pub fn repeat_entry(source: &LabEntry, today: NaiveDate) -> NewLabEntry {
    NewLabEntry {
        title: format!("Copy of {}", source.title),
        date: today.and_time(NaiveTime::default()).and_utc(),
        experiment_type: source.experiment_type.clone(),
        status: EntryStatus::Planned,
        reagents: source.reagent_inputs(),
        catalyst: source.catalyst.clone(),
        reaction_conditions: source.reaction_conditions,
        observations: String::new(),
        yield_percent: None,
        notes: format!(
            "Repeated from experiment: {} ({})",
            source.title,
            format_entry_date(&source.date)
        ),
        file_urls: Vec::new(),
        tags: source.tags.clone(),
    }
}

/// Copy of `source` stored in the template collection under `id`.
pub fn make_template(source: &LabEntry, id: String) -> LabEntry {
    LabEntry {
        id,
        is_template: true,
        ..source.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::models::{ReactionConditions, ReagentInput};
    use crate::notebook::stoichiometry::compute_stoichiometry;
    use chrono::TimeZone;

    fn completed_entry() -> LabEntry {
        let inputs = vec![
            ReagentInput::new("4-Bromoanisole", 0.5, 2.0),
            ReagentInput::new("Phenylboronic acid", 0.6, 2.0),
        ];
        LabEntry {
            id: "1".to_string(),
            title: "Suzuki Coupling Optimization".to_string(),
            date: Utc.with_ymd_and_hms(2023, 5, 15, 0, 0, 0).unwrap(),
            experiment_type: "Optimization".to_string(),
            status: EntryStatus::Completed,
            reagents: compute_stoichiometry(&inputs).unwrap(),
            catalyst: Some("Pd(PPh3)4 (5 mol%)".to_string()),
            reaction_conditions: ReactionConditions {
                temperature: 80.0,
                pressure: 5.0,
                flow_rate: 0.5,
                residence_time: 10.0,
            },
            observations: "Reaction proceeded smoothly".to_string(),
            yield_percent: Some(92.0),
            notes: "Some precipitation".to_string(),
            file_urls: vec!["https://files.example.com/run-1.pdf".to_string()],
            tags: vec!["suzuki".to_string(), "coupling".to_string()],
            is_template: false,
        }
    }

    #[test]
    fn test_repeat_resets_run_specific_fields() {
        let source = completed_entry();
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let draft = repeat_entry(&source, today);

        assert_eq!(draft.title, "Copy of Suzuki Coupling Optimization");
        assert_eq!(draft.date, Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap());
        assert_eq!(draft.status, EntryStatus::Planned);
        assert_eq!(draft.observations, "");
        assert_eq!(draft.yield_percent, None);
        assert!(draft.file_urls.is_empty());
        assert_eq!(
            draft.notes,
            "Repeated from experiment: Suzuki Coupling Optimization (May 15, 2023)"
        );
    }

    #[test]
    fn test_repeat_preserves_chemistry() {
        let source = completed_entry();
        let draft = repeat_entry(&source, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        assert_eq!(draft.reagents, source.reagent_inputs());
        assert_eq!(compute_stoichiometry(&draft.reagents).unwrap(), source.reagents);
        assert_eq!(draft.reaction_conditions, source.reaction_conditions);
        assert_eq!(draft.catalyst, source.catalyst);
        assert_eq!(draft.tags, source.tags);
        assert_eq!(draft.experiment_type, source.experiment_type);
    }

    #[test]
    fn test_make_template() {
        let source = completed_entry();
        let template = make_template(&source, "template-abc".to_string());
        assert!(template.is_template);
        assert_eq!(template.id, "template-abc");
        assert_eq!(template.reagents, source.reagents);
        assert_eq!(template.title, source.title);
    }

    #[test]
    fn test_format_entry_date() {
        let date = Utc.with_ymd_and_hms(2023, 4, 5, 14, 30, 0).unwrap();
        assert_eq!(format_entry_date(&date), "Apr 5, 2023");
    }
}
