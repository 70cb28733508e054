// src/notebook/service.rs
//! The lab notebook: entry and template collections over a store.
//!
//! Every mutation is load -> change -> save under one async lock, and every
//! write re-derives the reagent amounts, so stored equivalents always match
//! the stored concentrations and volumes.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use super::models::{
    EntryStatus, LabEntry, NewLabEntry, ReactionConditions, Reagent, ReagentInput, UpdateLabEntry,
};
use super::query::{filter_entries, get_all_tags, sort_entries, EntryQuery};
use super::repeat::{make_template, repeat_entry};
use super::stoichiometry::{compute_stoichiometry, limiting_reagent};
use super::store::{Collection, NotebookStore};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoichiometryPreview {
    pub reagents: Vec<Reagent>,
    pub limiting_index: usize,
    pub limiting_reagent: String,
}

pub struct LabNotebook {
    store: Arc<dyn NotebookStore>,
    write_lock: Mutex<()>,
}

impl LabNotebook {
    pub fn new(store: Arc<dyn NotebookStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    // ==================== READS ====================

    pub async fn list(&self, query: &EntryQuery) -> ApiResult<Vec<LabEntry>> {
        let entries = self.store.load(Collection::Entries).await?;
        let filter = query.filter();
        let (field, direction) = query.sort();
        Ok(sort_entries(filter_entries(&entries, &filter).cloned(), field, direction))
    }

    pub async fn get(&self, id: &str) -> ApiResult<LabEntry> {
        self.store
            .load(Collection::Entries)
            .await?
            .into_iter()
            .find(|entry| entry.id == id)
            .ok_or_else(|| ApiError::entry_not_found(id))
    }

    pub async fn templates(&self) -> ApiResult<Vec<LabEntry>> {
        self.store.load(Collection::Templates).await
    }

    pub async fn tags(&self) -> ApiResult<Vec<String>> {
        let entries = self.store.load(Collection::Entries).await?;
        Ok(get_all_tags(&entries))
    }

    pub async fn repeat_draft(&self, id: &str, today: NaiveDate) -> ApiResult<NewLabEntry> {
        let source = self.get(id).await?;
        Ok(repeat_entry(&source, today))
    }

    /// Live recomputation for the entry form; nothing is stored.
    pub fn preview_stoichiometry(&self, inputs: &[ReagentInput]) -> ApiResult<StoichiometryPreview> {
        let reagents = derive_reagents(inputs)?;
        let limiting_index = limiting_reagent(&reagents)
            .ok_or_else(|| ApiError::validation_failed("reagents", "at least one reagent is required"))?;
        Ok(StoichiometryPreview {
            limiting_reagent: reagents[limiting_index].name.clone(),
            limiting_index,
            reagents,
        })
    }

    // ==================== WRITES ====================

    pub async fn add_entry(&self, new_entry: NewLabEntry) -> ApiResult<LabEntry> {
        new_entry.validate()?;
        let reagents = derive_reagents(&new_entry.reagents)?;
        let entry = LabEntry::from_new(Uuid::new_v4().to_string(), new_entry, reagents);

        let _guard = self.write_lock.lock().await;
        let mut entries = self.store.load(Collection::Entries).await?;
        entries.push(entry.clone());
        self.store.save(Collection::Entries, &entries).await?;

        tracing::info!(entry_id = %entry.id, title = %entry.title, "Lab entry created");
        Ok(entry)
    }

    pub async fn update_entry(&self, id: &str, update: UpdateLabEntry) -> ApiResult<LabEntry> {
        update.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut entries = self.store.load(Collection::Entries).await?;
        let entry = entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| ApiError::entry_not_found(id))?;

        let inputs = match update.apply_to(entry) {
            Some(inputs) => inputs,
            None => entry.reagent_inputs(),
        };
        entry.reagents = derive_reagents(&inputs)?;
        let updated = entry.clone();

        self.store.save(Collection::Entries, &entries).await?;

        tracing::info!(entry_id = %updated.id, status = %updated.status, "Lab entry updated");
        Ok(updated)
    }

    pub async fn delete_entry(&self, id: &str) -> ApiResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.store.load(Collection::Entries).await?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Err(ApiError::entry_not_found(id));
        }
        self.store.save(Collection::Entries, &entries).await?;

        tracing::info!(entry_id = %id, "Lab entry deleted");
        Ok(())
    }

    pub async fn save_as_template(&self, id: &str) -> ApiResult<LabEntry> {
        let _guard = self.write_lock.lock().await;
        let entries = self.store.load(Collection::Entries).await?;
        let source = entries
            .iter()
            .find(|entry| entry.id == id)
            .ok_or_else(|| ApiError::entry_not_found(id))?;

        let template = make_template(source, format!("template-{}", Uuid::new_v4()));
        let mut templates = self.store.load(Collection::Templates).await?;
        templates.push(template.clone());
        self.store.save(Collection::Templates, &templates).await?;

        tracing::info!(entry_id = %id, template_id = %template.id, "Saved lab entry as template");
        Ok(template)
    }

    /// Writes the two demonstration experiments when the notebook has never
    /// been saved. Returns whether anything was written.
    pub async fn seed_samples_if_empty(&self) -> ApiResult<bool> {
        let _guard = self.write_lock.lock().await;
        if self.store.exists(Collection::Entries).await? {
            return Ok(false);
        }
        let samples = sample_entries()?;
        self.store.save(Collection::Entries, &samples).await?;

        tracing::info!(count = samples.len(), "Seeded lab notebook with sample entries");
        Ok(true)
    }
}

/// Trims reagent names and derives moles/equivalents.
pub fn derive_reagents(inputs: &[ReagentInput]) -> ApiResult<Vec<Reagent>> {
    let trimmed: Vec<ReagentInput> = inputs
        .iter()
        .map(|r| ReagentInput::new(r.name.trim(), r.concentration, r.volume))
        .collect();
    Ok(compute_stoichiometry(&trimmed)?)
}

fn sample_entries() -> ApiResult<Vec<LabEntry>> {
    let suzuki = NewLabEntry {
        title: "Suzuki Coupling Optimization".to_string(),
        date: Utc.with_ymd_and_hms(2023, 5, 15, 0, 0, 0).single().unwrap_or_else(Utc::now),
        experiment_type: "Optimization".to_string(),
        status: EntryStatus::Completed,
        reagents: vec![
            ReagentInput::new("4-Bromoanisole", 0.5, 2.0),
            ReagentInput::new("Phenylboronic acid", 0.6, 2.0),
        ],
        catalyst: Some("Pd(PPh3)4 (5 mol%)".to_string()),
        reaction_conditions: ReactionConditions {
            temperature: 80.0,
            pressure: 5.0,
            flow_rate: 0.5,
            residence_time: 10.0,
        },
        observations: "Reaction proceeded smoothly with good conversion".to_string(),
        yield_percent: Some(92.0),
        notes: "Observed some precipitation at the reactor outlet which was resolved by increasing the temperature to 85°C.".to_string(),
        file_urls: vec![],
        tags: vec![
            "suzuki".to_string(),
            "coupling".to_string(),
            "optimization".to_string(),
            "success".to_string(),
        ],
    };

    let amide = NewLabEntry {
        title: "Amide Formation Study".to_string(),
        date: Utc.with_ymd_and_hms(2023, 5, 18, 0, 0, 0).single().unwrap_or_else(Utc::now),
        experiment_type: "Study".to_string(),
        status: EntryStatus::Completed,
        reagents: vec![
            ReagentInput::new("Benzoic Acid", 0.5, 2.0),
            ReagentInput::new("Aniline", 0.5, 2.0),
        ],
        catalyst: Some("EDC/HOBt".to_string()),
        reaction_conditions: ReactionConditions {
            temperature: 25.0,
            pressure: 2.0,
            flow_rate: 0.2,
            residence_time: 5.0,
        },
        observations: "Room temperature reaction was sufficient for complete conversion".to_string(),
        yield_percent: Some(88.0),
        notes: "No clogging observed in the reactor".to_string(),
        file_urls: vec![],
        tags: vec![
            "amide".to_string(),
            "room-temperature".to_string(),
            "success".to_string(),
        ],
    };

    [("1", suzuki), ("2", amide)]
        .into_iter()
        .map(|(id, new_entry)| {
            let reagents = derive_reagents(&new_entry.reagents)?;
            Ok(LabEntry::from_new(id.to_string(), new_entry, reagents))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::query::{SortDirection, SortField};
    use crate::notebook::store::{MemoryNotebookStore, SqliteNotebookStore};

    fn notebook() -> LabNotebook {
        LabNotebook::new(Arc::new(MemoryNotebookStore::new()))
    }

    fn new_entry(title: &str, tags: &[&str]) -> NewLabEntry {
        NewLabEntry {
            title: title.to_string(),
            date: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            experiment_type: "Screening".to_string(),
            status: EntryStatus::Planned,
            reagents: vec![
                ReagentInput::new("  Azide ", 0.2, 5.0),
                ReagentInput::new("Alkyne", 0.25, 5.0),
            ],
            catalyst: Some("CuSO4".to_string()),
            reaction_conditions: ReactionConditions {
                temperature: 40.0,
                pressure: 1.0,
                flow_rate: 0.5,
                residence_time: 20.0,
            },
            observations: String::new(),
            yield_percent: None,
            notes: "click chemistry".to_string(),
            file_urls: vec![],
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[actix_rt::test]
    async fn test_add_entry_derives_reagents() {
        let notebook = notebook();
        let entry = notebook.add_entry(new_entry("CuAAC", &["click"])).await.unwrap();

        assert!(!entry.id.is_empty());
        assert!(!entry.is_template);
        assert_eq!(entry.reagents[0].name, "Azide");
        assert!((entry.reagents[0].moles - 0.001).abs() < 1e-12);
        assert_eq!(entry.reagents[0].equivalents, 1.0);
        assert!((entry.reagents[1].equivalents - 1.25).abs() < 1e-9);
        assert_eq!(notebook.get(&entry.id).await.unwrap(), entry);
    }

    #[actix_rt::test]
    async fn test_add_entry_rejects_invalid_forms() {
        let notebook = notebook();

        let mut zero = new_entry("Zero", &[]);
        zero.reagents[1].concentration = 0.0;
        let err = notebook.add_entry(zero).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
        assert!(err.to_string().contains("zero moles"));

        let mut empty = new_entry("Empty", &[]);
        empty.reagents.clear();
        assert!(matches!(notebook.add_entry(empty).await, Err(ApiError::ValidationError(_))));

        assert!(notebook.list(&EntryQuery::default()).await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_overflowing_reagents_leave_store_readable() {
        let store = SqliteNotebookStore::new(crate::db::test_pool().await);
        let notebook = LabNotebook::new(Arc::new(store));
        assert!(notebook.seed_samples_if_empty().await.unwrap());

        let mut huge = new_entry("Overflow", &[]);
        huge.reagents = vec![
            ReagentInput::new("A", 1.0, 1.0),
            ReagentInput::new("B", 1e308, 1e308),
        ];
        let err = notebook.add_entry(huge).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let entries = notebook.list(&EntryQuery::default()).await.unwrap();
        assert!(entries.iter().all(|e| e.title != "Overflow"));
        assert!(entries
            .iter()
            .flat_map(|e| e.reagents.iter())
            .all(|r| r.moles.is_finite() && r.equivalents.is_finite()));
        notebook.get("1").await.unwrap();
    }

    #[actix_rt::test]
    async fn test_update_recomputes_equivalents() {
        let notebook = notebook();
        let entry = notebook.add_entry(new_entry("CuAAC", &[])).await.unwrap();

        let update = UpdateLabEntry {
            reagents: Some(vec![
                ReagentInput::new("Azide", 0.2, 5.0),
                ReagentInput::new("Alkyne", 0.1, 5.0),
            ]),
            status: Some(EntryStatus::InProgress),
            ..Default::default()
        };
        let updated = notebook.update_entry(&entry.id, update).await.unwrap();

        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.status, EntryStatus::InProgress);
        assert_eq!(updated.reagents[1].equivalents, 1.0);
        assert!((updated.reagents[0].equivalents - 2.0).abs() < 1e-9);
        assert_eq!(updated.title, "CuAAC");
    }

    #[actix_rt::test]
    async fn test_status_may_move_freely() {
        let notebook = notebook();
        let mut entry = new_entry("Free", &[]);
        entry.status = EntryStatus::Completed;
        let entry = notebook.add_entry(entry).await.unwrap();

        let update = UpdateLabEntry { status: Some(EntryStatus::Planned), ..Default::default() };
        let updated = notebook.update_entry(&entry.id, update).await.unwrap();
        assert_eq!(updated.status, EntryStatus::Planned);
    }

    #[actix_rt::test]
    async fn test_update_and_delete_unknown_entry() {
        let notebook = notebook();
        assert!(matches!(
            notebook.update_entry("missing", UpdateLabEntry::default()).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(notebook.delete_entry("missing").await, Err(ApiError::NotFound(_))));
    }

    #[actix_rt::test]
    async fn test_delete_entry() {
        let notebook = notebook();
        let keep = notebook.add_entry(new_entry("Keep", &[])).await.unwrap();
        let drop = notebook.add_entry(new_entry("Drop", &[])).await.unwrap();

        notebook.delete_entry(&drop.id).await.unwrap();
        let remaining = notebook.list(&EntryQuery::default()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
    }

    #[actix_rt::test]
    async fn test_templates_live_apart_from_entries() {
        let notebook = notebook();
        let entry = notebook.add_entry(new_entry("Template me", &["flow"])).await.unwrap();

        let template = notebook.save_as_template(&entry.id).await.unwrap();
        assert!(template.is_template);
        assert!(template.id.starts_with("template-"));
        assert_eq!(template.reagents, entry.reagents);

        assert_eq!(notebook.templates().await.unwrap(), vec![template]);
        assert_eq!(notebook.list(&EntryQuery::default()).await.unwrap().len(), 1);
        assert_eq!(notebook.tags().await.unwrap(), vec!["flow"]);
    }

    #[actix_rt::test]
    async fn test_list_filters_and_sorts() {
        let notebook = notebook();
        notebook.add_entry(new_entry("beta run", &["a"])).await.unwrap();
        notebook.add_entry(new_entry("Alpha run", &["a", "b"])).await.unwrap();
        notebook.add_entry(new_entry("gamma", &["b"])).await.unwrap();

        let query = EntryQuery {
            search: Some("RUN".to_string()),
            sort_by: Some(SortField::Title),
            sort_order: Some(SortDirection::Asc),
            ..Default::default()
        };
        let titles: Vec<String> = notebook
            .list(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["Alpha run", "beta run"]);

        let tagged = EntryQuery { tag: Some("b".to_string()), ..Default::default() };
        assert_eq!(notebook.list(&tagged).await.unwrap().len(), 2);
        assert_eq!(notebook.tags().await.unwrap(), vec!["a", "b"]);
    }

    #[actix_rt::test]
    async fn test_repeat_draft() {
        let notebook = notebook();
        let entry = notebook.add_entry(new_entry("CuAAC", &["click"])).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let draft = notebook.repeat_draft(&entry.id, today).await.unwrap();
        assert_eq!(draft.title, "Copy of CuAAC");
        assert_eq!(draft.notes, "Repeated from experiment: CuAAC (Mar 1, 2024)");

        let repeated = notebook.add_entry(draft).await.unwrap();
        assert_eq!(repeated.reagents, entry.reagents);
        assert_eq!(notebook.list(&EntryQuery::default()).await.unwrap().len(), 2);
    }

    #[actix_rt::test]
    async fn test_seed_samples_only_once() {
        let notebook = notebook();
        assert!(notebook.seed_samples_if_empty().await.unwrap());
        assert!(!notebook.seed_samples_if_empty().await.unwrap());

        let suzuki = notebook.get("1").await.unwrap();
        assert!((suzuki.reagents[0].moles - 0.001).abs() < 1e-9);
        assert!((suzuki.reagents[1].equivalents - 1.2).abs() < 1e-9);
        assert_eq!(
            notebook.tags().await.unwrap(),
            vec!["amide", "coupling", "optimization", "room-temperature", "success", "suzuki"]
        );

        // an emptied notebook stays empty
        notebook.delete_entry("1").await.unwrap();
        notebook.delete_entry("2").await.unwrap();
        assert!(!notebook.seed_samples_if_empty().await.unwrap());
    }

    #[test]
    fn test_preview_stoichiometry() {
        let notebook = notebook();
        let preview = notebook
            .preview_stoichiometry(&[
                ReagentInput::new("A", 0.5, 2.0),
                ReagentInput::new("B", 0.6, 1.0),
            ])
            .unwrap();
        assert_eq!(preview.limiting_index, 1);
        assert_eq!(preview.limiting_reagent, "B");
        assert_eq!(preview.reagents[1].equivalents, 1.0);

        assert!(notebook.preview_stoichiometry(&[]).is_err());
    }
}
