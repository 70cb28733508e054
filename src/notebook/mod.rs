// src/notebook/mod.rs
pub mod models;
pub mod query;
pub mod repeat;
pub mod service;
pub mod stoichiometry;
pub mod store;

pub use models::{EntryStatus, LabEntry, NewLabEntry, ReactionConditions, Reagent, ReagentInput, UpdateLabEntry};
pub use query::{filter_entries, get_all_tags, sort_entries, DateRange, EntryFilter, EntryQuery, SortDirection, SortField};
pub use repeat::{make_template, repeat_entry};
pub use service::{LabNotebook, StoichiometryPreview};
pub use stoichiometry::{compute_stoichiometry, limiting_reagent, StoichiometryError};
pub use store::{Collection, MemoryNotebookStore, NotebookStore, SqliteNotebookStore};
