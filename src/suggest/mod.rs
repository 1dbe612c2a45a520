//! AI parameter suggestions
//!
//! A request captures the current values, locked ids and spectrum summary
//! on the UI thread, runs on a single background worker, and comes back as
//! an id → value mapping that [`SuggestionApplier`] writes into the store.
//! The audio thread never touches any of this.

mod applier;
mod history;
mod prompt;
mod service;
mod snapshot;
mod worker;

pub use applier::{
    extract_json_object, parse_suggestion, ApplyReport, SuggestionApplier, SuggestionMapping,
};
pub use history::{ChatHistory, ChatMessage, Role, DEFAULT_MAX_EXCHANGES};
pub use prompt::{PendingSuggestion, PromptTemplate, LOCK_NOTE_PLACEHOLDER, QUICK_COMMANDS};
pub use service::{assistant_text, ChatCompletionsClient, SuggestionService};
pub use snapshot::UndoSnapshot;
pub use worker::{SuggestionOutcome, SuggestionWorker, WorkerState};
