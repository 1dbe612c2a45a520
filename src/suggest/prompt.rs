//! Request payload and message construction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::history::{ChatHistory, ChatMessage};
use crate::analysis::SpectrumBands;
use crate::error::Result;
use crate::params::{LockState, ParamValues};

/// Placeholder in the system text replaced by the lock note
pub const LOCK_NOTE_PLACEHOLDER: &str = "{lock_note}";

/// One-click prompts offered by the editor
pub const QUICK_COMMANDS: [&str; 8] = [
    "Warmer",
    "Brighter",
    "More punch",
    "Add reverb",
    "Dry & clean",
    "Reduce mud",
    "Airy & spacious",
    "Subtle overall",
];

const DEFAULT_SYSTEM: &str = "You are an audio mix engineer AI. \
Input: current param values, spectrum LOW/MID/HIGH dB, user request. \
Output: ONLY a JSON object with changed param keys. \
Params: lowG/midG/highG dB, lowFreq/midFreq/highFreq Hz, midQ 0.3-4, \
compThresh dB, compRatio, compAttack ms, compRelease ms, compMakeup dB, \
delayTime s, delayFeedback 0-0.9, delayMix 0-1, \
revDecay/revSize/revDamp/revMix 0-1, aimix 0-1. \
Rules:1.Small changes unless user says much/a lot. \
2.Base on current values. Never reset. \
3.{lock_note} \
4.Use spectrum to guide EQ. \
5.warm=+lowG-highG.bright=+highG.punchy=+compRatio-compThresh.\
airy=+revMix+revSize.dry=-revMix-delayMix.muddy=-lowG-midG.harsh=-highG. \
6.JSON only. No markdown.";

/// Everything the worker needs for one request, captured on the UI thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSuggestion {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// User request text
    pub prompt: String,
    /// Current values as a compact JSON object
    pub params_json: String,
    /// Ids of every parameter in a locked group
    pub locked_ids: Vec<String>,
    /// Band summary, e.g. `Low:-12.0dB Mid:-20.0dB High:-35.5dB`
    pub spectrum: String,
}

impl PendingSuggestion {
    pub fn new(
        prompt: impl Into<String>,
        values: &ParamValues,
        locks: &LockState,
        spectrum: &SpectrumBands,
    ) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            prompt: prompt.into(),
            params_json: values.to_json_string()?,
            locked_ids: locks
                .locked_params()
                .iter()
                .map(|id| id.as_str().to_string())
                .collect(),
            spectrum: spectrum.summary(),
        })
    }

    /// User message sent to the service
    pub fn user_content(&self) -> String {
        format!(
            "Spectrum:{} Params:{} Request:{}",
            self.spectrum, self.params_json, self.prompt
        )
    }

    /// User turn as remembered in the history
    pub fn history_content(&self) -> String {
        format!("Params:{} Request:{}", self.params_json, self.prompt)
    }
}

/// System instruction sent with every request
///
/// The text is configuration; only `{lock_note}` is substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
        }
    }

    /// Sentence telling the service which ids it must leave alone
    pub fn lock_note(locked_ids: &[String]) -> String {
        if locked_ids.is_empty() {
            "No params locked.".to_string()
        } else {
            format!(
                "LOCKED - do NOT change: {}. Omit from JSON.",
                locked_ids.join(",")
            )
        }
    }

    pub fn system_message(&self, locked_ids: &[String]) -> String {
        self.system
            .replace(LOCK_NOTE_PLACEHOLDER, &Self::lock_note(locked_ids))
    }

    /// System message, then prior exchanges, then the new request
    pub fn build_messages(
        &self,
        history: &ChatHistory,
        pending: &PendingSuggestion,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(self.system_message(&pending.locked_ids)));
        messages.extend(history.messages().cloned());
        messages.push(ChatMessage::user(pending.user_content()));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamGroup, ParameterStore};
    use crate::suggest::history::Role;

    fn pending(locks: &LockState) -> PendingSuggestion {
        let store = ParameterStore::new();
        PendingSuggestion::new("Warmer", &store.snapshot(), locks, &SpectrumBands::default())
            .unwrap()
    }

    #[test]
    fn test_lock_note() {
        assert_eq!(PromptTemplate::lock_note(&[]), "No params locked.");
        let ids = vec!["delayTime".to_string(), "delayMix".to_string()];
        assert_eq!(
            PromptTemplate::lock_note(&ids),
            "LOCKED - do NOT change: delayTime,delayMix. Omit from JSON."
        );
    }

    #[test]
    fn test_default_template_carries_lock_note() {
        let locks = LockState::new();
        locks.set_locked(ParamGroup::Master, true);
        let p = pending(&locks);
        let system = PromptTemplate::default().system_message(&p.locked_ids);
        assert!(system.contains("LOCKED - do NOT change: aimix."));
        assert!(!system.contains(LOCK_NOTE_PLACEHOLDER));
    }

    #[test]
    fn test_user_content_layout() {
        let p = pending(&LockState::new());
        let content = p.user_content();
        assert!(content.starts_with("Spectrum:Low:-60.0dB Mid:-60.0dB High:-60.0dB Params:{"));
        assert!(content.ends_with("} Request:Warmer"));
        assert!(p.history_content().starts_with("Params:{\"lowG\":0"));
    }

    #[test]
    fn test_build_messages_order() {
        let mut history = ChatHistory::default();
        history.record("Params:{} Request:brighter", r#"{"highG":2}"#);
        let p = pending(&LockState::new());

        let messages = PromptTemplate::default().build_messages(&history, &p);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[3].content, p.user_content());
    }
}
