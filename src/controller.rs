//! UI/message-thread side of the engine
//!
//! [`MixController`] is what an editor talks to: it owns the lock flags,
//! the undo slot, the spectrum analyzer, the suggestion worker and the preset
//! library, and shares the parameter store and spectrum bridge with the
//! processor. Every method here runs off the audio thread.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::analysis::{SpectrumAnalyzer, SpectrumBands, SpectrumBridge};
use crate::config::EngineConfig;
use crate::error::{KeroError, Result};
use crate::params::{LockState, ParamGroup, ParamId, ParameterStore};
use crate::preset::PresetLibrary;
use crate::suggest::{
    ApplyReport, ChatCompletionsClient, PendingSuggestion, SuggestionApplier, SuggestionOutcome,
    SuggestionService, SuggestionWorker, UndoSnapshot, WorkerState,
};

/// Editor-facing controller
#[derive(Debug)]
pub struct MixController {
    params: Arc<ParameterStore>,
    bridge: Arc<SpectrumBridge>,
    locks: LockState,
    undo: UndoSnapshot,
    analyzer: SpectrumAnalyzer,
    worker: SuggestionWorker,
    applier: SuggestionApplier,
    presets: PresetLibrary,
    service_ready: bool,
    status: String,
}

impl MixController {
    /// Controller talking to the configured chat-completions service
    pub fn new(
        config: &EngineConfig,
        params: Arc<ParameterStore>,
        bridge: Arc<SpectrumBridge>,
    ) -> Result<Self> {
        let service_ready = config.service.has_api_key();
        let client = ChatCompletionsClient::new(config.service.clone());
        let mut controller = Self::with_service(config, client, params, bridge)?;
        controller.service_ready = service_ready;
        Ok(controller)
    }

    /// Controller with any [`SuggestionService`], e.g. a local model or a test double
    pub fn with_service<S>(
        config: &EngineConfig,
        service: S,
        params: Arc<ParameterStore>,
        bridge: Arc<SpectrumBridge>,
    ) -> Result<Self>
    where
        S: SuggestionService + 'static,
    {
        let worker =
            SuggestionWorker::spawn(service, config.prompt.clone(), config.history_exchanges)?;
        Ok(Self {
            params,
            bridge,
            locks: LockState::new(),
            undo: UndoSnapshot::new(),
            analyzer: SpectrumAnalyzer::new(),
            worker,
            applier: SuggestionApplier::new(),
            presets: PresetLibrary::new(config.preset_dir.clone()),
            service_ready: true,
            status: String::new(),
        })
    }

    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Last status line for the editor
    pub fn status(&self) -> &str {
        &self.status
    }

    // Suggestions

    /// Start a suggestion request for `text`.
    ///
    /// Blank text is ignored (`Ok(None)`). Otherwise the undo snapshot is
    /// captured and the request handed to the worker. A request made while
    /// another is outstanding is dropped without touching the snapshot.
    pub fn request_suggestion(&mut self, text: &str) -> Result<Option<Uuid>> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return Ok(None);
        }
        if !self.service_ready {
            self.status = KeroError::MissingApiKey.status_message();
            return Err(KeroError::MissingApiKey);
        }
        if self.worker.is_busy() {
            return Err(KeroError::RequestAlreadyInFlight);
        }

        let pending = PendingSuggestion::new(
            prompt,
            &self.params.snapshot(),
            &self.locks,
            &self.analyzer.bands(),
        )?;
        self.undo.capture(&self.params);

        let id = pending.id;
        self.worker.submit(pending)?;

        tracing::debug!(%id, prompt, "Suggestion requested");
        self.status = "Processing...".to_string();
        Ok(Some(id))
    }

    /// Apply a finished request, if one is waiting. Never blocks.
    pub fn poll_suggestion(&mut self) -> Option<Result<ApplyReport>> {
        let outcome = self.worker.try_recv()?;
        Some(self.finish(outcome))
    }

    /// Block up to `timeout` for a finished request and apply it
    pub fn wait_for_suggestion(&mut self, timeout: Duration) -> Option<Result<ApplyReport>> {
        let outcome = self.worker.recv_timeout(timeout)?;
        Some(self.finish(outcome))
    }

    fn finish(&mut self, outcome: SuggestionOutcome) -> Result<ApplyReport> {
        match outcome.result {
            Ok(mapping) => {
                let report = self.applier.apply(&mapping, &self.params, &self.locks);
                self.worker.finish_apply();
                tracing::info!(
                    id = %outcome.id,
                    applied = report.applied_count(),
                    skipped_locked = report.skipped_locked.len(),
                    ignored = report.ignored_unknown.len(),
                    "Suggestion applied"
                );
                self.status = report.status_message();
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(id = %outcome.id, error = %e, "Suggestion failed");
                self.status = e.status_message();
                Err(e)
            }
        }
    }

    pub fn suggestion_state(&self) -> WorkerState {
        self.worker.state()
    }

    pub fn is_requesting(&self) -> bool {
        self.worker.is_busy()
    }

    /// Number of remembered exchanges
    pub fn history_len(&self) -> usize {
        self.worker.history().lock().len()
    }

    pub fn clear_history(&self) {
        self.worker.history().lock().clear();
    }

    // Locks

    pub fn set_group_locked(&self, group: ParamGroup, locked: bool) {
        self.locks.set_locked(group, locked);
    }

    /// Flip a group's lock and return the new state
    pub fn toggle_group_lock(&self, group: ParamGroup) -> bool {
        self.locks.toggle(group)
    }

    pub fn is_group_locked(&self, group: ParamGroup) -> bool {
        self.locks.is_group_locked(group)
    }

    pub fn locks(&self) -> &LockState {
        &self.locks
    }

    // Undo

    /// Restore the values captured before the last suggestion request
    pub fn undo(&mut self) -> bool {
        let restored = self.undo.restore(&self.params);
        if restored {
            tracing::info!("Restored pre-suggestion values");
            self.status = "Undone.".to_string();
        }
        restored
    }

    pub fn can_undo(&self) -> bool {
        self.undo.is_available()
    }

    // Spectrum

    /// Drain the bridge and update the band estimates
    pub fn tick_spectrum(&mut self) -> bool {
        self.analyzer.update(&self.bridge)
    }

    pub fn spectrum(&self) -> SpectrumBands {
        self.analyzer.bands()
    }

    // Parameters

    /// Plain user edit
    pub fn set_param(&self, id: ParamId, value: f32) -> f32 {
        self.params.set(id, value)
    }

    pub fn param(&self, id: ParamId) -> f32 {
        self.params.get(id)
    }

    // Presets

    pub fn presets(&self) -> &PresetLibrary {
        &self.presets
    }

    pub fn save_preset(&mut self, name: &str) -> Result<PathBuf> {
        let path = self.presets.save(name, &self.params.snapshot())?;
        self.status = format!("Saved: {}", name.trim());
        Ok(path)
    }

    /// Load a preset into the store, ignoring locks
    pub fn load_preset(&mut self, name: &str) -> Result<usize> {
        let preset = self.presets.load(name)?;
        let written = preset.apply_to(&self.params);
        self.status = format!("Loaded: {}", preset.name);
        Ok(written)
    }

    pub fn delete_preset(&mut self, name: &str) -> Result<()> {
        self.presets.delete(name)?;
        self.status = format!("Deleted: {}", name.trim());
        Ok(())
    }

    pub fn preset_names(&self) -> Result<Vec<String>> {
        self.presets.list()
    }
}
