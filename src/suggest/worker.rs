//! Background suggestion worker
//!
//! Exactly one thread performs service calls. Jobs arrive through a
//! `crossbeam` channel of capacity 1 fed with `try_send`, so a request made
//! while another is outstanding is dropped rather than queued. Results come
//! back on a second channel and are applied by whoever polls them, never by
//! the worker itself.
//!
//! ```text
//! Idle ──submit──▶ Requesting ──ok──▶ Applying ──finish_apply──▶ Idle
//!                      │
//!                      └──────err──────────────────────────────▶ Idle
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use uuid::Uuid;

use super::applier::{extract_json_object, parse_suggestion, SuggestionMapping};
use super::history::ChatHistory;
use super::prompt::{PendingSuggestion, PromptTemplate};
use super::service::SuggestionService;
use crate::error::{KeroError, Result};

/// Where the request pipeline currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Requesting = 1,
    Applying = 2,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => WorkerState::Requesting,
            2 => WorkerState::Applying,
            _ => WorkerState::Idle,
        }
    }
}

/// Result of one request, delivered back to the polling thread
#[derive(Debug)]
pub struct SuggestionOutcome {
    pub id: Uuid,
    pub prompt: String,
    pub result: Result<SuggestionMapping>,
}

/// Handle to the single background worker thread
pub struct SuggestionWorker {
    state: Arc<AtomicU8>,
    jobs: Option<Sender<PendingSuggestion>>,
    results: Receiver<SuggestionOutcome>,
    history: Arc<Mutex<ChatHistory>>,
    handle: Option<JoinHandle<()>>,
}

impl SuggestionWorker {
    /// Start the worker thread
    pub fn spawn<S>(service: S, template: PromptTemplate, history_exchanges: usize) -> Result<Self>
    where
        S: SuggestionService + 'static,
    {
        let (job_tx, job_rx) = channel::bounded::<PendingSuggestion>(1);
        let (result_tx, result_rx) = channel::unbounded();
        let state = Arc::new(AtomicU8::new(WorkerState::Idle as u8));
        let history = Arc::new(Mutex::new(ChatHistory::new(history_exchanges)));

        let ctx = WorkerContext {
            service,
            template,
            state: Arc::clone(&state),
            history: Arc::clone(&history),
        };

        let handle = std::thread::Builder::new()
            .name("keromix-suggest".to_string())
            .spawn(move || ctx.run(job_rx, result_tx))?;

        Ok(Self {
            state,
            jobs: Some(job_tx),
            results: result_rx,
            history,
            handle: Some(handle),
        })
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_busy(&self) -> bool {
        self.state() != WorkerState::Idle
    }

    /// Hand a request to the worker.
    ///
    /// Fails with [`KeroError::RequestAlreadyInFlight`] unless the worker is
    /// idle; the request is dropped, not queued.
    pub fn submit(&self, pending: PendingSuggestion) -> Result<()> {
        if self
            .state
            .compare_exchange(
                WorkerState::Idle as u8,
                WorkerState::Requesting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            tracing::debug!(prompt = %pending.prompt, "Suggestion dropped, request in flight");
            return Err(KeroError::RequestAlreadyInFlight);
        }

        let Some(jobs) = self.jobs.as_ref() else {
            self.set_state(WorkerState::Idle);
            return Err(KeroError::TransportFailure {
                reason: "suggestion worker stopped".to_string(),
            });
        };

        match jobs.try_send(pending) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                // Previous job not yet picked up; keep the worker's state
                Err(KeroError::RequestAlreadyInFlight)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.set_state(WorkerState::Idle);
                Err(KeroError::TransportFailure {
                    reason: "suggestion worker stopped".to_string(),
                })
            }
        }
    }

    /// Next finished request, if any. Never blocks.
    pub fn try_recv(&self) -> Option<SuggestionOutcome> {
        self.results.try_recv().ok()
    }

    /// Block up to `timeout` for the next finished request
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SuggestionOutcome> {
        match self.results.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Mark a successful result as applied, returning to idle
    pub fn finish_apply(&self) {
        self.set_state(WorkerState::Idle);
    }

    /// Shared conversation history
    pub fn history(&self) -> Arc<Mutex<ChatHistory>> {
        Arc::clone(&self.history)
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl Drop for SuggestionWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Suggestion worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for SuggestionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionWorker")
            .field("state", &self.state())
            .finish()
    }
}

/// State moved into the worker thread
struct WorkerContext<S> {
    service: S,
    template: PromptTemplate,
    state: Arc<AtomicU8>,
    history: Arc<Mutex<ChatHistory>>,
}

impl<S: SuggestionService> WorkerContext<S> {
    fn run(self, jobs: Receiver<PendingSuggestion>, results: Sender<SuggestionOutcome>) {
        for pending in jobs.iter() {
            let result = self.handle(&pending);

            let next = match &result {
                Ok(_) => WorkerState::Applying,
                Err(_) => WorkerState::Idle,
            };
            self.state.store(next as u8, Ordering::Release);

            let outcome = SuggestionOutcome {
                id: pending.id,
                prompt: pending.prompt,
                result,
            };
            if results.send(outcome).is_err() {
                break;
            }
        }
        tracing::debug!("Suggestion worker exiting");
    }

    fn handle(&self, pending: &PendingSuggestion) -> Result<SuggestionMapping> {
        // History lock is held only while copying messages out
        let messages = {
            let history = self.history.lock();
            self.template.build_messages(&history, pending)
        };

        tracing::debug!(id = %pending.id, prompt = %pending.prompt, "Requesting suggestion");

        let text = self.service.complete(&messages).map_err(|e| {
            tracing::warn!(id = %pending.id, error = %e, "Suggestion request failed");
            e
        })?;

        let mapping = parse_suggestion(&text).map_err(|e| {
            tracing::warn!(id = %pending.id, error = %e, "Suggestion response unparseable");
            e
        })?;

        if let Some(object) = extract_json_object(&text) {
            self.history
                .lock()
                .record(pending.history_content(), object.to_string());
        }

        tracing::debug!(id = %pending.id, entries = mapping.len(), "Suggestion received");
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SpectrumBands;
    use crate::params::{LockState, ParameterStore};
    use crate::suggest::history::ChatMessage;

    const WAIT: Duration = Duration::from_secs(5);

    struct Echo(&'static str);

    impl SuggestionService for Echo {
        fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl SuggestionService for Failing {
        fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Err(KeroError::TransportFailure {
                reason: "offline".to_string(),
            })
        }
    }

    fn pending(prompt: &str) -> PendingSuggestion {
        PendingSuggestion::new(
            prompt,
            &ParameterStore::new().snapshot(),
            &LockState::new(),
            &SpectrumBands::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_success_goes_to_applying() {
        let worker = SuggestionWorker::spawn(Echo(r#"ok {"lowG":2}"#), PromptTemplate::default(), 6)
            .unwrap();
        worker.submit(pending("Warmer")).unwrap();

        let outcome = worker.recv_timeout(WAIT).unwrap();
        assert_eq!(outcome.result.unwrap().get("lowG"), Some(&2.0));
        assert_eq!(worker.state(), WorkerState::Applying);
        assert!(worker.submit(pending("again")).is_err());

        worker.finish_apply();
        assert_eq!(worker.state(), WorkerState::Idle);
        assert_eq!(worker.history().lock().len(), 1);
    }

    #[test]
    fn test_failure_returns_to_idle() {
        let worker = SuggestionWorker::spawn(Failing, PromptTemplate::default(), 6).unwrap();
        worker.submit(pending("Warmer")).unwrap();

        let outcome = worker.recv_timeout(WAIT).unwrap();
        assert!(matches!(
            outcome.result,
            Err(KeroError::TransportFailure { .. })
        ));
        assert_eq!(worker.state(), WorkerState::Idle);
        assert!(worker.history().lock().is_empty());
    }

    #[test]
    fn test_unparseable_not_recorded() {
        let worker =
            SuggestionWorker::spawn(Echo("no idea"), PromptTemplate::default(), 6).unwrap();
        worker.submit(pending("Warmer")).unwrap();
        let outcome = worker.recv_timeout(WAIT).unwrap();
        assert_eq!(
            outcome.result.unwrap_err().raw_response(),
            Some("no idea")
        );
        assert!(worker.history().lock().is_empty());
    }

    #[test]
    fn test_drop_joins_thread() {
        let worker = SuggestionWorker::spawn(Echo("{}"), PromptTemplate::default(), 6).unwrap();
        drop(worker);
    }
}
