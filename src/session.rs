// Session module - the generation session state machine
//
// SessionStore owns the conversation transcript, the draft prompt, the
// selected model and sampling parameters, and the in-flight status. It is the
// only writer of that state: the TUI event loop holds it exclusively and runs
// each command to completion, so no locks are needed. The one suspension
// point is the generation call, which submit() spawns as a task; its outcome
// re-enters the loop as an AppEvent and is reconciled by resolve().
//
// Single-flight discipline: at most one generation request is outstanding per
// session. submit() while a request is in flight is rejected, and every
// completion is checked against the current request id before it is applied.

use crate::catalog::Catalog;
use crate::events::AppEvent;
use crate::generation::{GenerationError, GenerationService};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────────────
// Transcript types
// ─────────────────────────────────────────────────────────────────────────────

/// Author of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the transcript, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sampling parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Sampling parameters, always within their closed ranges
///
/// Out-of-range input is rejected at the command boundary (set_parameter);
/// invalid values are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParameters {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
            top_p: 0.9,
        }
    }
}

/// The three tunable parameters, used to address them in set_parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Temperature,
    MaxTokens,
    TopP,
}

impl Param {
    pub const ALL: [Param; 3] = [Param::Temperature, Param::MaxTokens, Param::TopP];

    pub fn name(&self) -> &'static str {
        match self {
            Param::Temperature => "temperature",
            Param::MaxTokens => "max_tokens",
            Param::TopP => "top_p",
        }
    }

    /// Closed range of valid values
    pub fn range(&self) -> (f64, f64) {
        match self {
            Param::Temperature => (0.0, 2.0),
            Param::MaxTokens => (100.0, 4096.0),
            Param::TopP => (0.0, 1.0),
        }
    }

    /// Adjustment step used by the TUI steppers
    pub fn step(&self) -> f64 {
        match self {
            Param::Temperature => 0.1,
            Param::MaxTokens => 100.0,
            Param::TopP => 0.05,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands and errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from SessionStore commands
///
/// All of these are recovered locally: the command is rejected, state is
/// unchanged, and the user gets a toast. There is no error state distinct
/// from Idle.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("a generation request is already in flight")]
    RequestInFlight,

    #[error("{param} must be between {min} and {max}")]
    OutOfRange { param: Param, min: f64, max: f64 },

    #[error("template not found: {0}")]
    TemplateNotFound(String),
}

/// Whether a generation request is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    InFlight,
}

/// Read-only copy of session state handed to the presentation layer
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub draft_prompt: String,
    pub selected_model_id: String,
    pub params: SamplingParameters,
    pub transcript: Vec<Turn>,
    pub status: RequestStatus,
}

// ─────────────────────────────────────────────────────────────────────────────
// The store
// ─────────────────────────────────────────────────────────────────────────────

/// The generation session state machine
pub struct SessionStore {
    draft_prompt: String,
    selected_model_id: String,
    params: SamplingParameters,
    transcript: Vec<Turn>,
    /// Id of the outstanding request; Some ⇔ status is InFlight
    in_flight: Option<u64>,
    next_request_id: u64,
    /// Read-only reference data, installed once after the startup fetch
    catalog: Catalog,
    service: Arc<dyn GenerationService>,
    events_tx: mpsc::Sender<AppEvent>,
}

impl SessionStore {
    pub fn new(
        service: Arc<dyn GenerationService>,
        events_tx: mpsc::Sender<AppEvent>,
        default_model: String,
    ) -> Self {
        Self {
            draft_prompt: String::new(),
            selected_model_id: default_model,
            params: SamplingParameters::default(),
            transcript: Vec::new(),
            in_flight: None,
            next_request_id: 0,
            catalog: Catalog::default(),
            service,
            events_tx,
        }
    }

    /// Install the catalog after the startup fetch resolves
    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn draft_prompt(&self) -> &str {
        &self.draft_prompt
    }

    pub fn params(&self) -> SamplingParameters {
        self.params
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn status(&self) -> RequestStatus {
        if self.in_flight.is_some() {
            RequestStatus::InFlight
        } else {
            RequestStatus::Idle
        }
    }

    /// Read-only snapshot for the presentation layer
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            draft_prompt: self.draft_prompt.clone(),
            selected_model_id: self.selected_model_id.clone(),
            params: self.params,
            transcript: self.transcript.clone(),
            status: self.status(),
        }
    }

    /// Replace the draft prompt; legal in either state
    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.draft_prompt = text.into();
    }

    /// Select a model; legal in either state, affects only future submissions
    pub fn select_model(&mut self, id: impl Into<String>) {
        self.selected_model_id = id.into();
    }

    /// Set one sampling parameter, rejecting out-of-range values
    ///
    /// Legal in either state: the in-flight call already captured its own
    /// parameter snapshot, so a mid-flight edit affects only future submits.
    pub fn set_parameter(&mut self, param: Param, value: f64) -> Result<(), CommandError> {
        let (min, max) = param.range();
        if !value.is_finite() || value < min || value > max {
            return Err(CommandError::OutOfRange { param, min, max });
        }
        match param {
            Param::Temperature => self.params.temperature = value,
            Param::MaxTokens => self.params.max_tokens = value as u32,
            Param::TopP => self.params.top_p = value,
        }
        Ok(())
    }

    /// Overwrite the draft with a template's content, discarding any unsaved
    /// draft. Returns the template name for the confirmation toast.
    pub fn load_template(&mut self, id: &str) -> Result<String, CommandError> {
        let template = self
            .catalog
            .template(id)
            .ok_or_else(|| CommandError::TemplateNotFound(id.to_string()))?;
        self.draft_prompt = template.content.clone();
        Ok(template.name.clone())
    }

    /// Submit the current draft for generation
    ///
    /// Appends the user turn, transitions to InFlight, and spawns the service
    /// call with a snapshot of the prompt, model and parameters captured now;
    /// edits made while the call is outstanding never reach it. Returns the
    /// request id the completion event will carry.
    ///
    /// The emptiness check trims; the appended turn keeps the draft verbatim.
    pub fn submit(&mut self) -> Result<u64, CommandError> {
        if self.in_flight.is_some() {
            return Err(CommandError::RequestInFlight);
        }
        if self.draft_prompt.trim().is_empty() {
            return Err(CommandError::EmptyPrompt);
        }

        let prompt = self.draft_prompt.clone();
        let model_id = self.selected_model_id.clone();
        let params = self.params;

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight = Some(request_id);
        self.transcript.push(Turn::user(prompt.clone()));

        tracing::info!(
            "Dispatching generation request {} (model: {}, prompt: {} bytes)",
            request_id,
            model_id,
            prompt.len()
        );

        let service = Arc::clone(&self.service);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = service.generate(&prompt, &model_id, params).await;
            // The receiver only closes on shutdown; a failed send is not an error
            let _ = events_tx
                .send(AppEvent::GenerationFinished {
                    request_id,
                    timestamp: Utc::now(),
                    duration: started.elapsed(),
                    outcome,
                })
                .await;
        });

        Ok(request_id)
    }

    /// Reconcile a finished generation call
    ///
    /// On success the assistant turn is appended and the session returns to
    /// Idle. On failure the session returns to Idle with the user turn left
    /// dangling and the error is handed back for the toast. Completions for
    /// a request other than the current one are
    /// ignored; that cannot happen today, but it is the guard any future
    /// cancellation support builds on.
    pub fn resolve(
        &mut self,
        request_id: u64,
        outcome: Result<String, GenerationError>,
    ) -> Result<(), GenerationError> {
        if self.in_flight != Some(request_id) {
            tracing::warn!("Ignoring completion for stale request {}", request_id);
            return Ok(());
        }
        self.in_flight = None;

        match outcome {
            Ok(text) => {
                tracing::info!("Request {} resolved ({} bytes)", request_id, text.len());
                self.transcript.push(Turn::assistant(text));
                Ok(())
            }
            Err(error) => {
                tracing::warn!("Request {} failed: {}", request_id, error);
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Fake service that records every call and blocks until the test
    /// releases a response, so in-flight behavior can be exercised.
    struct FakeService {
        calls: Mutex<Vec<(String, String, SamplingParameters)>>,
        responses: tokio::sync::Mutex<VecDeque<tokio::sync::oneshot::Receiver<ServiceOutcome>>>,
    }

    type ServiceOutcome = Result<String, GenerationError>;

    #[async_trait::async_trait]
    impl GenerationService for FakeService {
        async fn generate(
            &self,
            prompt: &str,
            model_id: &str,
            params: SamplingParameters,
        ) -> ServiceOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), model_id.to_string(), params));
            let rx = self
                .responses
                .lock()
                .await
                .pop_front()
                .expect("unexpected generate call");
            rx.await
                .unwrap_or_else(|_| Err(GenerationError::Transport("test channel closed".into())))
        }
    }

    struct Harness {
        store: SessionStore,
        service: Arc<FakeService>,
        events_rx: mpsc::Receiver<AppEvent>,
        releases: VecDeque<tokio::sync::oneshot::Sender<ServiceOutcome>>,
    }

    impl Harness {
        /// Build a store wired to a fake service with `pending` prepared calls
        fn new(pending: usize) -> Self {
            let mut txs = VecDeque::new();
            let mut rxs = VecDeque::new();
            for _ in 0..pending {
                let (tx, rx) = tokio::sync::oneshot::channel();
                txs.push_back(tx);
                rxs.push_back(rx);
            }
            let service = Arc::new(FakeService {
                calls: Mutex::new(Vec::new()),
                responses: tokio::sync::Mutex::new(rxs),
            });
            let (events_tx, events_rx) = mpsc::channel(16);
            let mut store =
                SessionStore::new(service.clone(), events_tx, "gpt-4".to_string());
            store.set_catalog(Catalog::bundled());
            Self {
                store,
                service,
                events_rx,
                releases: txs,
            }
        }

        /// Release the next pending call with the given outcome and apply
        /// the resulting completion event to the store
        async fn finish(&mut self, outcome: ServiceOutcome) -> Result<(), GenerationError> {
            self.releases
                .pop_front()
                .expect("no pending call to release")
                .send(outcome)
                .ok();
            match self.events_rx.recv().await.expect("event channel closed") {
                AppEvent::GenerationFinished {
                    request_id,
                    outcome,
                    ..
                } => self.store.resolve(request_id, outcome),
                other => panic!("unexpected event: {:?}", other),
            }
        }

        fn calls(&self) -> Vec<(String, String, SamplingParameters)> {
            self.service.calls.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn submit_appends_user_turn_then_assistant_turn() {
        let mut h = Harness::new(1);
        h.store.set_prompt("Hello");
        assert_eq!(h.store.snapshot().transcript.len(), 0);

        h.store.submit().unwrap();
        let snap = h.store.snapshot();
        assert_eq!(snap.status, RequestStatus::InFlight);
        assert_eq!(snap.transcript.len(), 1);
        assert_eq!(snap.transcript[0], Turn::user("Hello"));

        h.finish(Ok("Hi there".into())).await.unwrap();
        let snap = h.store.snapshot();
        assert_eq!(snap.status, RequestStatus::Idle);
        assert_eq!(snap.transcript.len(), 2);
        assert_eq!(snap.transcript[1], Turn::assistant("Hi there"));

        let calls = h.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Hello");
        assert_eq!(calls[0].1, "gpt-4");
    }

    #[tokio::test]
    async fn whitespace_only_prompt_is_rejected_without_state_change() {
        let mut h = Harness::new(0);
        h.store.set_prompt("   \n\t  ");
        assert_eq!(h.store.submit(), Err(CommandError::EmptyPrompt));

        let snap = h.store.snapshot();
        assert_eq!(snap.status, RequestStatus::Idle);
        assert!(snap.transcript.is_empty());
        // The draft survives the rejection
        assert_eq!(snap.draft_prompt, "   \n\t  ");
        assert!(h.calls().is_empty());
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_rejected() {
        let mut h = Harness::new(1);
        h.store.set_prompt("first");
        h.store.submit().unwrap();

        h.store.set_prompt("second");
        assert_eq!(h.store.submit(), Err(CommandError::RequestInFlight));
        // The rejection mutated nothing: still one user turn, still in flight
        let snap = h.store.snapshot();
        assert_eq!(snap.transcript.len(), 1);
        assert_eq!(snap.status, RequestStatus::InFlight);

        h.finish(Ok("done".into())).await.unwrap();
        // Exactly one service call was ever issued
        assert_eq!(h.calls().len(), 1);
    }

    #[tokio::test]
    async fn generation_failure_keeps_dangling_user_turn() {
        let mut h = Harness::new(1);
        h.store.set_prompt("Hello");
        h.store.submit().unwrap();

        let err = h
            .finish(Err(GenerationError::Transport("connection refused".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));

        let snap = h.store.snapshot();
        assert_eq!(snap.status, RequestStatus::Idle);
        // Asymmetric transcript preserved: user turn without an assistant reply
        assert_eq!(snap.transcript.len(), 1);
        assert_eq!(snap.transcript[0].role, Role::User);
    }

    #[tokio::test]
    async fn in_flight_call_uses_parameters_captured_at_submit() {
        let mut h = Harness::new(1);
        h.store.set_prompt("Hello");
        h.store.set_parameter(Param::Temperature, 0.3).unwrap();
        h.store.submit().unwrap();

        // Mid-flight edits: allowed, but must not reach the dispatched call
        h.store.set_parameter(Param::Temperature, 1.8).unwrap();
        h.store.set_prompt("edited during flight");
        h.store.select_model("claude-3-opus");

        h.finish(Ok("resp".into())).await.unwrap();

        let calls = h.calls();
        assert_eq!(calls[0].0, "Hello");
        assert_eq!(calls[0].1, "gpt-4");
        assert_eq!(calls[0].2.temperature, 0.3);

        // The edits took effect for future submissions
        let snap = h.store.snapshot();
        assert_eq!(snap.params.temperature, 1.8);
        assert_eq!(snap.draft_prompt, "edited during flight");
        assert_eq!(snap.selected_model_id, "claude-3-opus");
        // And never appeared in the transcript for the in-flight turn
        assert_eq!(snap.transcript[0].content, "Hello");
    }

    #[tokio::test]
    async fn draft_is_not_cleared_after_submit() {
        let mut h = Harness::new(1);
        h.store.set_prompt("Hello");
        h.store.submit().unwrap();
        assert_eq!(h.store.snapshot().draft_prompt, "Hello");
        h.finish(Ok("resp".into())).await.unwrap();
        assert_eq!(h.store.snapshot().draft_prompt, "Hello");
    }

    #[tokio::test]
    async fn submit_appends_untrimmed_draft() {
        let mut h = Harness::new(1);
        h.store.set_prompt("  Hello  ");
        h.store.submit().unwrap();
        assert_eq!(h.store.snapshot().transcript[0].content, "  Hello  ");
        h.finish(Ok("resp".into())).await.unwrap();
        assert_eq!(h.calls()[0].0, "  Hello  ");
    }

    #[test]
    fn parameters_reject_out_of_range_and_keep_prior_value() {
        let (events_tx, _events_rx) = mpsc::channel(1);
        let mut store = SessionStore::new(
            Arc::new(crate::generation::MockGeneration::default()),
            events_tx,
            "gpt-4".to_string(),
        );

        assert_eq!(
            store.set_parameter(Param::Temperature, 2.5),
            Err(CommandError::OutOfRange {
                param: Param::Temperature,
                min: 0.0,
                max: 2.0
            })
        );
        assert!(store.set_parameter(Param::MaxTokens, 5000.0).is_err());
        assert!(store.set_parameter(Param::MaxTokens, 50.0).is_err());
        assert!(store.set_parameter(Param::TopP, -0.1).is_err());
        assert!(store.set_parameter(Param::TopP, f64::NAN).is_err());

        // Rejections left the defaults intact
        let params = store.snapshot().params;
        assert_eq!(params, SamplingParameters::default());

        // Closed ranges: the boundaries themselves are valid
        assert!(store.set_parameter(Param::Temperature, 0.0).is_ok());
        assert!(store.set_parameter(Param::Temperature, 2.0).is_ok());
        assert!(store.set_parameter(Param::MaxTokens, 100.0).is_ok());
        assert!(store.set_parameter(Param::MaxTokens, 4096.0).is_ok());
        assert!(store.set_parameter(Param::TopP, 1.0).is_ok());
        assert_eq!(store.snapshot().params.max_tokens, 4096);
    }

    #[tokio::test]
    async fn load_template_overwrites_draft_in_either_state() {
        let mut h = Harness::new(1);
        h.store.set_prompt("unsaved draft");

        let name = h.store.load_template("2").unwrap();
        assert_eq!(name, "Creative Writing");
        assert_eq!(
            h.store.snapshot().draft_prompt,
            "Write a creative story about:\n\n"
        );

        // Also legal while a request is in flight
        h.store.submit().unwrap();
        h.store.load_template("1").unwrap();
        assert_eq!(
            h.store.snapshot().draft_prompt,
            "Review the following code and provide suggestions for improvement:\n\n"
        );
        h.finish(Ok("resp".into())).await.unwrap();
    }

    #[test]
    fn load_template_unknown_id_fails() {
        let (events_tx, _events_rx) = mpsc::channel(1);
        let mut store = SessionStore::new(
            Arc::new(crate::generation::MockGeneration::default()),
            events_tx,
            "gpt-4".to_string(),
        );
        store.set_catalog(Catalog::bundled());
        store.set_prompt("keep me");

        assert_eq!(
            store.load_template("99"),
            Err(CommandError::TemplateNotFound("99".into()))
        );
        assert_eq!(store.snapshot().draft_prompt, "keep me");
    }

    #[tokio::test]
    async fn stale_completion_is_ignored() {
        let mut h = Harness::new(1);
        h.store.set_prompt("Hello");
        let id = h.store.submit().unwrap();

        // A completion for some other id must not touch the transcript
        h.store.resolve(id + 42, Ok("ghost".into())).unwrap();
        let snap = h.store.snapshot();
        assert_eq!(snap.transcript.len(), 1);
        assert_eq!(snap.status, RequestStatus::InFlight);

        h.finish(Ok("real".into())).await.unwrap();
        assert_eq!(h.store.snapshot().transcript.len(), 2);
    }

    #[tokio::test]
    async fn consecutive_submissions_get_distinct_request_ids() {
        let mut h = Harness::new(2);
        h.store.set_prompt("one");
        let first = h.store.submit().unwrap();
        h.finish(Ok("a".into())).await.unwrap();

        h.store.set_prompt("two");
        let second = h.store.submit().unwrap();
        h.finish(Ok("b".into())).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(h.store.snapshot().transcript.len(), 4);
    }
}
