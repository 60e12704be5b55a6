//! Speech-recognition abstraction.
//!
//! Provides the trait a listening attempt is issued through, the request
//! and result types that cross it, recognizer error codes, and a scripted
//! implementation for driving sessions in tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use voxpad_core::config::DictationConfig;
use voxpad_core::types::LanguageModel;

// =============================================================================
// Request and result types
// =============================================================================

/// Parameters for a single listening attempt.
///
/// A fresh request is built for every attempt from the session's
/// dictation configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    /// BCP-47 locale tag, e.g. "en-US".
    pub locale: String,
    /// Which language model the recognizer should favor.
    pub language_model: LanguageModel,
}

impl From<&DictationConfig> for RecognitionRequest {
    fn from(config: &DictationConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            language_model: config.language_model.clone(),
        }
    }
}

/// Finalized output of one listening attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognitionResult {
    /// Transcript candidates, ranked best-first.
    pub candidates: Vec<String>,
}

impl RecognitionResult {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    /// The top-ranked transcript, if any.
    pub fn best(&self) -> Option<&str> {
        self.candidates.first().map(String::as_str)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error codes a recognizer can resolve an attempt with.
///
/// These are attempt outcomes, not crate failures: while listening, the
/// session recovers from every one of them by starting the next attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RecognizerError {
    /// Speech was captured but produced no usable match.
    #[error("No recognition match")]
    NoMatch,

    /// No speech arrived before the recognizer's input deadline.
    #[error("Speech input timed out")]
    SpeechTimeout,

    /// Audio capture failed.
    #[error("Audio error: {0}")]
    Audio(String),

    /// Transport failure between the recognizer and its backing service.
    #[error("Network error: {0}")]
    Network(String),

    /// The recognizer is already serving another request.
    #[error("Recognizer busy")]
    Busy,

    /// Microphone permission is missing.
    #[error("Microphone permission denied")]
    PermissionDenied,
}

// =============================================================================
// Trait
// =============================================================================

/// A speech-recognition capability.
///
/// One call is one listening attempt: capture audio, run recognition,
/// and resolve with ranked transcript candidates or an error code.
/// Partial results are not modeled; only the finalized path and the
/// error path exist.
pub trait SpeechRecognizer: Send + Sync {
    /// Run a single listening attempt.
    fn recognize(
        &self,
        request: RecognitionRequest,
    ) -> impl Future<Output = Result<RecognitionResult, RecognizerError>> + Send;
}

impl<R: SpeechRecognizer> SpeechRecognizer for Arc<R> {
    fn recognize(
        &self,
        request: RecognitionRequest,
    ) -> impl Future<Output = Result<RecognitionResult, RecognizerError>> + Send {
        (**self).recognize(request)
    }
}

// =============================================================================
// Scripted implementation
// =============================================================================

/// Scripted recognizer for tests.
///
/// Resolves attempts from a queue of outcomes and records every request
/// it receives. Once the script is exhausted, attempts never resolve,
/// which models a recognizer waiting for speech that never comes.
#[derive(Default)]
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Result<RecognitionResult, RecognizerError>>>,
    requests: Mutex<Vec<RecognitionRequest>>,
    attempts: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an attempt resolving to a single transcript candidate.
    pub fn push_text(&self, text: &str) {
        self.push(Ok(RecognitionResult::new(vec![text.to_string()])));
    }

    /// Queue an attempt resolving with no candidates at all.
    pub fn push_empty(&self) {
        self.push(Ok(RecognitionResult::default()));
    }

    /// Queue an attempt resolving to an error code.
    pub fn push_error(&self, error: RecognizerError) {
        self.push(Err(error));
    }

    fn push(&self, outcome: Result<RecognitionResult, RecognizerError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    /// Number of attempts issued so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<RecognitionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ScriptedRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRecognizer")
            .field("attempts", &self.attempts())
            .finish()
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    async fn recognize(
        &self,
        request: RecognitionRequest,
    ) -> Result<RecognitionResult, RecognizerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());
        match next {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
