//! Dictation session driving a speech recognizer through listen/stop cycles.
//!
//! `DictationSession` owns the observable listening flag and transcript and a
//! supervising controller task that issues recognition attempts, routing each
//! finalized utterance to a `NoteSink` or staging it for review.

use std::sync::{Arc, Mutex};

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use voxpad_core::config::DictationConfig;
use voxpad_core::events::{DomainEvent, EventBus};
use voxpad_core::types::{DictationMode, NoteDraft, TimestampMs};

use crate::recognizer::{RecognitionRequest, RecognitionResult, RecognizerError, SpeechRecognizer};

/// Destination for notes produced by auto-commit dictation.
///
/// Implemented for any `Fn(NoteDraft)` closure, so a store handle plugs in
/// as `move |draft: NoteDraft| store.insert(draft)`.
pub trait NoteSink: Send + Sync {
    fn accept(&self, draft: NoteDraft);
}

impl<F> NoteSink for F
where
    F: Fn(NoteDraft) + Send + Sync,
{
    fn accept(&self, draft: NoteDraft) {
        self(draft)
    }
}

/// Atomically takes the current transcript value, leaving it empty.
///
/// Watchers are only notified when there was text to take.
fn clear_transcript(transcript: &watch::Sender<String>) -> String {
    let mut taken = String::new();
    transcript.send_if_modified(|current| {
        if current.is_empty() {
            return false;
        }
        taken = std::mem::take(current);
        true
    });
    taken
}

/// A dictation session over an injected speech recognizer.
///
/// The session is idle on construction. `start` flips the observable
/// listening flag and the controller task begins issuing recognition
/// attempts; `stop` flips it back and abandons whatever attempt is in
/// flight. In auto-commit mode every finalized utterance becomes a note
/// through the sink and listening resumes on its own. In preview mode a
/// finalized utterance is staged in the observable transcript and the
/// session waits for the caller to consume it and restart.
///
/// The session owns its controller task; call `close` to retire it.
pub struct DictationSession {
    config: DictationConfig,
    events: EventBus,
    listening: watch::Sender<bool>,
    transcript: Arc<watch::Sender<String>>,
    cycle: Mutex<Option<Uuid>>,
    closed: Arc<Notify>,
    controller: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for DictationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictationSession")
            .field("listening", &self.is_listening())
            .field("mode", &self.config.mode)
            .finish()
    }
}

impl DictationSession {
    /// Create a session and spawn its supervising controller task.
    ///
    /// Must be called from within a Tokio runtime. The recognizer and the
    /// sink are injected; the session itself holds no ambient context.
    pub fn new<R, S>(config: DictationConfig, recognizer: R, sink: S, events: EventBus) -> Self
    where
        R: SpeechRecognizer + 'static,
        S: NoteSink + 'static,
    {
        let (listening, listening_rx) = watch::channel(false);
        let (transcript_tx, _) = watch::channel(String::new());
        let transcript = Arc::new(transcript_tx);
        let closed = Arc::new(Notify::new());

        let controller = Controller {
            recognizer,
            sink: Box::new(sink),
            config: config.clone(),
            listening: listening_rx,
            transcript: Arc::clone(&transcript),
            closed: Arc::clone(&closed),
        };
        let handle = tokio::spawn(controller.run());

        Self {
            config,
            events,
            listening,
            transcript,
            cycle: Mutex::new(None),
            closed,
            controller: Mutex::new(Some(handle)),
        }
    }

    /// Begin a listening cycle. No-op if already listening.
    pub fn start(&self) {
        let started = self.listening.send_if_modified(|listening| {
            if *listening {
                return false;
            }
            *listening = true;
            true
        });
        if !started {
            debug!("Dictation already listening, start ignored");
            return;
        }

        let cycle_id = Uuid::new_v4();
        if let Ok(mut cycle) = self.cycle.lock() {
            *cycle = Some(cycle_id);
        }
        info!(%cycle_id, mode = ?self.config.mode, "Dictation started");
        self.events.emit(DomainEvent::DictationStarted {
            cycle_id,
            mode: self.config.mode.clone(),
            timestamp: TimestampMs::now(),
        });
    }

    /// End the current listening cycle. No-op if already idle.
    ///
    /// Any in-flight recognition attempt is abandoned; its result, if one
    /// arrives at all, is discarded.
    pub fn stop(&self) {
        let stopped = self.listening.send_if_modified(|listening| {
            if !*listening {
                return false;
            }
            *listening = false;
            true
        });
        if !stopped {
            debug!("Dictation already idle, stop ignored");
            return;
        }

        let cycle_id = self
            .cycle
            .lock()
            .ok()
            .and_then(|mut cycle| cycle.take())
            .unwrap_or_default();
        info!(%cycle_id, "Dictation stopped");
        self.events.emit(DomainEvent::DictationStopped {
            cycle_id,
            timestamp: TimestampMs::now(),
        });
    }

    /// Stop if listening, start otherwise.
    pub fn toggle(&self) {
        if self.is_listening() {
            self.stop();
        } else {
            self.start();
        }
    }

    pub fn is_listening(&self) -> bool {
        *self.listening.borrow()
    }

    /// Watch the listening flag.
    pub fn watch_listening(&self) -> watch::Receiver<bool> {
        self.listening.subscribe()
    }

    /// Current transcript value. Empty unless a preview-mode utterance is
    /// staged and not yet consumed.
    pub fn transcript(&self) -> String {
        self.transcript.borrow().clone()
    }

    /// Watch the transcript value.
    pub fn watch_transcript(&self) -> watch::Receiver<String> {
        self.transcript.subscribe()
    }

    /// Take the staged transcript, clearing it. Returns an empty string
    /// when nothing is staged.
    pub fn take_transcript(&self) -> String {
        clear_transcript(&self.transcript)
    }

    /// Stop listening and retire the controller task.
    ///
    /// Completes even while a recognition attempt is hung, and is safe to
    /// call more than once.
    pub async fn close(&self) {
        self.stop();
        self.closed.notify_one();
        let controller = self
            .controller
            .lock()
            .ok()
            .and_then(|mut controller| controller.take());
        if let Some(handle) = controller {
            let _ = handle.await;
        }
    }
}

/// The supervising task behind a session.
///
/// Sole driver of the recognizer: it issues one attempt at a time while the
/// listening flag is set, races each attempt against stop and close, and
/// applies finalized outcomes according to the configured mode.
struct Controller<R> {
    recognizer: R,
    sink: Box<dyn NoteSink>,
    config: DictationConfig,
    listening: watch::Receiver<bool>,
    transcript: Arc<watch::Sender<String>>,
    closed: Arc<Notify>,
}

impl<R: SpeechRecognizer> Controller<R> {
    async fn run(mut self) {
        loop {
            let listening = *self.listening.borrow_and_update();
            if !listening {
                if !self.wait_for_change().await {
                    break;
                }
                continue;
            }

            let request = RecognitionRequest::from(&self.config);
            tokio::select! {
                biased;
                _ = self.closed.notified() => break,
                changed = self.listening.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                outcome = self.recognizer.recognize(request) => {
                    // The caller may have stopped between the attempt
                    // resolving and this task acting on it.
                    if !*self.listening.borrow() {
                        continue;
                    }
                    if !self.handle_outcome(outcome) && !self.wait_for_change().await {
                        break;
                    }
                }
            }
        }
        debug!("Dictation controller retired");
    }

    /// Parks until the listening flag changes or the session closes.
    /// Returns false when the controller should exit.
    async fn wait_for_change(&mut self) -> bool {
        tokio::select! {
            _ = self.closed.notified() => false,
            changed = self.listening.changed() => changed.is_ok(),
        }
    }

    /// Applies one attempt's outcome. Returns true when the controller
    /// should begin the next attempt on its own.
    fn handle_outcome(&self, outcome: Result<RecognitionResult, RecognizerError>) -> bool {
        let result = match outcome {
            Ok(result) => result,
            Err(error) => {
                debug!(error = %error, "Recognition attempt failed, restarting");
                return true;
            }
        };

        match result.best() {
            Some(text) if !text.trim().is_empty() => match self.config.mode {
                DictationMode::AutoCommit => {
                    info!(text_len = text.len(), "Utterance committed as note");
                    self.sink.accept(NoteDraft::new(
                        self.config.note_title.clone(),
                        text.to_string(),
                    ));
                    clear_transcript(&self.transcript);
                    true
                }
                DictationMode::Preview => {
                    info!(text_len = text.len(), "Utterance staged for review");
                    self.transcript.send_replace(text.to_string());
                    false
                }
            },
            _ => {
                debug!("Recognition attempt produced no text, restarting");
                true
            }
        }
    }
}
