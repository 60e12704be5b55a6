//! Voxpad dictation crate - speech-to-note sessions over an injected recognizer.
//!
//! A `DictationSession` drives a `SpeechRecognizer` through listen/stop cycles
//! under a supervising controller task. Finalized utterances either become
//! notes through a `NoteSink` (auto-commit) or are staged in an observable
//! transcript for manual submission (preview).

pub mod recognizer;
pub mod session;

pub use recognizer::{
    RecognitionRequest, RecognitionResult, RecognizerError, ScriptedRecognizer, SpeechRecognizer,
};
pub use session::{DictationSession, NoteSink};
