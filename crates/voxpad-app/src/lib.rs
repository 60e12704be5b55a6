//! Voxpad application crate - the presentation-boundary facade.
//!
//! Ties the Voxpad crates together behind a single handle:
//! 1. Load configuration from TOML
//! 2. Open storage (SQLite) and spawn the note store writer
//! 3. Spawn the dictation session over an injected recognizer
//! 4. Share one domain-event bus across both
//!
//! A host embeds `Voxpad` and renders from the live note sequence, the
//! listening and transcript observables, and the event feed.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxpad_core::config::VoxpadConfig;
use voxpad_core::error::VoxpadError;
use voxpad_core::events::{DomainEvent, EventBus};
use voxpad_core::types::{Note, NoteDraft};
use voxpad_dictation::{DictationSession, SpeechRecognizer};
use voxpad_store::{Database, NoteRepository, NoteStore};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; `fallback_level` (typically the configured
/// `general.log_level`) applies when it is unset. Safe to call more than
/// once; later calls are ignored.
pub fn init_tracing(fallback_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(fallback_level.to_string())),
        )
        .try_init();
}

/// Resolve the config file path (VOXPAD_CONFIG env, or ~/.voxpad/config.toml).
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("VOXPAD_CONFIG") {
        return PathBuf::from(p);
    }
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".voxpad").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".voxpad").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// Expand a leading `~` in the configured data directory.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// The assembled Voxpad application.
///
/// Owns the note store and the dictation session, wired so that
/// auto-commit dictation inserts straight into the store. All reads go
/// through observables; all writes are fire-and-forget dispatches.
pub struct Voxpad {
    config: VoxpadConfig,
    events: EventBus,
    store: NoteStore,
    session: DictationSession,
}

impl std::fmt::Debug for Voxpad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voxpad")
            .field("notes", &self.snapshot().len())
            .field("session", &self.session)
            .finish()
    }
}

impl Voxpad {
    /// Open the application against the configured on-disk database.
    ///
    /// The database lives at `<data_dir>/voxpad.db`; missing directories
    /// are created. Must be called from within a Tokio runtime.
    pub fn open<R>(config: VoxpadConfig, recognizer: R) -> Result<Self, VoxpadError>
    where
        R: SpeechRecognizer + 'static,
    {
        let data_dir = resolve_data_dir(&config.general.data_dir);
        let db_path = data_dir.join("voxpad.db");
        let db = Database::new(&db_path)?;
        Self::assemble(db, config, recognizer)
    }

    /// Open the application against an in-memory database.
    pub fn in_memory<R>(config: VoxpadConfig, recognizer: R) -> Result<Self, VoxpadError>
    where
        R: SpeechRecognizer + 'static,
    {
        let db = Database::in_memory()?;
        Self::assemble(db, config, recognizer)
    }

    fn assemble<R>(db: Database, config: VoxpadConfig, recognizer: R) -> Result<Self, VoxpadError>
    where
        R: SpeechRecognizer + 'static,
    {
        let events = EventBus::default();
        let repo = NoteRepository::new(Arc::new(db));
        let store = NoteStore::spawn(repo, events.clone())?;

        let sink_store = store.clone();
        let session = DictationSession::new(
            config.dictation.clone(),
            recognizer,
            move |draft: NoteDraft| sink_store.insert(draft),
            events.clone(),
        );

        info!(mode = ?config.dictation.mode, "Voxpad assembled");
        Ok(Self {
            config,
            events,
            store,
            session,
        })
    }

    pub fn config(&self) -> &VoxpadConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Notes
    // -------------------------------------------------------------------------

    /// The live note sequence, ordered by id ascending.
    pub fn notes(&self) -> watch::Receiver<Arc<[Note]>> {
        self.store.list()
    }

    /// The current note snapshot.
    pub fn snapshot(&self) -> Arc<[Note]> {
        self.store.snapshot()
    }

    /// Persist a new note.
    pub fn insert(&self, draft: NoteDraft) {
        self.store.insert(draft);
    }

    /// Replace every field of the matching note except its id.
    pub fn update(&self, note: Note) {
        self.store.update(note);
    }

    /// Remove the matching note.
    pub fn delete(&self, note: &Note) {
        self.store.delete(note);
    }

    // -------------------------------------------------------------------------
    // Dictation
    // -------------------------------------------------------------------------

    pub fn start_dictation(&self) {
        self.session.start();
    }

    pub fn stop_dictation(&self) {
        self.session.stop();
    }

    pub fn toggle_dictation(&self) {
        self.session.toggle();
    }

    pub fn is_listening(&self) -> bool {
        self.session.is_listening()
    }

    pub fn watch_listening(&self) -> watch::Receiver<bool> {
        self.session.watch_listening()
    }

    pub fn transcript(&self) -> String {
        self.session.transcript()
    }

    pub fn watch_transcript(&self) -> watch::Receiver<String> {
        self.session.watch_transcript()
    }

    /// Take the staged preview transcript, clearing it.
    pub fn take_transcript(&self) -> String {
        self.session.take_transcript()
    }

    // -------------------------------------------------------------------------
    // Events and shutdown
    // -------------------------------------------------------------------------

    /// Subscribe to domain events emitted from this point on.
    pub fn subscribe_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Shut down in dependency order.
    ///
    /// The session closes before the store so drafts already handed to the
    /// sink still drain through the writer.
    pub async fn close(&self) {
        self.session.close().await;
        self.store.close().await;
        info!("Voxpad closed");
    }
}
