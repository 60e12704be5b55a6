//! Async note store with a serialized writer and live snapshots.
//!
//! NoteStore owns the durable note table. Mutations are dispatched over
//! an unbounded channel to a single writer task and applied in dispatch
//! order; every committed change publishes a fresh immutable snapshot
//! on a watch channel and a confirmation event on the bus.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use voxpad_core::error::VoxpadError;
use voxpad_core::events::{DomainEvent, EventBus};
use voxpad_core::types::{Note, NoteDraft, NoteId, TimestampMs};

use crate::repository::NoteRepository;

/// A write queued for the writer task.
enum StoreOp {
    Insert(NoteDraft),
    Update(Note),
    Delete(NoteId),
    Close,
}

/// Handle to the note table.
///
/// Cloning is cheap; all clones share the writer task and the snapshot
/// channel.
#[derive(Clone)]
pub struct NoteStore {
    ops: mpsc::UnboundedSender<StoreOp>,
    notes: watch::Receiver<Arc<[Note]>>,
    writer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl NoteStore {
    /// Spawn the writer task over a repository.
    ///
    /// The initial snapshot is read before the task starts, so
    /// subscribers see pre-existing rows ahead of any mutation.
    pub fn spawn(repo: NoteRepository, events: EventBus) -> Result<Self, VoxpadError> {
        let initial: Arc<[Note]> = Arc::from(repo.list()?);
        let (notes_tx, notes_rx) = watch::channel(initial);
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(writer_loop(ops_rx, repo, notes_tx, events));

        Ok(Self {
            ops: ops_tx,
            notes: notes_rx,
            writer: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Subscribe to the live note sequence.
    ///
    /// The receiver always holds the latest committed snapshot, ordered
    /// by id ascending; every committed mutation publishes a new value.
    pub fn list(&self) -> watch::Receiver<Arc<[Note]>> {
        self.notes.clone()
    }

    /// The latest committed snapshot.
    pub fn snapshot(&self) -> Arc<[Note]> {
        self.notes.borrow().clone()
    }

    /// Queue a draft for insertion.
    ///
    /// The writer assigns the id and stamps a missing timestamp at
    /// write time.
    pub fn insert(&self, draft: NoteDraft) {
        self.dispatch(StoreOp::Insert(draft));
    }

    /// Queue a full-row replacement of the note matching `note.id`.
    ///
    /// An unknown id is absorbed as a no-op.
    pub fn update(&self, note: Note) {
        self.dispatch(StoreOp::Update(note));
    }

    /// Queue removal of the note matching `note.id`.
    ///
    /// An unknown id is absorbed as a no-op.
    pub fn delete(&self, note: &Note) {
        self.dispatch(StoreOp::Delete(note.id));
    }

    fn dispatch(&self, op: StoreOp) {
        if self.ops.send(op).is_err() {
            debug!("Store write dropped, writer already closed");
        }
    }

    /// Shut the writer down after it drains every queued write.
    pub async fn close(&self) {
        let _ = self.ops.send(StoreOp::Close);
        let handle = self.writer.lock().ok().and_then(|mut writer| writer.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn writer_loop(
    mut ops: mpsc::UnboundedReceiver<StoreOp>,
    repo: NoteRepository,
    notes: watch::Sender<Arc<[Note]>>,
    events: EventBus,
) {
    while let Some(op) = ops.recv().await {
        match op {
            StoreOp::Insert(draft) => match repo.insert(draft) {
                Ok(note) => {
                    publish(&repo, &notes);
                    events.emit(DomainEvent::NoteAdded {
                        id: note.id,
                        timestamp: TimestampMs::now(),
                    });
                }
                Err(e) => error!("Note insert failed: {}", e),
            },
            StoreOp::Update(note) => match repo.update(&note) {
                Ok(true) => {
                    publish(&repo, &notes);
                    events.emit(DomainEvent::NoteUpdated {
                        id: note.id,
                        timestamp: TimestampMs::now(),
                    });
                }
                Ok(false) => debug!(id = %note.id, "Update for unknown note id ignored"),
                Err(e) => error!("Note update failed: {}", e),
            },
            StoreOp::Delete(id) => match repo.delete(id) {
                Ok(true) => {
                    publish(&repo, &notes);
                    events.emit(DomainEvent::NoteDeleted {
                        id,
                        timestamp: TimestampMs::now(),
                    });
                }
                Ok(false) => debug!(id = %id, "Delete for unknown note id ignored"),
                Err(e) => error!("Note delete failed: {}", e),
            },
            StoreOp::Close => break,
        }
    }
    debug!("Note store writer stopped");
}

/// Re-read the table and publish a fresh snapshot to subscribers.
fn publish(repo: &NoteRepository, notes: &watch::Sender<Arc<[Note]>>) {
    match repo.list() {
        Ok(list) => {
            notes.send_replace(Arc::from(list));
        }
        Err(e) => error!("Failed to refresh note snapshot: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::db::Database;

    const WAIT: Duration = Duration::from_secs(5);

    fn make_store() -> (NoteStore, EventBus) {
        let db = Arc::new(Database::in_memory().unwrap());
        let repo = NoteRepository::new(db);
        let events = EventBus::default();
        let store = NoteStore::spawn(repo, events.clone()).unwrap();
        (store, events)
    }

    async fn wait_for_len(rx: &mut watch::Receiver<Arc<[Note]>>, len: usize) -> Arc<[Note]> {
        let snapshot = timeout(WAIT, rx.wait_for(|notes| notes.len() == len))
            .await
            .expect("timed out waiting for a snapshot")
            .expect("snapshot channel closed");
        Arc::clone(&snapshot)
    }

    #[tokio::test]
    async fn test_insert_appears_in_live_sequence() {
        let (store, _events) = make_store();
        let mut rx = store.list();

        store.insert(NoteDraft::new(
            "Groceries".to_string(),
            "milk, eggs".to_string(),
        ));

        let snapshot = wait_for_len(&mut rx, 1).await;
        assert_eq!(snapshot[0].id, NoteId(1));
        assert_eq!(snapshot[0].title, "Groceries");
        assert_eq!(snapshot[0].content, "milk, eggs");
        assert!(snapshot[0].timestamp.0 > 0);
    }

    #[tokio::test]
    async fn test_inserts_assign_distinct_ascending_ids() {
        let (store, _events) = make_store();
        let mut rx = store.list();

        for i in 0..3 {
            store.insert(NoteDraft::new(format!("note {}", i), String::new()));
        }

        let snapshot = wait_for_len(&mut rx, 3).await;
        assert!(snapshot.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[tokio::test]
    async fn test_concurrent_inserts_get_distinct_ids() {
        let (store, _events) = make_store();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert(NoteDraft::new(format!("note {}", i), String::new()));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut rx = store.list();
        let snapshot = wait_for_len(&mut rx, 8).await;
        let ids: HashSet<i64> = snapshot.iter().map(|note| note.id.0).collect();
        assert_eq!(ids.len(), 8);
    }

    #[tokio::test]
    async fn test_update_replaces_matching_row_only() {
        let (store, _events) = make_store();
        let mut rx = store.list();

        store.insert(NoteDraft::new("Groceries".into(), "milk, eggs".into()));
        store.insert(NoteDraft::new("Chores".into(), "laundry".into()));
        let snapshot = wait_for_len(&mut rx, 2).await;
        let target = snapshot[0].clone();
        let other = snapshot[1].clone();

        store.update(Note {
            content: "milk, eggs, bread".to_string(),
            ..target.clone()
        });

        let updated = timeout(
            WAIT,
            rx.wait_for(|notes| notes[0].content == "milk, eggs, bread"),
        )
        .await
        .expect("timed out waiting for the update")
        .expect("snapshot channel closed");
        assert_eq!(updated[0].id, target.id);
        assert_eq!(updated[1], other);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_silent_noop() {
        let (store, _events) = make_store();
        let mut rx = store.list();

        store.update(Note {
            id: NoteId(99),
            title: "ghost".to_string(),
            content: String::new(),
            timestamp: TimestampMs(0),
        });
        // A later insert proves the no-op was processed first.
        store.insert(NoteDraft::new("after".into(), String::new()));

        let snapshot = wait_for_len(&mut rx, 1).await;
        assert_eq!(snapshot[0].title, "after");
        assert!(snapshot.iter().all(|note| note.id != NoteId(99)));
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one_row() {
        let (store, _events) = make_store();
        let mut rx = store.list();

        store.insert(NoteDraft::new("keep".into(), String::new()));
        store.insert(NoteDraft::new("drop".into(), String::new()));
        let snapshot = wait_for_len(&mut rx, 2).await;
        let doomed = snapshot[1].clone();

        store.delete(&doomed);

        let snapshot = wait_for_len(&mut rx, 1).await;
        assert!(snapshot.iter().all(|note| note.id != doomed.id));
        assert_eq!(snapshot[0].title, "keep");
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_silent_noop() {
        let (store, _events) = make_store();
        let mut rx = store.list();

        let ghost = Note {
            id: NoteId(42),
            title: String::new(),
            content: String::new(),
            timestamp: TimestampMs(0),
        };
        store.delete(&ghost);
        store.insert(NoteDraft::new("after".into(), String::new()));

        let snapshot = wait_for_len(&mut rx, 1).await;
        assert_eq!(snapshot[0].title, "after");
    }

    #[tokio::test]
    async fn test_insert_update_delete_scenario() {
        let (store, _events) = make_store();
        let mut rx = store.list();

        store.insert(NoteDraft::new(
            "Groceries".to_string(),
            "milk, eggs".to_string(),
        ));
        let snapshot = wait_for_len(&mut rx, 1).await;
        assert_eq!(snapshot[0].id, NoteId(1));

        store.update(Note {
            content: "milk, eggs, bread".to_string(),
            timestamp: TimestampMs(snapshot[0].timestamp.0 + 500),
            ..snapshot[0].clone()
        });
        let updated = timeout(
            WAIT,
            rx.wait_for(|notes| notes[0].content == "milk, eggs, bread"),
        )
        .await
        .expect("timed out waiting for the update")
        .expect("snapshot channel closed");
        assert_eq!(updated[0].timestamp, TimestampMs(snapshot[0].timestamp.0 + 500));
        let current = updated[0].clone();
        drop(updated);

        store.delete(&current);
        let snapshot = wait_for_len(&mut rx, 0).await;
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_events_emitted_in_commit_order() {
        let (store, events) = make_store();
        let mut events_rx = events.subscribe();
        let mut rx = store.list();

        store.insert(NoteDraft::new("Groceries".into(), "milk, eggs".into()));
        let snapshot = wait_for_len(&mut rx, 1).await;
        store.update(Note {
            content: "milk".to_string(),
            ..snapshot[0].clone()
        });
        store.delete(&snapshot[0]);
        wait_for_len(&mut rx, 0).await;

        let first = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
        match first {
            DomainEvent::NoteAdded { id, .. } => assert_eq!(id, NoteId(1)),
            other => panic!("expected NoteAdded, got {:?}", other),
        }
        let second = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
        match second {
            DomainEvent::NoteUpdated { id, .. } => assert_eq!(id, NoteId(1)),
            other => panic!("expected NoteUpdated, got {:?}", other),
        }
        let third = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
        match third {
            DomainEvent::NoteDeleted { id, .. } => assert_eq!(id, NoteId(1)),
            other => panic!("expected NoteDeleted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_noop_writes_emit_no_events() {
        let (store, events) = make_store();
        let mut events_rx = events.subscribe();
        let mut rx = store.list();

        store.update(Note {
            id: NoteId(1),
            title: String::new(),
            content: String::new(),
            timestamp: TimestampMs(0),
        });
        store.insert(NoteDraft::new("real".into(), String::new()));
        wait_for_len(&mut rx, 1).await;

        // The only event is the insert confirmation.
        let event = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
        assert!(matches!(event, DomainEvent::NoteAdded { .. }));
    }

    #[tokio::test]
    async fn test_added_event_carries_commit_time() {
        let (store, events) = make_store();
        let mut events_rx = events.subscribe();
        let mut rx = store.list();

        let before = TimestampMs::now();
        store.insert(NoteDraft {
            title: "Backdated".to_string(),
            content: String::new(),
            timestamp: Some(TimestampMs(1000)),
        });
        let snapshot = wait_for_len(&mut rx, 1).await;
        assert_eq!(snapshot[0].timestamp, TimestampMs(1000));

        let added = timeout(WAIT, events_rx.recv()).await.unwrap().unwrap();
        match added {
            DomainEvent::NoteAdded { id, timestamp } => {
                assert_eq!(id, snapshot[0].id);
                assert!(timestamp >= before);
            }
            other => panic!("expected NoteAdded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_snapshot_includes_preexisting_rows() {
        let db = Arc::new(Database::in_memory().unwrap());
        let repo = NoteRepository::new(db);
        repo.insert(NoteDraft::new("existing".into(), "row".into()))
            .unwrap();

        let store = NoteStore::spawn(repo, EventBus::default()).unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "existing");
    }

    #[tokio::test]
    async fn test_close_drains_queued_writes() {
        let (store, _events) = make_store();

        for i in 0..5 {
            store.insert(NoteDraft::new(format!("note {}", i), String::new()));
        }
        store.close().await;

        assert_eq!(store.snapshot().len(), 5);
    }

    #[tokio::test]
    async fn test_writes_after_close_are_dropped() {
        let (store, _events) = make_store();
        store.close().await;

        store.insert(NoteDraft::new("late".into(), String::new()));

        assert!(store.snapshot().is_empty());
    }
}
