//! Voxpad storage crate - SQLite persistence and the live note store.
//!
//! Provides a WAL-mode SQLite database with migrations, a synchronous
//! note repository, and the NoteStore facade that serializes writes
//! through a single task and publishes immutable snapshots.

pub mod db;
pub mod migrations;
pub mod repository;
pub mod store;

pub use db::Database;
pub use repository::NoteRepository;
pub use store::NoteStore;
