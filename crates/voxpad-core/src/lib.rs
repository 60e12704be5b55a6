pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::VoxpadConfig;
pub use error::{Result, VoxpadError};
pub use events::{DomainEvent, EventBus};
pub use types::*;
