//! External collaborators.
//!
//! # Responsibilities
//! - Define the interfaces handlers use to persist, store and notify
//! - Provide in-memory implementations for development and tests
//!
//! # Design Decisions
//! - Collaborators only ever receive sanitized scalars (`Scalar`), never raw input
//! - Traits are object-safe so `AppState` can hold `Arc<dyn ...>`
//! - Concrete backends (hosted database, bucket storage, mail) live outside this crate

pub mod notify;
pub mod objects;
pub mod records;

use thiserror::Error;

pub use notify::{LogNotifier, Notification, Notifier};
pub use objects::{MemoryObjectStore, ObjectStore};
pub use records::{MemoryRecordStore, Record, RecordStore, Scalar};

/// Failure reported by a collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend rejected the operation: {0}")]
    Rejected(String),
}
