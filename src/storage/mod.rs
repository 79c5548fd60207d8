//! Persistent run state
//!
//! - [`vessel_state`]: per-vessel last status, backed by sled, plus the
//!   deduplicating tracker built on top of it
//! - [`lockfile`]: single-run guard over the data directory

pub mod lockfile;
pub mod vessel_state;

pub use lockfile::ProcessLock;
pub use vessel_state::{
    InMemoryVesselStateStore, SledVesselStateStore, VesselStateRecord, VesselStateStore,
    VesselStateTracker,
};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}
