//! Vessel state persistence and alert deduplication
//!
//! Keeps, per vessel, the last status emitted by an evaluation. The state is
//! never consulted by the analyzer; it only decides whether a new anomaly is
//! worth a notification.
//!
//! Backends:
//! - `SledVesselStateStore`: durable, one sled tree keyed by vessel id
//! - `InMemoryVesselStateStore`: dry runs and tests; discarded at exit

use super::StorageError;
use crate::types::VesselStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Persisted state of one vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VesselStateRecord {
    pub status: VesselStatus,
    /// When the vessel first entered `status`
    pub since: DateTime<Utc>,
    /// Last evaluation that touched this record
    pub updated_at: DateTime<Utc>,
}

/// Trait for pluggable vessel state backends.
pub trait VesselStateStore: Send + Sync {
    fn load(&self, vessel: &str) -> Result<Option<VesselStateRecord>, StorageError>;

    fn save(&self, vessel: &str, record: &VesselStateRecord) -> Result<(), StorageError>;

    /// All known vessels, sorted by id.
    fn list_all(&self) -> Result<Vec<(String, VesselStateRecord)>, StorageError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// Sled backend
// ============================================================================

/// Durable vessel state in a named sled tree.
#[derive(Clone)]
pub struct SledVesselStateStore {
    _db: sled::Db,
    tree: sled::Tree,
}

impl SledVesselStateStore {
    const TREE_NAME: &'static str = "vessel_state";

    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        let tree = db.open_tree(Self::TREE_NAME)?;
        info!(path = %path.display(), vessels = tree.len(), "Vessel state store opened");
        Ok(Self { _db: db, tree })
    }
}

impl VesselStateStore for SledVesselStateStore {
    fn load(&self, vessel: &str) -> Result<Option<VesselStateRecord>, StorageError> {
        match self.tree.get(vessel.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, vessel: &str, record: &VesselStateRecord) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(record)?;
        self.tree.insert(vessel.as_bytes(), bytes)?;
        // Runs are short-lived; flush so the next invocation sees this write.
        self.tree.flush()?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<(String, VesselStateRecord)>, StorageError> {
        let mut records = Vec::new();
        for item in self.tree.iter() {
            let (key, value) = item?;
            let vessel = String::from_utf8_lossy(&key).into_owned();
            records.push((vessel, serde_json::from_slice(&value)?));
        }
        Ok(records)
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-memory vessel state. Not durable.
#[derive(Default)]
pub struct InMemoryVesselStateStore {
    records: RwLock<HashMap<String, VesselStateRecord>>,
}

impl InMemoryVesselStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VesselStateStore for InMemoryVesselStateStore {
    fn load(&self, vessel: &str) -> Result<Option<VesselStateRecord>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(records.get(vessel).copied())
    }

    fn save(&self, vessel: &str, record: &VesselStateRecord) -> Result<(), StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        records.insert(vessel.to_string(), *record);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<(String, VesselStateRecord)>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        let mut all: Vec<_> = records.iter().map(|(k, v)| (k.clone(), *v)).collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(all)
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Deduplicates notifications against the stored vessel status.
///
/// A notification is due only when the run's status differs from the stored
/// one and is not `Ok`. The stored status is always overwritten, so a clean
/// evaluation re-arms notification for the next anomaly.
#[derive(Clone)]
pub struct VesselStateTracker {
    store: Arc<dyn VesselStateStore>,
}

impl VesselStateTracker {
    pub fn new(store: Arc<dyn VesselStateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn VesselStateStore {
        self.store.as_ref()
    }

    /// Record this run's status and report whether it warrants a notification.
    pub fn record_and_should_notify(
        &self,
        vessel: &str,
        status: VesselStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let previous = self.store.load(vessel)?;
        let stored = previous.map(|r| r.status).unwrap_or_default();
        let notify = status != stored && !status.is_ok();

        let since = match previous {
            Some(r) if r.status == status => r.since,
            _ => now,
        };
        self.store.save(
            vessel,
            &VesselStateRecord {
                status,
                since,
                updated_at: now,
            },
        )?;

        debug!(
            vessel = %vessel,
            previous = %stored,
            current = %status,
            notify,
            backend = self.store.backend_name(),
            "Vessel state recorded"
        );
        Ok(notify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn memory_tracker() -> VesselStateTracker {
        VesselStateTracker::new(Arc::new(InMemoryVesselStateStore::new()))
    }

    #[test]
    fn test_first_anomaly_notifies() {
        let tracker = memory_tracker();
        assert!(tracker
            .record_and_should_notify("f1", VesselStatus::TemperatureRising, t0())
            .unwrap());
    }

    #[test]
    fn test_first_clean_evaluation_creates_record_without_notifying() {
        let tracker = memory_tracker();
        assert!(!tracker.record_and_should_notify("f1", VesselStatus::Ok, t0()).unwrap());
        let record = tracker.store().load("f1").unwrap().unwrap();
        assert_eq!(record.status, VesselStatus::Ok);
    }

    #[test]
    fn test_repeated_kind_is_suppressed() {
        let tracker = memory_tracker();
        let rising = VesselStatus::TemperatureRising;
        assert!(tracker.record_and_should_notify("f1", rising, t0()).unwrap());
        assert!(!tracker
            .record_and_should_notify("f1", rising, t0() + Duration::minutes(15))
            .unwrap());
    }

    #[test]
    fn test_change_of_kind_notifies() {
        let tracker = memory_tracker();
        assert!(tracker
            .record_and_should_notify("f1", VesselStatus::TemperatureRising, t0())
            .unwrap());
        assert!(tracker
            .record_and_should_notify("f1", VesselStatus::TemperatureExceedsMax, t0())
            .unwrap());
    }

    #[test]
    fn test_clean_run_rearms_notification() {
        let tracker = memory_tracker();
        let falling = VesselStatus::TemperatureFalling;
        assert!(tracker.record_and_should_notify("f2", falling, t0()).unwrap());
        assert!(!tracker.record_and_should_notify("f2", VesselStatus::Ok, t0()).unwrap());
        assert!(tracker.record_and_should_notify("f2", falling, t0()).unwrap());
    }

    #[test]
    fn test_vessels_are_independent() {
        let tracker = memory_tracker();
        let rising = VesselStatus::TemperatureRising;
        assert!(tracker.record_and_should_notify("f1", rising, t0()).unwrap());
        assert!(tracker.record_and_should_notify("f2", rising, t0()).unwrap());
    }

    #[test]
    fn test_since_tracks_first_entry_into_status() {
        let tracker = memory_tracker();
        let later = t0() + Duration::minutes(30);
        tracker.record_and_should_notify("f1", VesselStatus::NoData, t0()).unwrap();
        tracker.record_and_should_notify("f1", VesselStatus::NoData, later).unwrap();
        let record = tracker.store().load("f1").unwrap().unwrap();
        assert_eq!(record.since, t0());
        assert_eq!(record.updated_at, later);
    }

    #[test]
    fn test_sled_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state");

        {
            let store = Arc::new(SledVesselStateStore::open(&path).unwrap());
            let tracker = VesselStateTracker::new(store);
            assert!(tracker
                .record_and_should_notify("f3", VesselStatus::TemperatureRising, t0())
                .unwrap());
        }

        let store = Arc::new(SledVesselStateStore::open(&path).unwrap());
        assert_eq!(store.backend_name(), "Sled");
        let tracker = VesselStateTracker::new(store);
        assert!(!tracker
            .record_and_should_notify("f3", VesselStatus::TemperatureRising, t0())
            .unwrap());
    }

    #[test]
    fn test_list_all_sorted() {
        let store = InMemoryVesselStateStore::new();
        let record = VesselStateRecord {
            status: VesselStatus::Ok,
            since: t0(),
            updated_at: t0(),
        };
        store.save("f2", &record).unwrap();
        store.save("f1", &record).unwrap();
        let ids: Vec<_> = store.list_all().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(ids, vec!["f1", "f2"]);
    }
}
