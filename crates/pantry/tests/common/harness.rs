//! Test harness for isolated ledger tests.
//!
//! Each harness owns its own database (in memory, or a file in a temp
//! directory) and a `ManualClock` so tests decide when time passes.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use pantry::{
    AddInventoryRequest, AddOutcome, AddedContainer, ContainerState, DeductRequest,
    DeductionResult, ManualClock, NewContainer, Pantry, PantryConfig, Result, TransactionRecord,
};

pub struct TestHarness {
    pub pantry: Arc<Pantry>,
    pub clock: Arc<ManualClock>,
    /// Keeps the directory of a file-backed database alive.
    temp_dir: Option<TempDir>,
}

/// The instant every harness starts at.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

impl TestHarness {
    /// In-memory pantry with default config.
    pub fn new() -> Self {
        Self::with_config(PantryConfig::default())
    }

    pub fn with_config(config: PantryConfig) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let pantry = Pantry::in_memory(config)
            .expect("Failed to open in-memory pantry")
            .with_clock(clock.clone());
        Self {
            pantry: Arc::new(pantry),
            clock,
            temp_dir: None,
        }
    }

    /// Pantry backed by a SQLite file in a fresh temp directory.
    pub fn file_backed() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = PantryConfig {
            database_path: Some(temp_dir.path().join("pantry.db")),
            ..Default::default()
        };
        let clock = Arc::new(ManualClock::new(start_time()));
        let pantry = Pantry::open(config)
            .expect("Failed to open file pantry")
            .with_clock(clock.clone());
        Self {
            pantry: Arc::new(pantry),
            clock,
            temp_dir: Some(temp_dir),
        }
    }

    pub fn db_path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join("pantry.db"))
    }

    pub fn advance_days(&self, days: i64) {
        self.clock.advance(Duration::days(days));
    }

    pub fn advance_hours(&self, hours: i64) {
        self.clock.advance(Duration::hours(hours));
    }

    /// Adds one item and returns the created container; panics on a skip.
    pub fn add(&self, item: NewContainer) -> AddedContainer {
        let result = self
            .pantry
            .add_inventory(&AddInventoryRequest { items: vec![item] })
            .expect("add_inventory failed");
        match result.results.into_iter().next() {
            Some(AddOutcome::Added(added)) => added,
            other => panic!("expected an added container, got {:?}", other),
        }
    }

    pub fn deduct(&self, master_id: &str, quantity: f64, unit: &str) -> Result<DeductionResult> {
        self.pantry.deduct_inventory(&DeductRequest {
            master_id: master_id.to_string(),
            quantity,
            unit: unit.to_string(),
            reason: None,
        })
    }

    pub fn container(&self, container_id: &str) -> ContainerState {
        self.pantry
            .database()
            .with_conn(|conn| pantry::db::container_repo::find_by_id(conn, container_id))
            .expect("container lookup failed")
            .expect("container missing")
    }

    pub fn history(&self, container_id: &str) -> Vec<TransactionRecord> {
        self.pantry
            .container_history(container_id)
            .expect("history failed")
    }

    /// Asserts the log and the stored quantity agree.
    pub fn assert_projection(&self, container_id: &str) {
        let report = self
            .pantry
            .verify_projection(container_id)
            .expect("verify_projection failed");
        assert!(report.consistent, "projection mismatch: {:?}", report);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
