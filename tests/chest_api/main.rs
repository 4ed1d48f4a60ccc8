//! DataChest API Test Suite
//!
//! End-to-end tests through the `DataChest` facade against a temporary
//! storage root.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test chest_api
//!
//! # Scenarios only
//! cargo test --test chest_api scenarios::
//! ```

use datachest::{ChestConfig, DataChest, VariableDecl};
use tempfile::TempDir;

pub mod namespace;
pub mod persistence;
pub mod scenarios;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Install a test-writer subscriber so `tracing` output shows on failure
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A handle rooted at a fresh temporary directory
pub fn open_chest() -> (TempDir, DataChest) {
    init_tracing();
    let dir = TempDir::new().expect("create temp root");
    let config = ChestConfig::builder()
        .root(dir.path())
        .build()
        .expect("valid config");
    let chest = DataChest::new(config).expect("open chest");
    (dir, chest)
}

/// `(name, [1], "float64", units)`
pub fn scalar(name: &str, units: &str) -> VariableDecl {
    VariableDecl::new(name, &[1], "float64", units)
}
