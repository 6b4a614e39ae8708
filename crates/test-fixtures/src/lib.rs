//! Test doubles and scenario fixtures for the will workspace.
//!
//! - [`IdempotentServer`]: in-memory reference server that deduplicates
//!   increment batches by idempotency key.
//! - [`MockRemoteCounter`]: `IRemoteCounter` over that server, with scripted
//!   failures, a call log, injectable latency, and a gate to hold a call open.
//! - JSON scenario loading from `scenarios/`.

pub mod mock_remote;
pub mod scenario;
pub mod server;

use serde::de::DeserializeOwned;
use std::path::PathBuf;

pub use mock_remote::{CallGate, MockRemoteCounter, RecordedCall, Scripted};
pub use scenario::{ScenarioExpectation, SyncScenario};
pub use server::IdempotentServer;

/// Root directory of the scenario files.
fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Check that a fixture file exists.
pub fn fixture_exists(relative_path: &str) -> bool {
    fixtures_root().join(relative_path).exists()
}

/// List all JSON fixtures, sorted by file name.
pub fn list_fixtures() -> Vec<PathBuf> {
    let dir = fixtures_root();
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("Failed to read directory {}: {}", dir.display(), e))
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                Some(path)
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}

/// Load every sync scenario.
pub fn load_scenarios() -> Vec<SyncScenario> {
    list_fixtures()
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_else(|| panic!("Non UTF-8 fixture name {}", path.display()));
            load_fixture(name)
        })
        .collect()
}
