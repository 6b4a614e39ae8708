use serde::Deserialize;

use crate::Scripted;

/// A reconciliation scenario: seed the server, buffer taps, run a number of
/// sync attempts against a scripted remote, check where everything ends up.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncScenario {
    pub name: String,
    #[serde(default)]
    pub remote_before: u64,
    /// Count of each buffered increment, oldest first.
    pub taps: Vec<u32>,
    /// Failures consumed by successive remote calls.
    #[serde(default)]
    pub script: Vec<Scripted>,
    pub attempts: usize,
    pub expected: ScenarioExpectation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioExpectation {
    pub remote_after: u64,
    pub pending_after: u64,
    /// How many of the attempts reported `Synced`.
    pub synced_attempts: usize,
    /// How many batches the server actually applied.
    pub applications: usize,
}
