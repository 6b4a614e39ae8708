//! # will-sync
//!
//! Reconciles taps buffered while offline with the remote counter service.
//!
//! - [`SyncCoordinator`]: decides when to sync and performs the batched,
//!   idempotent reconciliation.
//! - [`WillCounter`]: the tap entry point; sends directly when online,
//!   buffers otherwise.
//! - [`ConnectivityMonitor`]: the connected/disconnected signal.
//! - [`transport`] and [`HttpCounterService`]: the HTTP side of the remote.

pub mod connectivity;
pub mod coordinator;
pub mod counter;
pub mod remote;
pub mod session;
pub mod transport;

pub use connectivity::ConnectivityMonitor;
pub use coordinator::SyncCoordinator;
pub use counter::{TapOutcome, WillCounter};
pub use remote::HttpCounterService;
pub use session::StaticSession;
