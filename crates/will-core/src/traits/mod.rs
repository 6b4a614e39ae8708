//! Collaborator seams. Implementations live in `will-storage` (the offline
//! store) and `will-sync` (transport and session); tests swap in fixtures.

mod offline_store;
mod remote_counter;
mod session;

pub use offline_store::IOfflineStore;
pub use remote_counter::IRemoteCounter;
pub use session::ISessionProvider;
