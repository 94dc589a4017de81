//! Client side of antisoup: talks to the service when it can and keeps
//! working from a local mirror when it cannot.

pub mod deep_link;
pub mod error;
pub mod mirror;
pub mod outbox;
pub mod provider;
pub mod remote;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{ClientError, SessionError, StoreError};
pub use mirror::{Mirror, Snapshot};
pub use provider::{DataProvider, Reconciled};
pub use remote::{HttpRemote, Remote};
pub use session::{FileStore, KeyValueStore, MemoryStore, Session};
pub use store::Store;
