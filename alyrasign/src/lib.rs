//! AlyraSign client library
//!
//! Access-request lifecycle for the AlyraSign attendance program: request,
//! approve, reject and revoke roles, resolve the role of a connected wallet,
//! and manage formations, sessions and attendance. Every operation runs
//! against the on-chain program or a local store, chosen per call.

pub mod backend;
pub mod config;
pub mod error;
pub mod fees;
pub mod normalize;
pub mod role;
pub mod store;
pub mod types;
pub mod wallet;

// Re-export public types for convenience
pub use backend::{AccessBackend, AccessStorageInfo, Mode};
pub use config::Config;
pub use error::ClientError;
pub use fees::{FeeEstimator, DEFAULT_FEE_SOL};
pub use role::{RequestLookup, Resolution, RoleResolver, Route, SessionCache, SessionState};
pub use store::{FileStore, KeyValueStore, LocalStore, MemoryStore};
pub use types::{
    AccessRequest, Attendance, Formation, NewFormation, NewSession, RequestStatus, Role, Session,
};
pub use wallet::{KeypairSubmitter, SubmitError, TransactionSubmitter, Wallet};
