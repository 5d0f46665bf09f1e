//! Typed collections of the local store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::error::ClientError;
use crate::normalize::local_record;
use crate::types::{AccessRequest, Attendance, Formation, Role, Session};

/// Entry names in the key-value store.
pub mod keys {
    pub const PENDING_REQUESTS: &str = "alyraSign_pendingRequests";
    pub const PROCESSED_REQUESTS: &str = "alyraSign_processedRequests";
    pub const FORMATIONS: &str = "alyraSign_formations";
    pub const SESSIONS: &str = "alyraSign_sessions";
    pub const ATTENDANCES: &str = "alyraSign_attendances";
    pub const LAST_CONNECTED_WALLET: &str = "alyraSign_lastConnectedWallet";
    pub const LAST_CONNECTED_ROLE: &str = "alyraSign_lastConnectedRole";
    pub const ON_DASHBOARD: &str = "alyraSign_onDashboard";
}

/// Pending requests in insertion order plus processed requests by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCollections {
    pub pending: Vec<AccessRequest>,
    pub processed: BTreeMap<String, AccessRequest>,
}

impl RequestCollections {
    /// Pending followed by processed, optionally restricted to one wallet.
    pub fn all(&self, wallet: Option<&str>) -> Vec<AccessRequest> {
        self.pending
            .iter()
            .chain(self.processed.values())
            .filter(|r| wallet.map_or(true, |w| r.wallet_address == w))
            .cloned()
            .collect()
    }
}

/// Local substitute for the program accounts.
///
/// Every mutation reads the whole collection, applies the change and writes
/// the whole collection back. Mutations inside one process are serialized by
/// a writer lock; separate processes sharing a file can still lose updates.
#[derive(Clone)]
pub struct LocalStore {
    kv: Arc<dyn KeyValueStore>,
    writer: Arc<Mutex<()>>,
}

impl LocalStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            writer: Arc::new(Mutex::new(())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, ClientError> {
        self.writer
            .lock()
            .map_err(|_| ClientError::Storage(anyhow::anyhow!("Local store writer lock poisoned")))
    }

    fn raw(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.kv.get(key).map_err(ClientError::Storage)
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), ClientError> {
        let json = serde_json::to_string(value)
            .map_err(|e| ClientError::Storage(anyhow::anyhow!("Failed to encode '{}': {}", key, e)))?;
        self.kv.set(key, &json).map_err(ClientError::Storage)
    }

    /// Parses the entry at `key`, treating absent or malformed data as empty.
    fn parse_or_default<C: DeserializeOwned + Default>(&self, key: &str) -> Result<C, ClientError> {
        let Some(raw) = self.raw(key)? else {
            return Ok(C::default());
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                let failure = ClientError::ParseFailure {
                    key: key.to_string(),
                    reason: e.to_string(),
                };
                warn!("{}; treating as empty", failure);
                Ok(C::default())
            }
        }
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, ClientError> {
        let values: Vec<serde_json::Value> = self.parse_or_default(key)?;
        Ok(values
            .into_iter()
            .filter_map(|value| local_record(key, value))
            .collect())
    }

    // ------------------------------------------------------------------------
    // Access requests
    // ------------------------------------------------------------------------

    pub fn requests(&self) -> Result<RequestCollections, ClientError> {
        let pending = self.read_list(keys::PENDING_REQUESTS)?;
        let processed_values: BTreeMap<String, serde_json::Value> =
            self.parse_or_default(keys::PROCESSED_REQUESTS)?;
        let processed = processed_values
            .into_iter()
            .filter_map(|(id, value)| {
                local_record::<AccessRequest>(keys::PROCESSED_REQUESTS, value).map(|r| (id, r))
            })
            .collect();
        Ok(RequestCollections { pending, processed })
    }

    /// Applies `f` to both request collections under the writer lock and
    /// writes them back only when `f` succeeds.
    pub fn update_requests<T>(
        &self,
        f: impl FnOnce(&mut RequestCollections) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let _guard = self.lock()?;
        let mut collections = self.requests()?;
        let out = f(&mut collections)?;
        self.write(keys::PENDING_REQUESTS, &collections.pending)?;
        self.write(keys::PROCESSED_REQUESTS, &collections.processed)?;
        debug!(
            pending = collections.pending.len(),
            processed = collections.processed.len(),
            "Request collections written"
        );
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Formations, sessions, attendances
    // ------------------------------------------------------------------------

    fn update_list<T, R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut Vec<T>) -> Result<R, ClientError>,
    ) -> Result<R, ClientError>
    where
        T: Serialize + DeserializeOwned,
    {
        let _guard = self.lock()?;
        let mut items = self.read_list(key)?;
        let out = f(&mut items)?;
        self.write(key, &items)?;
        Ok(out)
    }

    pub fn formations(&self) -> Result<Vec<Formation>, ClientError> {
        self.read_list(keys::FORMATIONS)
    }

    pub fn update_formations<R>(
        &self,
        f: impl FnOnce(&mut Vec<Formation>) -> Result<R, ClientError>,
    ) -> Result<R, ClientError> {
        self.update_list(keys::FORMATIONS, f)
    }

    pub fn sessions(&self) -> Result<Vec<Session>, ClientError> {
        self.read_list(keys::SESSIONS)
    }

    pub fn update_sessions<R>(
        &self,
        f: impl FnOnce(&mut Vec<Session>) -> Result<R, ClientError>,
    ) -> Result<R, ClientError> {
        self.update_list(keys::SESSIONS, f)
    }

    pub fn attendances(&self) -> Result<Vec<Attendance>, ClientError> {
        self.read_list(keys::ATTENDANCES)
    }

    pub fn update_attendances<R>(
        &self,
        f: impl FnOnce(&mut Vec<Attendance>) -> Result<R, ClientError>,
    ) -> Result<R, ClientError> {
        self.update_list(keys::ATTENDANCES, f)
    }

    /// Writes an empty collection for every absent entry. Existing data is kept.
    pub fn ensure_collections(&self) -> Result<(), ClientError> {
        let _guard = self.lock()?;
        for key in [
            keys::PENDING_REQUESTS,
            keys::FORMATIONS,
            keys::SESSIONS,
            keys::ATTENDANCES,
        ] {
            if self.raw(key)?.is_none() {
                self.kv.set(key, "[]").map_err(ClientError::Storage)?;
            }
        }
        if self.raw(keys::PROCESSED_REQUESTS)?.is_none() {
            self.kv
                .set(keys::PROCESSED_REQUESTS, "{}")
                .map_err(ClientError::Storage)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Session cache
    // ------------------------------------------------------------------------

    pub fn last_connected_wallet(&self) -> Result<Option<String>, ClientError> {
        self.raw(keys::LAST_CONNECTED_WALLET)
    }

    /// Last resolved role. An unparsable value reads as absent.
    pub fn last_connected_role(&self) -> Result<Option<Role>, ClientError> {
        Ok(self
            .raw(keys::LAST_CONNECTED_ROLE)?
            .and_then(|raw| raw.parse::<Role>().ok()))
    }

    pub fn remember_connection(&self, wallet: &str, role: Role) -> Result<(), ClientError> {
        self.kv
            .set(keys::LAST_CONNECTED_WALLET, wallet)
            .and_then(|_| self.kv.set(keys::LAST_CONNECTED_ROLE, role.as_str()))
            .map_err(ClientError::Storage)
    }

    pub fn on_dashboard(&self) -> Result<bool, ClientError> {
        Ok(self.raw(keys::ON_DASHBOARD)?.as_deref() == Some("true"))
    }

    pub fn set_on_dashboard(&self, on: bool) -> Result<(), ClientError> {
        self.kv
            .set(keys::ON_DASHBOARD, if on { "true" } else { "false" })
            .map_err(ClientError::Storage)
    }

    /// Removes the three session cache entries.
    pub fn clear_session_cache(&self) -> Result<(), ClientError> {
        for key in [
            keys::LAST_CONNECTED_ROLE,
            keys::LAST_CONNECTED_WALLET,
            keys::ON_DASHBOARD,
        ] {
            self.kv.remove(key).map_err(ClientError::Storage)?;
        }
        Ok(())
    }

    /// Clears the session cache if it belongs to `wallet`.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The cache matched and was cleared
    /// * `Ok(false)` - The cache belongs to another wallet or is empty
    pub fn clear_session_cache_for(&self, wallet: &str) -> Result<bool, ClientError> {
        if self.last_connected_wallet()?.as_deref() == Some(wallet) {
            self.clear_session_cache()?;
            return Ok(true);
        }
        Ok(false)
    }
}
