//! Dual-mode backend adapter.
//!
//! One method per domain operation. Each call reads the mode switch and
//! either submits an instruction to the program (`onchain`) or mutates the
//! local store. Results come back as domain types in both modes.

mod access;
mod attendance;
mod courses;
mod onchain;

pub use access::AccessStorageInfo;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use chain_clients_common::RetryPolicy;
use chain_clients_svm::{PdaDeriver, Pubkey, SvmRpcClient};
use chrono::{DateTime, Utc};
use solana_sdk::signature::Keypair;
use tracing::{info, warn};

use crate::config::{Config, LimitsConfig, MessagesConfig};
use crate::error::ClientError;
use crate::fees::FeeEstimator;
use crate::role::{Resolution, RoleResolver};
use crate::store::{FileStore, KeyValueStore, LocalStore, MemoryStore};
use crate::wallet::{keypair_from_base58, KeypairSubmitter, Wallet};

/// Where an operation is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    OnChain,
    Local,
}

pub struct AccessBackend {
    config: Config,
    use_blockchain: Arc<AtomicBool>,
    store: LocalStore,
    deriver: PdaDeriver,
    rpc: SvmRpcClient,
    fees: FeeEstimator,
    policy: RetryPolicy,
    program_id: Pubkey,
    admin: Pubkey,
}

impl AccessBackend {
    /// Creates a backend from configuration.
    ///
    /// The local store is the JSON file at `store.path` when set, memory
    /// otherwise.
    ///
    /// # Returns
    ///
    /// * `Ok(AccessBackend)` - Ready backend
    /// * `Err(anyhow::Error)` - Invalid configuration or unreadable store file
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let kv: Arc<dyn KeyValueStore> = match &config.store.path {
            Some(path) => Arc::new(
                FileStore::open(path).with_context(|| format!("Failed to open local store {}", path))?,
            ),
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_store(config, kv)
    }

    /// Creates a backend over an explicit key-value store.
    pub fn with_store(config: Config, kv: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        config.validate()?;
        let program_id = config.program_id()?;
        let admin = config.admin_pubkey()?;
        let deriver = config.pda_deriver()?;
        let rpc = SvmRpcClient::new(&config.chain.rpc_url, config.network.timeout())?;
        let policy = config.network.retry_policy();

        info!(
            network = %config.chain.network,
            program_id = %program_id,
            use_blockchain = config.access.use_blockchain,
            "AlyraSign backend ready"
        );

        Ok(Self {
            use_blockchain: Arc::new(AtomicBool::new(config.access.use_blockchain)),
            store: LocalStore::new(kv),
            deriver,
            fees: FeeEstimator::new(rpc.clone()),
            rpc,
            policy,
            program_id,
            admin,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn deriver(&self) -> &PdaDeriver {
        &self.deriver
    }

    pub fn fees(&self) -> &FeeEstimator {
        &self.fees
    }

    /// Shared handle on the mode flag.
    pub fn mode_switch(&self) -> Arc<AtomicBool> {
        self.use_blockchain.clone()
    }

    pub fn set_use_blockchain(&self, on: bool) {
        self.use_blockchain.store(on, Ordering::SeqCst);
        info!(use_blockchain = on, "Backend mode changed");
    }

    pub fn uses_blockchain(&self) -> bool {
        self.use_blockchain.load(Ordering::SeqCst)
    }

    /// Mode for the current call.
    pub fn mode(&self) -> Mode {
        if self.uses_blockchain() {
            Mode::OnChain
        } else {
            Mode::Local
        }
    }

    /// Signing wallet for `keypair`, submitting to the configured RPC endpoint
    /// with the network timeout on every request.
    pub fn keypair_wallet(&self, keypair: Keypair) -> Wallet {
        let submitter = KeypairSubmitter::new(
            &self.config.chain.rpc_url,
            keypair,
            self.config.network.timeout(),
        );
        Wallet::with_submitter(Arc::new(submitter))
    }

    /// [`keypair_wallet`](Self::keypair_wallet) from a base58 private key.
    pub fn keypair_wallet_from_base58(&self, private_key_b58: &str) -> anyhow::Result<Wallet> {
        let keypair = keypair_from_base58(private_key_b58)
            .context("Failed to decode private key from base58")?;
        Ok(self.keypair_wallet(keypair))
    }

    fn limits(&self) -> &LimitsConfig {
        &self.config.limits
    }

    fn messages(&self) -> &MessagesConfig {
        &self.config.messages
    }

    // ========================================================================
    // ROLE RESOLUTION
    // ========================================================================

    /// Resolver bound to the configured admin and the local session cache.
    pub fn role_resolver(&self) -> RoleResolver {
        RoleResolver::new(
            self.config.access.admin_address.clone(),
            Arc::new(self.store.clone()),
        )
    }

    /// Resolves the role of a newly connected wallet.
    ///
    /// Local mode looks requests up in the store. On-chain mode lists the
    /// wallet's requests first; a failed listing degrades to no access.
    pub async fn connect_wallet(&self, resolver: &mut RoleResolver, wallet: &str) -> Resolution {
        match self.mode() {
            Mode::Local => resolver.connect(wallet, &self.store),
            Mode::OnChain => {
                resolver.begin(wallet);
                if let Some(resolution) = resolver.shortcut(wallet) {
                    return resolution;
                }
                match self.get_access_requests(Some(wallet)).await {
                    Ok(requests) => resolver.finish_with(wallet, requests.as_slice()),
                    Err(e) => resolver.degrade(wallet, &e),
                }
            }
        }
    }
}

/// Logs the outcome of an operation with its user-facing message.
fn report<T>(result: Result<T, ClientError>, success: &str, failure: &str) -> Result<T, ClientError> {
    match &result {
        Ok(_) => info!("{}", success),
        Err(e) => warn!("{}: {}", failure, e),
    }
    result
}

/// Millisecond timestamp id, bumped until `taken` rejects it.
fn next_local_id(taken: impl Fn(&str) -> bool) -> String {
    let mut candidate = Utc::now().timestamp_millis();
    loop {
        let id = candidate.to_string();
        if !taken(&id) {
            return id;
        }
        candidate += 1;
    }
}

/// Processing time of a request, never earlier than its creation.
fn processed_now(created_at: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(created_at)
}
