//! Configuration Management Module
//!
//! Loads the client configuration from TOML: chain connection, access
//! control, PDA seeds, field-length limits, network timing, local store
//! location and user-facing message templates.

use std::str::FromStr;
use std::time::Duration;

use chain_clients_common::RetryPolicy;
use chain_clients_svm::{PdaDeriver, ProgramSeeds, Pubkey};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the configuration path.
pub const CONFIG_PATH_ENV: &str = "ALYRASIGN_CONFIG_PATH";
/// Default configuration path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/alyrasign.toml";

/// Maximum length of a single PDA seed.
const MAX_SEED_LEN: usize = 32;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chain: ChainConfig,
    pub access: AccessConfig,
    #[serde(default)]
    pub seeds: ProgramSeeds,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

/// Solana connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// RPC endpoint URL (e.g., "https://api.devnet.solana.com")
    pub rpc_url: String,
    /// Network name, informational (e.g., "devnet")
    #[serde(default = "default_network")]
    pub network: String,
    /// AlyraSign program id (base58)
    pub program_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Administrator wallet (base58). Always resolves to the trainer role.
    pub admin_address: String,
    /// Routes operations through the on-chain program when true, the local store otherwise
    #[serde(default)]
    pub use_blockchain: bool,
}

/// Maximum byte lengths of user-supplied fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub role: usize,
    pub message: usize,
    pub title: usize,
    pub description: usize,
    pub location: usize,
    pub note: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            role: 20,
            message: 100,
            title: 100,
            description: 500,
            location: 100,
            note: 100,
        }
    }
}

/// Timeout and retry budget for network calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub tx_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tx_timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 2_000,
        }
    }
}

impl NetworkConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(self.max_retries, self.retry_delay_ms, self.tx_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.tx_timeout_ms)
    }
}

/// Local store persistence. No path keeps the store in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: Option<String>,
}

/// User-facing message templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub success_access_request: String,
    pub error_access_request: String,
    pub success_admin_initialization: String,
    pub error_admin_initialization: String,
    pub success_admin_approval: String,
    pub error_admin_approval: String,
    pub success_admin_reject: String,
    pub error_admin_reject: String,
    pub success_admin_revoke: String,
    pub error_admin_revoke: String,
    pub success_formation: String,
    pub error_formation: String,
    pub success_session: String,
    pub error_session: String,
    pub success_attendance: String,
    pub error_attendance: String,
    pub success_attendance_update: String,
    pub error_attendance_update: String,
    pub success_attendance_list: String,
    pub error_attendance_list: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            success_access_request: "Demande d'accès envoyée avec succès".to_string(),
            error_access_request: "Erreur lors de l'envoi de la demande d'accès".to_string(),
            success_admin_initialization: "Initialisation réussie".to_string(),
            error_admin_initialization: "Erreur lors de l'initialisation".to_string(),
            success_admin_approval: "Demande approuvée avec succès".to_string(),
            error_admin_approval: "Erreur lors de l'approbation de la demande".to_string(),
            success_admin_reject: "Demande rejetée avec succès".to_string(),
            error_admin_reject: "Erreur lors du rejet de la demande".to_string(),
            success_admin_revoke: "Accès révoqué avec succès".to_string(),
            error_admin_revoke: "Erreur lors de la révocation de l'accès".to_string(),
            success_formation: "Formation enregistrée avec succès".to_string(),
            error_formation: "Erreur lors de l'enregistrement de la formation".to_string(),
            success_session: "Session créée avec succès".to_string(),
            error_session: "Erreur lors de la création de la session".to_string(),
            success_attendance: "Présence enregistrée avec succès".to_string(),
            error_attendance: "Erreur lors de l'enregistrement de la présence".to_string(),
            success_attendance_update: "Présence mise à jour avec succès".to_string(),
            error_attendance_update: "Erreur lors de la mise à jour de la présence".to_string(),
            success_attendance_list: "Liste des présences récupérée avec succès".to_string(),
            error_attendance_list: "Erreur lors de la récupération des présences".to_string(),
        }
    }
}

fn default_network() -> String {
    "devnet".to_string()
}

// ============================================================================
// LOADING AND VALIDATION
// ============================================================================

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// Path resolution: the provided path, then `ALYRASIGN_CONFIG_PATH`, then
    /// `config/alyrasign.toml`.
    ///
    /// # Arguments
    ///
    /// * `path` - Optional path to config file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Loaded and validated configuration
    /// * `Err(anyhow::Error)` - File missing, unparsable or invalid
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config = Self::from_toml_str(&content)?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/alyrasign.template.toml config/alyrasign.toml\n\
                Then edit config/alyrasign.toml with your actual values.",
                config_path
            ))
        }
    }

    /// Equivalent to `load_from_path(None)`.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - Program id and admin address are valid base58 public keys
    /// - Every seed is non-empty and at most 32 bytes
    /// - Every field limit is positive
    /// - Network timeout is positive
    pub fn validate(&self) -> anyhow::Result<()> {
        self.program_id()?;
        self.admin_pubkey()?;

        for (name, seed) in self.seeds.named() {
            if seed.is_empty() || seed.len() > MAX_SEED_LEN {
                return Err(anyhow::anyhow!(
                    "Configuration error: seed '{}' must be 1..={} bytes, got {}",
                    name,
                    MAX_SEED_LEN,
                    seed.len()
                ));
            }
        }

        let limits = [
            ("role", self.limits.role),
            ("message", self.limits.message),
            ("title", self.limits.title),
            ("description", self.limits.description),
            ("location", self.limits.location),
            ("note", self.limits.note),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, max)| *max == 0) {
            return Err(anyhow::anyhow!(
                "Configuration error: limit '{}' must be positive",
                name
            ));
        }

        if self.network.tx_timeout_ms == 0 {
            return Err(anyhow::anyhow!(
                "Configuration error: network.tx_timeout_ms must be positive"
            ));
        }

        Ok(())
    }

    pub fn program_id(&self) -> anyhow::Result<Pubkey> {
        Pubkey::from_str(&self.chain.program_id).map_err(|e| {
            anyhow::anyhow!(
                "Invalid chain.program_id '{}' (expected base58 string): {}",
                self.chain.program_id,
                e
            )
        })
    }

    pub fn admin_pubkey(&self) -> anyhow::Result<Pubkey> {
        Pubkey::from_str(&self.access.admin_address).map_err(|e| {
            anyhow::anyhow!(
                "Invalid access.admin_address '{}' (expected base58 string): {}",
                self.access.admin_address,
                e
            )
        })
    }

    /// PDA deriver for the configured program and seeds.
    pub fn pda_deriver(&self) -> anyhow::Result<PdaDeriver> {
        Ok(PdaDeriver::new(self.program_id()?, self.seeds.clone()))
    }
}
