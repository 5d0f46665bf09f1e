//! Minimal Solana JSON-RPC reader.
//!
//! Covers the three reads the client needs: a single account, a filtered
//! program-account scan and recent prioritization fees. Account data is
//! requested base64-encoded and returned as raw bytes.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use tracing::debug;

// ============================================================================
// JSON-RPC TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProgramAccountResult {
    pubkey: String,
    account: RpcAccount,
}

#[derive(Debug, Deserialize)]
struct RpcAccount {
    data: (String, String),
}

#[derive(Debug, Deserialize)]
struct AccountInfoResult {
    value: Option<RpcAccount>,
}

/// One entry of `getRecentPrioritizationFees`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizationFeeSample {
    pub slot: u64,
    /// Micro-lamports per compute unit.
    pub prioritization_fee: u64,
}

/// Server-side filter for `getProgramAccounts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramAccountFilter {
    /// Raw bytes expected at `offset` in the account data.
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl ProgramAccountFilter {
    fn to_json(&self) -> serde_json::Value {
        match self {
            ProgramAccountFilter::Memcmp { offset, bytes } => serde_json::json!({
                "memcmp": {
                    "offset": offset,
                    "bytes": bs58::encode(bytes).into_string(),
                }
            }),
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct SvmRpcClient {
    client: Client,
    rpc_url: String,
}

impl SvmRpcClient {
    /// Creates a client for `rpc_url` with a per-request HTTP timeout.
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<Option<T>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        debug!(method, url = %self.rpc_url, "SVM RPC call");

        let response: JsonRpcResponse<T> = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to call {}", method))?
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        if let Some(error) = response.error {
            return Err(anyhow::anyhow!("SVM RPC error: {}", error.message));
        }

        Ok(response.result)
    }

    /// Fetches raw account data.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(data))` - Account exists
    /// * `Ok(None)` - No account at this address
    /// * `Err(anyhow::Error)` - Transport or RPC failure
    pub async fn get_account_data(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>> {
        let params = serde_json::json!([
            pubkey.to_string(),
            { "encoding": "base64" }
        ]);

        let Some(result) = self.call::<AccountInfoResult>("getAccountInfo", params).await? else {
            return Ok(None);
        };
        let Some(account) = result.value else {
            return Ok(None);
        };

        decode_data(&account.data.0).map(Some)
    }

    /// Lists the accounts owned by `program_id` matching every filter.
    pub async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[ProgramAccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        let mut config = serde_json::json!({ "encoding": "base64" });
        if !filters.is_empty() {
            config["filters"] = filters.iter().map(ProgramAccountFilter::to_json).collect();
        }
        let params = serde_json::json!([program_id.to_string(), config]);

        let accounts = self
            .call::<Vec<ProgramAccountResult>>("getProgramAccounts", params)
            .await?
            .unwrap_or_default();

        let mut decoded = Vec::with_capacity(accounts.len());
        for account in accounts {
            let pubkey = Pubkey::from_str(&account.pubkey)
                .context("Invalid pubkey in getProgramAccounts response")?;
            decoded.push((pubkey, decode_data(&account.account.data.0)?));
        }
        Ok(decoded)
    }

    pub async fn get_recent_prioritization_fees(&self) -> Result<Vec<PrioritizationFeeSample>> {
        Ok(self
            .call::<Vec<PrioritizationFeeSample>>("getRecentPrioritizationFees", serde_json::json!([]))
            .await?
            .unwrap_or_default())
    }
}

fn decode_data(data_base64: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(data_base64)
        .context("Invalid base64 account data")
}
