//! Shared test helpers for alyrasign integration tests
//!
//! Constants, configuration builders, a recording transaction submitter and
//! mocked JSON-RPC responses.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use alyrasign::{AccessBackend, Config, MemoryStore, SubmitError, TransactionSubmitter, Wallet};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chain_clients_svm::{AnchorAccount, Instruction, Pubkey};
use serde_json::json;
use solana_sdk::signature::Signature;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// CONSTANTS
// ============================================================================

/// AlyraSign program id used by every test configuration
pub const PROGRAM_ID: &str = "E8Lxhi9YBxt8AVFt9tWwmUXFAPyEWVojdeGHqnBuWHKc";

/// Administrator wallet used by every test configuration
pub const ADMIN_ADDRESS: &str = "79ziyYSUHVNENrJVinuotWZQ2TX7n44vSeo1cgxFPzSy";

/// Unreachable RPC endpoint for local-mode tests
pub const UNUSED_RPC_URL: &str = "http://127.0.0.1:1";

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Test configuration pointing at `rpc_url`, in the given mode, with a short
/// timeout and no retries.
pub fn test_config(rpc_url: &str, use_blockchain: bool) -> Config {
    let toml = format!(
        r#"
[chain]
rpc_url = "{rpc_url}"
network = "localnet"
program_id = "{PROGRAM_ID}"

[access]
admin_address = "{ADMIN_ADDRESS}"
use_blockchain = {use_blockchain}

[network]
tx_timeout_ms = 2000
max_retries = 0
retry_delay_ms = 1
"#
    );
    Config::from_toml_str(&toml).expect("Test configuration should be valid")
}

/// Local-mode backend over an in-memory store.
pub fn local_backend() -> AccessBackend {
    AccessBackend::with_store(test_config(UNUSED_RPC_URL, false), Arc::new(MemoryStore::new()))
        .expect("Failed to create local backend")
}

/// On-chain backend talking to the mock server.
pub fn onchain_backend(server: &MockServer) -> AccessBackend {
    AccessBackend::with_store(test_config(&server.uri(), true), Arc::new(MemoryStore::new()))
        .expect("Failed to create on-chain backend")
}

pub fn admin_pubkey() -> Pubkey {
    Pubkey::from_str(ADMIN_ADDRESS).expect("Admin address should parse")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ============================================================================
// RECORDING SUBMITTER
// ============================================================================

/// Submitter that records every instruction batch instead of sending it.
pub struct RecordingSubmitter {
    payer: Pubkey,
    failure: Option<SubmitError>,
    sent: Mutex<Vec<Vec<Instruction>>>,
}

impl RecordingSubmitter {
    pub fn new(payer: Pubkey) -> Self {
        Self {
            payer,
            failure: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Submitter whose every submission fails with `message` and `logs`.
    pub fn failing(payer: Pubkey, message: &str, logs: &[&str]) -> Self {
        Self {
            payer,
            failure: Some(SubmitError {
                message: message.to_string(),
                logs: logs.iter().map(|l| l.to_string()).collect(),
            }),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Vec<Instruction>> {
        self.sent.lock().unwrap().clone()
    }
}

impl TransactionSubmitter for RecordingSubmitter {
    fn payer(&self) -> Pubkey {
        self.payer
    }

    fn send_and_confirm(&self, instructions: &[Instruction]) -> Result<Signature, SubmitError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        self.sent.lock().unwrap().push(instructions.to_vec());
        Ok(Signature::default())
    }
}

/// Wallet signing through a fresh recording submitter.
pub fn recording_wallet(payer: Pubkey) -> (Arc<RecordingSubmitter>, Wallet) {
    let submitter = Arc::new(RecordingSubmitter::new(payer));
    let wallet = Wallet::with_submitter(submitter.clone());
    (submitter, wallet)
}

// ============================================================================
// MOCKED JSON-RPC
// ============================================================================

/// Mounts a `getAccountInfo` response for `address` holding `account`.
pub async fn mock_account<T: AnchorAccount>(server: &MockServer, address: &Pubkey, account: &T) {
    let data = STANDARD.encode(account.encode().expect("Failed to encode account"));
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "getAccountInfo",
            "params": [address.to_string()]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": {
                "context": { "slot": 1 },
                "value": { "data": [data, "base64"], "lamports": 1_000_000 }
            },
            "id": 1
        })))
        .mount(server)
        .await;
}

/// Mounts a `getAccountInfo` response reporting no account at `address`.
pub async fn mock_missing_account(server: &MockServer, address: &Pubkey) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "getAccountInfo",
            "params": [address.to_string()]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": { "context": { "slot": 1 }, "value": null },
            "id": 1
        })))
        .mount(server)
        .await;
}

/// Mounts a `getProgramAccounts` response listing `accounts`.
///
/// Only answers a scan of the test program filtered by the account
/// discriminator of `T` at offset 0; any other scan gets no response body.
pub async fn mock_program_accounts<T: AnchorAccount>(server: &MockServer, accounts: &[(Pubkey, T)]) {
    let entries: Vec<serde_json::Value> = accounts
        .iter()
        .map(|(address, account)| {
            let data = STANDARD.encode(account.encode().expect("Failed to encode account"));
            json!({
                "pubkey": address.to_string(),
                "account": { "data": [data, "base64"], "lamports": 1_000_000 }
            })
        })
        .collect();
    let discriminator = bs58::encode(T::discriminator()).into_string();
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "getProgramAccounts",
            "params": [
                PROGRAM_ID,
                {
                    "encoding": "base64",
                    "filters": [{ "memcmp": { "offset": 0, "bytes": discriminator } }]
                }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": entries,
            "id": 1
        })))
        .mount(server)
        .await;
}

/// Mounts a `getRecentPrioritizationFees` response with one sample per fee.
pub async fn mock_fees(server: &MockServer, fees: &[u64]) {
    let samples: Vec<serde_json::Value> = fees
        .iter()
        .enumerate()
        .map(|(slot, fee)| json!({ "slot": slot as u64 + 100, "prioritizationFee": fee }))
        .collect();
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getRecentPrioritizationFees" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": samples,
            "id": 1
        })))
        .mount(server)
        .await;
}
