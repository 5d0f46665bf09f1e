//! Wallet capability: an address plus, optionally, the ability to sign and
//! submit transactions.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chain_clients_svm::{Instruction, Pubkey};
use solana_client::client_error::{ClientError as RpcClientError, ClientErrorKind};
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use thiserror::Error;

use crate::error::ClientError;

/// Failed submission, with the program logs returned by preflight if any.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SubmitError {
    pub message: String,
    pub logs: Vec<String>,
}

impl From<SubmitError> for ClientError {
    fn from(e: SubmitError) -> Self {
        ClientError::OperationFailed {
            message: e.message,
            logs: e.logs,
        }
    }
}

/// Signs and submits transactions.
///
/// Calls block until the transaction is confirmed; the backend runs them on
/// the blocking thread pool.
pub trait TransactionSubmitter: Send + Sync {
    /// Fee payer and signer of every submitted transaction.
    fn payer(&self) -> Pubkey;

    fn send_and_confirm(&self, instructions: &[Instruction]) -> Result<Signature, SubmitError>;
}

// ============================================================================
// KEYPAIR SUBMITTER
// ============================================================================

/// Submitter backed by a local keypair and the blocking Solana RPC client.
///
/// Every RPC request is bounded by `timeout`. Confirmation polling ends when
/// the transaction's blockhash expires, after which it can no longer land.
pub struct KeypairSubmitter {
    keypair: Keypair,
    rpc_client: RpcClient,
}

impl KeypairSubmitter {
    pub fn new(rpc_url: &str, keypair: Keypair, timeout: Duration) -> Self {
        Self {
            keypair,
            rpc_client: RpcClient::new_with_timeout_and_commitment(
                rpc_url.to_string(),
                timeout,
                CommitmentConfig::confirmed(),
            ),
        }
    }
}

impl TransactionSubmitter for KeypairSubmitter {
    fn payer(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn send_and_confirm(&self, instructions: &[Instruction]) -> Result<Signature, SubmitError> {
        let blockhash = self.rpc_client.get_latest_blockhash().map_err(|e| SubmitError {
            message: format!("Failed to get latest blockhash: {}", e),
            logs: Vec::new(),
        })?;
        let tx = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.keypair.pubkey()),
            &[&self.keypair],
            blockhash,
        );
        self.rpc_client
            .send_and_confirm_transaction(&tx)
            .map_err(|e| SubmitError {
                logs: preflight_logs(&e),
                message: e.to_string(),
            })
    }
}

/// Program logs attached to a failed preflight simulation.
fn preflight_logs(error: &RpcClientError) -> Vec<String> {
    match error.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
            ..
        }) => result.logs.clone().unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Decodes a base58 private key (64 bytes: seed + public key) into a Keypair.
pub fn keypair_from_base58(b58: &str) -> Result<Keypair> {
    let bytes = bs58::decode(b58)
        .into_vec()
        .context("Invalid base58 encoding")?;
    Keypair::try_from(bytes.as_slice()).map_err(|e| anyhow::anyhow!("Invalid keypair bytes: {}", e))
}

// ============================================================================
// WALLET
// ============================================================================

/// A connected wallet.
///
/// Read-only wallets can query and use local mode; on-chain mutations need a
/// submitter and fail with `NotConnected` otherwise.
///
/// The address is kept as text. Local mode accepts any identifier; on-chain
/// operations need it to be a public key.
#[derive(Clone)]
pub struct Wallet {
    address: String,
    key: Option<Pubkey>,
    submitter: Option<Arc<dyn TransactionSubmitter>>,
}

impl Wallet {
    pub fn read_only(address: Pubkey) -> Self {
        Self {
            address: address.to_string(),
            key: Some(address),
            submitter: None,
        }
    }

    /// Read-only wallet named by an arbitrary identifier.
    pub fn local(id: impl Into<String>) -> Self {
        let address = id.into();
        Self {
            key: Pubkey::from_str(&address).ok(),
            address,
            submitter: None,
        }
    }

    /// Wallet whose address is the submitter's payer.
    pub fn with_submitter(submitter: Arc<dyn TransactionSubmitter>) -> Self {
        let payer = submitter.payer();
        Self {
            address: payer.to_string(),
            key: Some(payer),
            submitter: Some(submitter),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// The address as a public key, for on-chain operations.
    pub fn pubkey(&self) -> Result<Pubkey, ClientError> {
        self.key.ok_or_else(|| {
            ClientError::InvalidInput(format!("wallet '{}' is not a public key", self.address))
        })
    }

    pub fn submitter(&self) -> Result<Arc<dyn TransactionSubmitter>, ClientError> {
        self.submitter.clone().ok_or(ClientError::NotConnected)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("can_sign", &self.submitter.is_some())
            .finish()
    }
}
