//! Program plumbing shared by the on-chain branches: submission, account
//! reads and program-account scans.

use chain_clients_common::{with_retry, RetryError};
use chain_clients_svm::{
    AccessRequestStorage, AnchorAccount, Instruction, PdaError, ProgramAccountFilter, Pubkey,
};
use solana_sdk::signature::Signature;
use tracing::{debug, info, warn};

use super::AccessBackend;
use crate::error::ClientError;
use crate::wallet::{SubmitError, Wallet};

fn retry_failure<E: std::fmt::Display>(label: &str, error: RetryError<E>) -> ClientError {
    warn!(attempts = error.attempts(), "{} gave up", label);
    ClientError::OperationFailed {
        message: format!("{}: {}", label, error),
        logs: Vec::new(),
    }
}

/// Address part of a derivation result.
pub(super) fn address(derived: Result<(Pubkey, u8), PdaError>) -> Result<Pubkey, ClientError> {
    derived
        .map(|(address, _)| address)
        .map_err(ClientError::failed)
}

impl AccessBackend {
    pub(super) fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Signs and submits `instructions` with the wallet's submitter.
    ///
    /// Logs the fee estimate first. The submission runs on the blocking pool
    /// and is awaited to completion: abandoning it would leave a transaction
    /// that can still land after the caller saw a failure. Each RPC request
    /// inside the submitter is bounded by its own client timeout, and the
    /// confirmation wait ends when the blockhash expires. Never retried.
    ///
    /// # Returns
    ///
    /// * `Ok(Signature)` - Confirmed transaction
    /// * `Err(ClientError::NotConnected)` - The wallet cannot sign
    /// * `Err(ClientError::OperationFailed)` - Rejected or failed
    pub(super) async fn submit(
        &self,
        wallet: &Wallet,
        label: &str,
        instructions: Vec<Instruction>,
    ) -> Result<Signature, ClientError> {
        let submitter = wallet.submitter()?;
        let fee = self.fees.estimate().await;
        info!(instruction = label, payer = %submitter.payer(), fee_sol = fee, "Submitting transaction");

        let outcome = tokio::task::spawn_blocking(move || submitter.send_and_confirm(&instructions))
            .await
            .unwrap_or_else(|e| {
                Err(SubmitError {
                    message: format!("Submission task failed: {}", e),
                    logs: Vec::new(),
                })
            });

        match outcome {
            Ok(signature) => {
                debug!(instruction = label, %signature, "Transaction confirmed");
                Ok(signature)
            }
            Err(error) => {
                warn!(instruction = label, "Transaction failed: {}", error);
                for line in &error.logs {
                    debug!(instruction = label, "program log: {}", line);
                }
                Err(error.into())
            }
        }
    }

    /// Fetches and decodes one program account, retrying transport failures.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(T))` - Account exists and decodes as `T`
    /// * `Ok(None)` - No account at `address`
    /// * `Err(ClientError::OperationFailed)` - Read failed or data is not a `T`
    pub(super) async fn fetch_account<T: AnchorAccount>(
        &self,
        address: &Pubkey,
    ) -> Result<Option<T>, ClientError> {
        let data = with_retry(&self.policy, "getAccountInfo", || {
            self.rpc.get_account_data(address)
        })
        .await
        .map_err(|e| retry_failure("getAccountInfo", e))?;

        match data {
            Some(data) => T::decode(&data).map(Some).map_err(ClientError::failed),
            None => Ok(None),
        }
    }

    /// Lists every program account of type `T`. Accounts that fail to decode
    /// are skipped.
    pub(super) async fn scan_accounts<T: AnchorAccount>(&self) -> Result<Vec<(Pubkey, T)>, ClientError> {
        let filters = [ProgramAccountFilter::Memcmp {
            offset: 0,
            bytes: T::discriminator().to_vec(),
        }];
        let program_id = self.program_id;
        let accounts = with_retry(&self.policy, "getProgramAccounts", || {
            self.rpc.get_program_accounts(&program_id, &filters)
        })
        .await
        .map_err(|e| retry_failure("getProgramAccounts", e))?;

        Ok(accounts
            .into_iter()
            .filter_map(|(address, data)| match T::decode(&data) {
                Ok(account) => Some((address, account)),
                Err(e) => {
                    warn!("Skipping {} account {}: {}", T::NAME, address, e);
                    None
                }
            })
            .collect())
    }

    /// Access storage PDA and its decoded contents.
    pub(super) async fn access_storage_account(
        &self,
    ) -> Result<(Pubkey, AccessRequestStorage), ClientError> {
        let storage = address(self.deriver.access_storage())?;
        match self.fetch_account::<AccessRequestStorage>(&storage).await? {
            Some(account) => Ok((storage, account)),
            None => Err(ClientError::not_found("access storage", storage.to_string())),
        }
    }
}
