//! Access-request lifecycle: create, approve, reject, revoke, list, and the
//! storage initializers.

use std::str::FromStr;

use chain_clients_svm::instructions::{self, CreateAccessRequestArgs};
use chain_clients_svm::{AccessRequestAccount, Pubkey};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use super::onchain::address;
use super::{next_local_id, processed_now, report, AccessBackend, Mode};
use crate::error::{check_len, ClientError};
use crate::normalize::request_from_account;
use crate::types::{AccessRequest, RequestStatus, Role};
use crate::wallet::Wallet;

/// Admin and request counter of the access storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessStorageInfo {
    /// Storage PDA; absent in local mode
    pub address: Option<String>,
    pub admin: String,
    pub request_count: u64,
}

fn parse_request_address(id: &str) -> Result<Pubkey, ClientError> {
    Pubkey::from_str(id)
        .map_err(|e| ClientError::InvalidInput(format!("request id '{}' is not an address: {}", id, e)))
}

impl AccessBackend {
    // ========================================================================
    // REQUESTS
    // ========================================================================

    /// Files a role request for the wallet.
    ///
    /// Does not check for an existing pending request of the same wallet.
    ///
    /// # Arguments
    ///
    /// * `wallet` - Requesting wallet (must be able to sign on chain)
    /// * `role` - Requested role
    /// * `message` - Free text for the administrator, bounded by `limits.message`
    ///
    /// # Returns
    ///
    /// * `Ok(AccessRequest)` - The new pending request
    /// * `Err(ClientError)` - Field too long, wallet cannot sign, or submission failed
    pub async fn create_access_request(
        &self,
        wallet: &Wallet,
        role: Role,
        message: &str,
    ) -> Result<AccessRequest, ClientError> {
        debug!(wallet = %wallet.address(), %role, "create_access_request");
        let result = self.create_access_request_inner(wallet, role, message).await;
        report(
            result,
            &self.messages().success_access_request,
            &self.messages().error_access_request,
        )
    }

    async fn create_access_request_inner(
        &self,
        wallet: &Wallet,
        role: Role,
        message: &str,
    ) -> Result<AccessRequest, ClientError> {
        check_len("role", role.program_label(), self.limits().role)?;
        check_len("message", message, self.limits().message)?;

        match self.mode() {
            Mode::Local => self.store.update_requests(|requests| {
                let id = next_local_id(|id| {
                    requests.pending.iter().any(|r| r.id == id) || requests.processed.contains_key(id)
                });
                let request = AccessRequest {
                    id,
                    wallet_address: wallet.address().to_string(),
                    requested_role: role,
                    message: message.to_string(),
                    status: RequestStatus::Pending,
                    created_at: Utc::now(),
                    processed_at: None,
                };
                requests.pending.push(request.clone());
                Ok(request)
            }),
            Mode::OnChain => {
                let (storage, account) = self.access_storage_account().await?;
                let request = address(self.deriver.access_request(&storage, account.request_count))?;
                let ix = instructions::create_access_request(
                    &self.program_id(),
                    &wallet.pubkey()?,
                    &storage,
                    &request,
                    &CreateAccessRequestArgs {
                        role: role.program_label().to_string(),
                        message: message.to_string(),
                    },
                )
                .map_err(ClientError::failed)?;
                self.submit(wallet, "create_access_request", vec![ix]).await?;

                Ok(AccessRequest {
                    id: request.to_string(),
                    wallet_address: wallet.address().to_string(),
                    requested_role: role,
                    message: message.to_string(),
                    status: RequestStatus::Pending,
                    created_at: Utc::now(),
                    processed_at: None,
                })
            }
        }
    }

    /// Approves a pending request.
    ///
    /// # Returns
    ///
    /// * `Ok(AccessRequest)` - The request, now approved with `processed_at` set
    /// * `Err(ClientError::NotFound)` - No pending request with this id
    pub async fn approve_access_request(
        &self,
        wallet: &Wallet,
        request_id: &str,
    ) -> Result<AccessRequest, ClientError> {
        debug!(request_id, "approve_access_request");
        let result = self
            .process_request(wallet, request_id, RequestStatus::Approved)
            .await;
        report(
            result,
            &self.messages().success_admin_approval,
            &self.messages().error_admin_approval,
        )
    }

    /// Rejects a pending request.
    pub async fn reject_access_request(
        &self,
        wallet: &Wallet,
        request_id: &str,
    ) -> Result<AccessRequest, ClientError> {
        debug!(request_id, "reject_access_request");
        let result = self
            .process_request(wallet, request_id, RequestStatus::Rejected)
            .await;
        report(
            result,
            &self.messages().success_admin_reject,
            &self.messages().error_admin_reject,
        )
    }

    async fn process_request(
        &self,
        wallet: &Wallet,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<AccessRequest, ClientError> {
        match self.mode() {
            Mode::Local => self.store.update_requests(|requests| {
                let index = requests
                    .pending
                    .iter()
                    .position(|r| r.id == request_id)
                    .ok_or_else(|| ClientError::not_found("access request", request_id))?;
                let mut request = requests.pending.remove(index);
                request.status = status;
                request.processed_at = Some(processed_now(request.created_at));
                requests.processed.insert(request.id.clone(), request.clone());
                Ok(request)
            }),
            Mode::OnChain => {
                let request_address = parse_request_address(request_id)?;
                let account = self
                    .fetch_account::<AccessRequestAccount>(&request_address)
                    .await?
                    .ok_or_else(|| ClientError::not_found("access request", request_id))?;
                let mut request = request_from_account(&request_address, &account)
                    .ok_or_else(|| ClientError::failed(format!("request {} has an unknown role", request_id)))?;
                if request.status != RequestStatus::Pending {
                    return Err(ClientError::not_found("pending access request", request_id));
                }

                let storage = address(self.deriver.access_storage())?;
                let (label, ix) = match status {
                    RequestStatus::Rejected => (
                        "reject_access_request",
                        instructions::reject_access_request(
                            &self.program_id(),
                            &storage,
                            &wallet.pubkey()?,
                            &request_address,
                        ),
                    ),
                    _ => (
                        "approve_access_request",
                        instructions::approve_access_request(
                            &self.program_id(),
                            &storage,
                            &wallet.pubkey()?,
                            &request_address,
                        ),
                    ),
                };
                self.submit(wallet, label, vec![ix]).await?;

                request.status = status;
                request.processed_at = Some(processed_now(request.created_at));
                Ok(request)
            }
        }
    }

    /// Revokes a processed request: its status becomes `rejected` and the
    /// session cache is cleared when it belongs to the same wallet.
    ///
    /// The program has no revocation instruction, so on-chain mode fails.
    pub async fn revoke_access(&self, request_id: &str) -> Result<AccessRequest, ClientError> {
        debug!(request_id, "revoke_access");
        let result = match self.mode() {
            Mode::OnChain => Err(ClientError::OperationFailed {
                message: "access revocation is not supported by the program".to_string(),
                logs: Vec::new(),
            }),
            Mode::Local => self.revoke_local(request_id),
        };
        report(
            result,
            &self.messages().success_admin_revoke,
            &self.messages().error_admin_revoke,
        )
    }

    fn revoke_local(&self, request_id: &str) -> Result<AccessRequest, ClientError> {
        let request = self.store.update_requests(|requests| {
            let request = requests
                .processed
                .get_mut(request_id)
                .ok_or_else(|| ClientError::not_found("processed access request", request_id))?;
            request.status = RequestStatus::Rejected;
            request.processed_at = Some(processed_now(request.created_at));
            Ok(request.clone())
        })?;

        if self.store.clear_session_cache_for(&request.wallet_address)? {
            debug!(wallet = %request.wallet_address, "Cleared cached role after revocation");
        }
        Ok(request)
    }

    /// Lists requests, optionally only those of `wallet_address`.
    ///
    /// On chain, every slot `0..request_count` is read; a missing or
    /// unreadable slot is skipped.
    pub async fn get_access_requests(
        &self,
        wallet_address: Option<&str>,
    ) -> Result<Vec<AccessRequest>, ClientError> {
        match self.mode() {
            Mode::Local => Ok(self.store.requests()?.all(wallet_address)),
            Mode::OnChain => {
                let (storage, account) = self.access_storage_account().await?;
                let mut requests = Vec::new();
                for (index, slot) in self.deriver.request_slots(storage, account.request_count) {
                    let slot = match slot {
                        Ok(slot) => slot,
                        Err(e) => {
                            warn!(index, "Skipping request slot: {}", e);
                            continue;
                        }
                    };
                    match self.fetch_account::<AccessRequestAccount>(&slot).await {
                        Ok(Some(account)) => {
                            if let Some(request) = request_from_account(&slot, &account) {
                                if wallet_address.map_or(true, |w| request.wallet_address == w) {
                                    requests.push(request);
                                }
                            }
                        }
                        Ok(None) => debug!(index, "Empty request slot"),
                        Err(e) => warn!(index, "Skipping request slot: {}", e),
                    }
                }
                Ok(requests)
            }
        }
    }

    /// True when the wallet has a processed request for `role`, approved or
    /// rejected. Pending requests do not count.
    pub async fn check_user_role(&self, wallet_address: &str, role: Role) -> Result<bool, ClientError> {
        let requests = self.get_access_requests(Some(wallet_address)).await?;
        Ok(requests
            .iter()
            .any(|r| r.status != RequestStatus::Pending && r.requested_role == role))
    }

    /// Admin and request counter. Local mode reports the configured admin and
    /// the number of stored requests.
    pub async fn get_access_storage(&self) -> Result<AccessStorageInfo, ClientError> {
        match self.mode() {
            Mode::Local => {
                let requests = self.store.requests()?;
                Ok(AccessStorageInfo {
                    address: None,
                    admin: self.admin.to_string(),
                    request_count: (requests.pending.len() + requests.processed.len()) as u64,
                })
            }
            Mode::OnChain => {
                let (storage, account) = self.access_storage_account().await?;
                Ok(AccessStorageInfo {
                    address: Some(storage.to_string()),
                    admin: account.admin.to_string(),
                    request_count: account.request_count,
                })
            }
        }
    }

    // ========================================================================
    // INITIALIZATION
    // ========================================================================

    pub async fn initialize_access_storage(&self, wallet: &Wallet) -> Result<(), ClientError> {
        let result = self
            .initialize_storage(wallet, "initialize_access_storage", |backend, admin| {
                let storage = address(backend.deriver.access_storage())?;
                Ok(instructions::initialize_access_storage(&backend.program_id(), admin, &storage))
            })
            .await;
        self.report_init(result)
    }

    pub async fn initialize_formation_storage(&self, wallet: &Wallet) -> Result<(), ClientError> {
        let result = self
            .initialize_storage(wallet, "initialize_formation_storage", |backend, admin| {
                let storage = address(backend.deriver.formation_storage())?;
                Ok(instructions::initialize_formation_storage(&backend.program_id(), admin, &storage))
            })
            .await;
        self.report_init(result)
    }

    pub async fn initialize_session_storage(&self, wallet: &Wallet) -> Result<(), ClientError> {
        let result = self
            .initialize_storage(wallet, "initialize_session_storage", |backend, admin| {
                let storage = address(backend.deriver.session_storage())?;
                Ok(instructions::initialize_session_storage(&backend.program_id(), admin, &storage))
            })
            .await;
        self.report_init(result)
    }

    pub async fn initialize_attendance_storage(&self, wallet: &Wallet) -> Result<(), ClientError> {
        let result = self
            .initialize_storage(wallet, "initialize_attendance_storage", |backend, admin| {
                let storage = address(backend.deriver.attendance_storage())?;
                Ok(instructions::initialize_attendance_storage(&backend.program_id(), admin, &storage))
            })
            .await;
        self.report_init(result)
    }

    /// Runs the four initializers in order. Every initializer is attempted;
    /// the first failure is returned.
    pub async fn initialize_all_storage(&self, wallet: &Wallet) -> Result<(), ClientError> {
        let outcomes = [
            self.initialize_access_storage(wallet).await,
            self.initialize_formation_storage(wallet).await,
            self.initialize_session_storage(wallet).await,
            self.initialize_attendance_storage(wallet).await,
        ];
        outcomes.into_iter().collect::<Result<Vec<()>, ClientError>>()?;
        Ok(())
    }

    async fn initialize_storage(
        &self,
        wallet: &Wallet,
        label: &str,
        build: impl FnOnce(&Self, &Pubkey) -> Result<chain_clients_svm::Instruction, ClientError>,
    ) -> Result<(), ClientError> {
        debug!(label, "initialize storage");
        match self.mode() {
            Mode::Local => self.store.ensure_collections(),
            Mode::OnChain => {
                let ix = build(self, &wallet.pubkey()?)?;
                self.submit(wallet, label, vec![ix]).await.map(|_| ())
            }
        }
    }

    fn report_init(&self, result: Result<(), ClientError>) -> Result<(), ClientError> {
        report(
            result,
            &self.messages().success_admin_initialization,
            &self.messages().error_admin_initialization,
        )
    }
}
