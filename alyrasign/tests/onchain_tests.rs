//! On-chain mode tests
//!
//! Chain reads go to a wiremock JSON-RPC endpoint; submissions go to a
//! recording submitter so the built instructions can be inspected.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alyrasign::{
    AccessBackend, ClientError, FeeEstimator, MemoryStore, Mode, NewFormation, NewSession, Role,
    SubmitError, TransactionSubmitter, Wallet, DEFAULT_FEE_SOL,
};
use chain_clients_svm::anchor::instruction_discriminator;
use chain_clients_svm::{
    AccessRequestAccount, AccessRequestStorage, AttendanceAccount, FormationAccount, Instruction,
    Pubkey, RequestStatus, SessionAccount, SvmRpcClient,
};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use solana_sdk::signature::{Keypair, Signature, Signer};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{
    admin_pubkey, init_tracing, mock_account, mock_fees, mock_missing_account,
    mock_program_accounts, onchain_backend, recording_wallet, test_config, RecordingSubmitter,
    ADMIN_ADDRESS,
};

fn request_account(requester: Pubkey, role: &str, status: RequestStatus) -> AccessRequestAccount {
    AccessRequestAccount {
        requester,
        role: role.to_string(),
        message: "bonjour".to_string(),
        status,
        created_at: 1_700_000_000,
        bump: 254,
    }
}

fn storage_account(request_count: u64) -> AccessRequestStorage {
    AccessRequestStorage {
        admin: admin_pubkey(),
        request_count,
        bump: 255,
    }
}

fn attendance_account(student: Pubkey, session_id: &str) -> AttendanceAccount {
    AttendanceAccount {
        id: format!("{}-{}", session_id, student),
        session_id: session_id.to_string(),
        student,
        is_present: true,
        check_in_time: 1_700_000_000,
        check_out_time: None,
        note: String::new(),
        created_at: 1_700_000_000,
        updated_at: 1_700_000_000,
        bump: 253,
    }
}

fn formation_account(id: &str, title: &str) -> FormationAccount {
    FormationAccount {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        creator: admin_pubkey(),
        start_date: 0,
        end_date: 0,
        is_active: true,
        created_at: 1_700_000_000,
        updated_at: 1_700_000_000,
        bump: 252,
    }
}

fn session_account(id: &str, formation_id: &str, start: i64, minutes: u64) -> SessionAccount {
    SessionAccount {
        id: id.to_string(),
        formation_id: formation_id.to_string(),
        title: format!("Session {}", id),
        description: String::new(),
        trainer: admin_pubkey(),
        date: start,
        duration: minutes,
        location: "Paris".to_string(),
        is_active: true,
        created_at: 1_700_000_000,
        updated_at: 1_700_000_000,
        bump: 251,
    }
}

/// Submitter that confirms only after `delay`, counting landed transactions.
struct SlowSubmitter {
    payer: Pubkey,
    delay: Duration,
    landed: AtomicUsize,
}

impl SlowSubmitter {
    fn new(payer: Pubkey, delay: Duration) -> Self {
        Self {
            payer,
            delay,
            landed: AtomicUsize::new(0),
        }
    }

    fn landed(&self) -> usize {
        self.landed.load(Ordering::SeqCst)
    }
}

impl TransactionSubmitter for SlowSubmitter {
    fn payer(&self) -> Pubkey {
        self.payer
    }

    fn send_and_confirm(&self, _instructions: &[Instruction]) -> Result<Signature, SubmitError> {
        std::thread::sleep(self.delay);
        self.landed.fetch_add(1, Ordering::SeqCst);
        Ok(Signature::default())
    }
}

// ============================================================================
// ACCESS REQUESTS
// ============================================================================

/// What is tested: create_access_request targets the request PDA at the current request count
/// Why: The program initializes the request account at that exact address
#[tokio::test]
async fn test_create_request_builds_instruction() {
    init_tracing();
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let (storage, _) = backend.deriver().access_storage().unwrap();
    mock_account(&server, &storage, &storage_account(2)).await;
    mock_fees(&server, &[5_000]).await;

    let payer = Pubkey::new_unique();
    let (submitter, wallet) = recording_wallet(payer);
    let created = backend
        .create_access_request(&wallet, Role::Student, "hi")
        .await
        .expect("Creation should succeed");

    let (expected, _) = backend.deriver().access_request(&storage, 2).unwrap();
    assert_eq!(created.id, expected.to_string());
    assert_eq!(created.wallet_address, payer.to_string());

    let sent = submitter.sent();
    assert_eq!(sent.len(), 1);
    let ix = &sent[0][0];
    assert_eq!(ix.accounts[0].pubkey, payer);
    assert!(ix.accounts[0].is_signer);
    assert_eq!(ix.accounts[1].pubkey, storage);
    assert_eq!(ix.accounts[2].pubkey, expected);
    assert_eq!(&ix.data[..8], &instruction_discriminator("create_access_request"));
}

/// What is tested: approving a request without an account fails with NotFound and submits nothing
#[tokio::test]
async fn test_approve_missing_request_is_not_found() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let request = Pubkey::new_unique();
    mock_missing_account(&server, &request).await;

    let (submitter, admin) = recording_wallet(admin_pubkey());
    let result = backend.approve_access_request(&admin, &request.to_string()).await;

    assert!(matches!(result, Err(ClientError::NotFound { .. })));
    assert!(submitter.sent().is_empty());
}

/// What is tested: approving a pending request submits approve_access_request signed by the admin
#[tokio::test]
async fn test_approve_pending_request_submits() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let request = Pubkey::new_unique();
    let requester = Pubkey::new_unique();
    mock_account(&server, &request, &request_account(requester, "etudiant", RequestStatus::Pending)).await;
    mock_fees(&server, &[]).await;

    let (submitter, admin) = recording_wallet(admin_pubkey());
    let approved = backend
        .approve_access_request(&admin, &request.to_string())
        .await
        .expect("Approval should succeed");

    assert_eq!(approved.status, alyrasign::RequestStatus::Approved);
    assert!(approved.processed_at.is_some());
    let ix = &submitter.sent()[0][0];
    assert_eq!(ix.accounts[1].pubkey, admin_pubkey());
    assert!(ix.accounts[1].is_signer);
    assert_eq!(ix.accounts[2].pubkey, request);
    assert_eq!(ix.data, instruction_discriminator("approve_access_request").to_vec());
}

/// What is tested: rejecting a pending request submits reject_access_request signed by the admin
#[tokio::test]
async fn test_reject_pending_request_submits() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let request = Pubkey::new_unique();
    mock_account(&server, &request, &request_account(Pubkey::new_unique(), "formateur", RequestStatus::Pending)).await;
    mock_fees(&server, &[]).await;

    let (submitter, admin) = recording_wallet(admin_pubkey());
    let rejected = backend
        .reject_access_request(&admin, &request.to_string())
        .await
        .expect("Rejection should succeed");

    assert_eq!(rejected.status, alyrasign::RequestStatus::Rejected);
    assert_eq!(rejected.requested_role, Role::Trainer);
    assert!(rejected.processed_at.unwrap() >= rejected.created_at);
    let sent = submitter.sent();
    assert_eq!(sent.len(), 1);
    let ix = &sent[0][0];
    assert_eq!(ix.accounts[1].pubkey, admin_pubkey());
    assert_eq!(ix.accounts[2].pubkey, request);
    assert_eq!(ix.data, instruction_discriminator("reject_access_request").to_vec());
}

/// What is tested: an already processed request cannot be rejected again
#[tokio::test]
async fn test_reject_processed_request_is_not_found() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let request = Pubkey::new_unique();
    mock_account(&server, &request, &request_account(Pubkey::new_unique(), "etudiant", RequestStatus::Approved)).await;

    let (submitter, admin) = recording_wallet(admin_pubkey());
    let result = backend.reject_access_request(&admin, &request.to_string()).await;

    assert!(matches!(result, Err(ClientError::NotFound { .. })));
    assert!(submitter.sent().is_empty());
}

/// What is tested: listing skips slots without an account
/// Why: A missing slot is an empty slot, not a failed listing
#[tokio::test]
async fn test_listing_skips_missing_slots() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let deriver = backend.deriver();
    let (storage, _) = deriver.access_storage().unwrap();
    mock_account(&server, &storage, &storage_account(3)).await;

    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let slot = |i| deriver.access_request(&storage, i).unwrap().0;
    mock_account(&server, &slot(0), &request_account(alice, "etudiant", RequestStatus::Pending)).await;
    mock_missing_account(&server, &slot(1)).await;
    mock_account(&server, &slot(2), &request_account(bob, "formateur", RequestStatus::Approved)).await;

    let all = backend.get_access_requests(None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, slot(0).to_string());
    assert_eq!(all[1].requested_role, Role::Trainer);

    let bobs = backend.get_access_requests(Some(&bob.to_string())).await.unwrap();
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].status, alyrasign::RequestStatus::Approved);
    assert!(backend.check_user_role(&bob.to_string(), Role::Trainer).await.unwrap());
}

/// What is tested: on-chain storage info comes from the decoded storage account
#[tokio::test]
async fn test_access_storage_info() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let (storage, _) = backend.deriver().access_storage().unwrap();
    mock_account(&server, &storage, &storage_account(7)).await;

    let info = backend.get_access_storage().await.unwrap();

    assert_eq!(info.address, Some(storage.to_string()));
    assert_eq!(info.admin, ADMIN_ADDRESS);
    assert_eq!(info.request_count, 7);
}

/// What is tested: revocation is refused on chain
/// Why: The program has no revocation instruction
#[tokio::test]
async fn test_revoke_is_unsupported_on_chain() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);

    let result = backend.revoke_access(&Pubkey::new_unique().to_string()).await;

    assert!(matches!(result, Err(ClientError::OperationFailed { .. })));
}

// ============================================================================
// SUBMISSION
// ============================================================================

/// What is tested: a mutation from a wallet that cannot sign fails with NotConnected
#[tokio::test]
async fn test_read_only_wallet_is_not_connected() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let wallet = Wallet::read_only(admin_pubkey());

    let result = backend.initialize_access_storage(&wallet).await;

    assert!(matches!(result, Err(ClientError::NotConnected)));
}

/// What is tested: a failed submission surfaces as OperationFailed with the program logs
/// Why: Program logs are the only diagnostic of a rejected transaction
#[tokio::test]
async fn test_submission_failure_carries_logs() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    mock_fees(&server, &[1]).await;
    let submitter = Arc::new(RecordingSubmitter::failing(
        admin_pubkey(),
        "Transaction simulation failed",
        &["Program log: AnchorError: already in use"],
    ));
    let wallet = Wallet::with_submitter(submitter);

    let result = backend.initialize_access_storage(&wallet).await;

    match result {
        Err(ClientError::OperationFailed { message, logs }) => {
            assert!(message.contains("simulation failed"));
            assert_eq!(logs, vec!["Program log: AnchorError: already in use".to_string()]);
        }
        other => panic!("Expected OperationFailed, got {:?}", other),
    }
}

/// What is tested: a confirmation slower than the network timeout is awaited and reported as success
/// Why: Reporting a failure while the transaction still lands would invite a duplicate submission
#[tokio::test]
async fn test_slow_confirmation_is_awaited() {
    let server = MockServer::start().await;
    mock_fees(&server, &[]).await;
    let mut config = test_config(&server.uri(), true);
    config.network.tx_timeout_ms = 50;
    let backend = AccessBackend::with_store(config, Arc::new(MemoryStore::new())).unwrap();
    let submitter = Arc::new(SlowSubmitter::new(admin_pubkey(), Duration::from_millis(300)));
    let wallet = Wallet::with_submitter(submitter.clone());

    backend
        .initialize_access_storage(&wallet)
        .await
        .expect("Slow confirmation should still succeed");

    assert_eq!(submitter.landed(), 1);
}

/// What is tested: keypair wallets built by the backend sign as the keypair's public key
#[tokio::test]
async fn test_keypair_wallet_from_base58() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let keypair = Keypair::new();
    let expected = keypair.pubkey();
    let encoded = bs58::encode(keypair.to_bytes()).into_string();

    let wallet = backend.keypair_wallet_from_base58(&encoded).unwrap();

    assert_eq!(wallet.address(), expected.to_string());
    assert_eq!(wallet.pubkey().unwrap(), expected);
    assert!(wallet.submitter().is_ok());
    assert!(backend.keypair_wallet_from_base58("not-a-key").is_err());
}

/// What is tested: an identifier that is not a public key is refused on chain before any submission
#[tokio::test]
async fn test_non_key_wallet_is_invalid_on_chain() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);

    let result = backend
        .record_attendance(&Wallet::local("Www"), "s1", true, "")
        .await;

    assert!(matches!(result, Err(ClientError::InvalidInput(_))));
}

/// What is tested: initialize_all_storage submits the four initializers in order
#[tokio::test]
async fn test_initialize_all_storage_submits_four_instructions() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    mock_fees(&server, &[]).await;
    let (submitter, wallet) = recording_wallet(admin_pubkey());

    backend.initialize_all_storage(&wallet).await.unwrap();

    let sent = submitter.sent();
    let names = [
        "initialize_access_storage",
        "initialize_formation_storage",
        "initialize_session_storage",
        "initialize_attendance_storage",
    ];
    assert_eq!(sent.len(), names.len());
    for (batch, name) in sent.iter().zip(names) {
        assert_eq!(batch[0].data, instruction_discriminator(name).to_vec(), "{}", name);
    }
}

// ============================================================================
// COURSES AND ATTENDANCE
// ============================================================================

/// What is tested: formation creation upserts the formation PDA of the new id
#[tokio::test]
async fn test_create_formation_targets_formation_pda() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    mock_fees(&server, &[]).await;
    let (submitter, wallet) = recording_wallet(admin_pubkey());

    let formation = backend
        .create_formation(&wallet, NewFormation::new("Rust 101", "desc"))
        .await
        .unwrap();

    let (expected, _) = backend.deriver().formation(&formation.id).unwrap();
    let (storage, _) = backend.deriver().formation_storage().unwrap();
    let ix = &submitter.sent()[0][0];
    assert_eq!(ix.accounts[1].pubkey, storage);
    assert_eq!(ix.accounts[2].pubkey, expected);
    assert_eq!(&ix.data[..8], &instruction_discriminator("upsert_formation"));
}

/// What is tested: session creation targets the session PDA under the formation PDA
#[tokio::test]
async fn test_create_session_targets_session_pda() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    mock_fees(&server, &[]).await;
    let (submitter, wallet) = recording_wallet(admin_pubkey());

    let session = backend
        .create_session(
            &wallet,
            NewSession {
                formation_id: "1700000000000".to_string(),
                title: "Ownership".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                location: "Paris".to_string(),
            },
        )
        .await
        .expect("Session creation should succeed");

    let deriver = backend.deriver();
    let (formation, _) = deriver.formation("1700000000000").unwrap();
    let (expected, _) = deriver.session(&formation, &session.id).unwrap();
    let (storage, _) = deriver.session_storage().unwrap();
    let sent = submitter.sent();
    assert_eq!(sent.len(), 1);
    let ix = &sent[0][0];
    assert_eq!(ix.accounts[0].pubkey, admin_pubkey());
    assert_eq!(ix.accounts[1].pubkey, storage);
    assert_eq!(ix.accounts[2].pubkey, expected);
    assert_eq!(&ix.data[..8], &instruction_discriminator("create_session"));
    assert_eq!(session.formation_id, "1700000000000");
}

/// What is tested: on-chain listing decodes formations and attaches scanned sessions
/// Why: Formations and sessions live in separate program accounts
#[tokio::test]
async fn test_list_formations_joins_scanned_sessions() {
    init_tracing();
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap().timestamp();
    mock_program_accounts(
        &server,
        &[
            (Pubkey::new_unique(), formation_account("100", "Rust")),
            (Pubkey::new_unique(), formation_account("200", "Solana")),
        ],
    )
    .await;
    mock_program_accounts(
        &server,
        &[
            (Pubkey::new_unique(), session_account("1", "100", start, 90)),
            (Pubkey::new_unique(), session_account("2", "100", start, 60)),
            (Pubkey::new_unique(), session_account("3", "999", start, 30)),
        ],
    )
    .await;

    let formations = backend.list_formations().await.unwrap();
    assert_eq!(formations.len(), 2);
    let rust = formations.iter().find(|f| f.id == "100").unwrap();
    let ids: Vec<&str> = rust.sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(rust.sessions[0].end_time, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
    assert!(formations.iter().find(|f| f.id == "200").unwrap().sessions.is_empty());

    assert_eq!(backend.list_sessions(Some("100")).await.unwrap().len(), 2);
    assert_eq!(backend.list_sessions(None).await.unwrap().len(), 3);
}

/// What is tested: each scan filters on its own account discriminator
/// Why: Without the filter a scan would return every account of the program
#[tokio::test]
async fn test_scan_filters_on_account_discriminator() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    mock_program_accounts(&server, &[(Pubkey::new_unique(), formation_account("100", "Rust"))]).await;

    let sessions = backend.list_sessions(None).await;
    assert!(matches!(sessions, Err(ClientError::OperationFailed { .. })));
    assert!(backend.list_formations().await.is_err());
}

/// What is tested: check-in targets the attendance PDA of the student and session
#[tokio::test]
async fn test_record_attendance_targets_attendance_pda() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    mock_fees(&server, &[]).await;
    let student = Pubkey::new_unique();
    let (submitter, wallet) = recording_wallet(student);

    let attendance = backend
        .record_attendance(&wallet, "session-42", true, "")
        .await
        .unwrap();

    let (expected, _) = backend.deriver().attendance(&student, "session-42").unwrap();
    assert_eq!(attendance.id, expected.to_string());
    let ix = &submitter.sent()[0][0];
    assert_eq!(ix.accounts[0].pubkey, student);
    assert_eq!(ix.accounts[2].pubkey, expected);
}

/// What is tested: check-out updates the existing record and submits update_attendance
#[tokio::test]
async fn test_update_attendance_checks_out_record() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    mock_fees(&server, &[]).await;
    let student = Pubkey::new_unique();
    let (record, _) = backend.deriver().attendance(&student, "s1").unwrap();
    let existing = attendance_account(student, "s1");
    mock_account(&server, &record, &existing).await;
    let (submitter, wallet) = recording_wallet(student);

    let updated = backend
        .update_attendance(&wallet, "s1", false, "left early")
        .await
        .expect("Check-out should succeed");

    assert_eq!(updated.id, existing.id);
    assert!(!updated.is_present);
    assert_eq!(updated.note, "left early");
    assert!(updated.check_out_time.unwrap() >= updated.check_in_time);
    let ix = &submitter.sent()[0][0];
    assert_eq!(ix.accounts[0].pubkey, student);
    assert_eq!(ix.accounts[2].pubkey, record);
    assert_eq!(&ix.data[..8], &instruction_discriminator("update_attendance"));
}

/// What is tested: checking out without an attendance account fails with NotFound and submits nothing
#[tokio::test]
async fn test_update_attendance_without_record_is_not_found() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let student = Pubkey::new_unique();
    let (record, _) = backend.deriver().attendance(&student, "s1").unwrap();
    mock_missing_account(&server, &record).await;
    let (submitter, wallet) = recording_wallet(student);

    let result = backend.update_attendance(&wallet, "s1", true, "").await;

    assert!(matches!(result, Err(ClientError::NotFound { kind: "attendance", .. })));
    assert!(submitter.sent().is_empty());
}

/// What is tested: student history keeps only the decoded records of that student
/// Why: The scan filters by account type only
#[tokio::test]
async fn test_student_attendances_filter_decoded_records() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    mock_program_accounts(
        &server,
        &[
            (Pubkey::new_unique(), attendance_account(alice, "s1")),
            (Pubkey::new_unique(), attendance_account(bob, "s1")),
            (Pubkey::new_unique(), attendance_account(alice, "s2")),
        ],
    )
    .await;

    let history = backend.get_student_attendances(&alice.to_string()).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|a| a.student == alice.to_string()));

    let session = backend.get_attendances(Some("s1")).await.unwrap();
    assert_eq!(session.len(), 2);
}

// ============================================================================
// FEES AND MODE
// ============================================================================

/// What is tested: the fee estimate converts the first sample and falls back to the default
#[tokio::test]
async fn test_fee_estimate_and_fallback() {
    let server = MockServer::start().await;
    mock_fees(&server, &[2_500, 9_000]).await;
    let rpc = SvmRpcClient::new(&server.uri(), std::time::Duration::from_secs(2)).unwrap();
    let fee = FeeEstimator::new(rpc).estimate().await;
    assert!((fee - 0.0000025).abs() < 1e-12);

    let empty = MockServer::start().await;
    mock_fees(&empty, &[]).await;
    let rpc = SvmRpcClient::new(&empty.uri(), std::time::Duration::from_secs(2)).unwrap();
    assert_eq!(FeeEstimator::new(rpc).estimate().await, DEFAULT_FEE_SOL);

    let broken = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;
    let rpc = SvmRpcClient::new(&broken.uri(), std::time::Duration::from_secs(2)).unwrap();
    assert_eq!(FeeEstimator::new(rpc).estimate().await, DEFAULT_FEE_SOL);
}

/// What is tested: the mode switch is read on every call
/// Why: Flipping the flag must reroute the next operation without rebuilding the backend
#[tokio::test]
async fn test_mode_switch_applies_per_call() {
    let server = MockServer::start().await;
    let backend = onchain_backend(&server);
    let (storage, _) = backend.deriver().access_storage().unwrap();
    mock_account(&server, &storage, &storage_account(4)).await;

    assert_eq!(backend.mode(), Mode::OnChain);
    assert_eq!(backend.get_access_storage().await.unwrap().request_count, 4);

    backend.set_use_blockchain(false);
    assert_eq!(backend.mode(), Mode::Local);
    let local = backend.get_access_storage().await.unwrap();
    assert!(local.address.is_none());
    assert_eq!(local.request_count, 0);

    backend.mode_switch().store(true, std::sync::atomic::Ordering::SeqCst);
    assert!(backend.uses_blockchain());
}
