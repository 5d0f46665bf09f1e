//! Access-request lifecycle in local mode
//!
//! These tests drive the backend over an in-memory store and check the
//! pending / processed collections after every transition.

use alyrasign::{ClientError, RequestStatus, Role, Wallet};
use chain_clients_svm::Pubkey;

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{init_tracing, local_backend, ADMIN_ADDRESS};

fn wallet() -> Wallet {
    Wallet::read_only(Pubkey::new_unique())
}

/// What is tested: a created request lands in the pending collection and is listed for its wallet
/// Why: Creation followed by a filtered listing must return exactly the new request
#[tokio::test]
async fn test_create_then_list_by_wallet() {
    init_tracing();
    let backend = local_backend();
    let requester = wallet();
    let other = wallet();

    let created = backend
        .create_access_request(&requester, Role::Student, "hi")
        .await
        .expect("Creation should succeed");
    backend
        .create_access_request(&other, Role::Trainer, "")
        .await
        .expect("Creation should succeed");

    assert_eq!(created.status, RequestStatus::Pending);
    assert_eq!(created.wallet_address, requester.address().to_string());
    assert!(created.processed_at.is_none());

    let collections = backend.store().requests().unwrap();
    assert_eq!(collections.pending.len(), 2);
    assert!(collections.processed.is_empty());

    let listed = backend
        .get_access_requests(Some(&requester.address().to_string()))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[0].requested_role, Role::Student);
    assert_eq!(listed[0].message, "hi");
}

/// What is tested: approval moves the request from pending to processed with a processing time
/// Why: An approved request must never be found back in the pending collection
#[tokio::test]
async fn test_approve_moves_request_to_processed() {
    init_tracing();
    let backend = local_backend();
    let admin = wallet();
    let created = backend
        .create_access_request(&wallet(), Role::Student, "hi")
        .await
        .unwrap();

    let approved = backend
        .approve_access_request(&admin, &created.id)
        .await
        .expect("Approval should succeed");

    assert_eq!(approved.status, RequestStatus::Approved);
    let processed_at = approved.processed_at.expect("processed_at should be set");
    assert!(processed_at >= approved.created_at);

    let collections = backend.store().requests().unwrap();
    assert!(collections.pending.is_empty());
    assert_eq!(collections.processed[&created.id].status, RequestStatus::Approved);
}

/// What is tested: rejecting an unknown id fails with NotFound and changes nothing
/// Why: A failed transition must leave both collections untouched
#[tokio::test]
async fn test_reject_unknown_request_is_not_found() {
    let backend = local_backend();
    backend
        .create_access_request(&wallet(), Role::Student, "hi")
        .await
        .unwrap();
    let before = backend.store().requests().unwrap();

    let result = backend.reject_access_request(&wallet(), "does-not-exist").await;

    assert!(matches!(result, Err(ClientError::NotFound { .. })));
    assert_eq!(backend.store().requests().unwrap(), before);
}

/// What is tested: a processed request cannot be approved or rejected a second time
/// Why: Status only moves forward from pending
#[tokio::test]
async fn test_processed_request_cannot_be_processed_again() {
    let backend = local_backend();
    let admin = wallet();
    let created = backend
        .create_access_request(&wallet(), Role::Trainer, "")
        .await
        .unwrap();
    backend.reject_access_request(&admin, &created.id).await.unwrap();

    let again = backend.approve_access_request(&admin, &created.id).await;
    assert!(matches!(again, Err(ClientError::NotFound { .. })));

    let collections = backend.store().requests().unwrap();
    assert_eq!(collections.processed[&created.id].status, RequestStatus::Rejected);
}

/// What is tested: revoking an approved request rejects it and clears the matching session cache
/// Why: The revoked wallet must not keep its cached role on the next connection
#[tokio::test]
async fn test_revoke_clears_matching_session_cache() {
    init_tracing();
    let backend = local_backend();
    let requester = wallet();
    let address = requester.address().to_string();
    let created = backend
        .create_access_request(&requester, Role::Student, "hi")
        .await
        .unwrap();
    backend.approve_access_request(&wallet(), &created.id).await.unwrap();

    backend.store().remember_connection(&address, Role::Student).unwrap();
    backend.store().set_on_dashboard(true).unwrap();

    let revoked = backend.revoke_access(&created.id).await.expect("Revoke should succeed");

    assert_eq!(revoked.status, RequestStatus::Rejected);
    assert!(backend.store().last_connected_wallet().unwrap().is_none());
    assert!(backend.store().last_connected_role().unwrap().is_none());
    assert!(!backend.store().on_dashboard().unwrap());
}

/// What is tested: revoking a request of another wallet keeps the session cache
#[tokio::test]
async fn test_revoke_keeps_cache_of_other_wallet() {
    let backend = local_backend();
    let created = backend
        .create_access_request(&wallet(), Role::Student, "")
        .await
        .unwrap();
    backend.approve_access_request(&wallet(), &created.id).await.unwrap();
    backend.store().remember_connection("SomeoneElse", Role::Trainer).unwrap();

    backend.revoke_access(&created.id).await.unwrap();

    assert_eq!(
        backend.store().last_connected_wallet().unwrap().as_deref(),
        Some("SomeoneElse")
    );
}

/// What is tested: revoking a pending request fails with NotFound
/// Why: Only processed requests can be revoked
#[tokio::test]
async fn test_revoke_pending_request_is_not_found() {
    let backend = local_backend();
    let created = backend
        .create_access_request(&wallet(), Role::Student, "")
        .await
        .unwrap();

    let result = backend.revoke_access(&created.id).await;
    assert!(matches!(result, Err(ClientError::NotFound { .. })));
}

/// What is tested: a wallet can file several pending requests
/// Why: Creation performs no duplicate check
#[tokio::test]
async fn test_duplicate_requests_are_allowed() {
    let backend = local_backend();
    let requester = wallet();

    let first = backend
        .create_access_request(&requester, Role::Student, "one")
        .await
        .unwrap();
    let second = backend
        .create_access_request(&requester, Role::Student, "two")
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    let listed = backend
        .get_access_requests(Some(&requester.address().to_string()))
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
}

/// What is tested: a message longer than the configured limit is refused before any write
#[tokio::test]
async fn test_message_too_long_is_rejected() {
    let backend = local_backend();
    let message = "x".repeat(101);

    let result = backend
        .create_access_request(&wallet(), Role::Student, &message)
        .await;

    match result {
        Err(ClientError::FieldTooLong { field, max, actual }) => {
            assert_eq!(field, "message");
            assert_eq!(max, 100);
            assert_eq!(actual, 101);
        }
        other => panic!("Expected FieldTooLong, got {:?}", other),
    }
    assert!(backend.store().requests().unwrap().pending.is_empty());
}

/// What is tested: listing twice without a mutation returns the same requests
#[tokio::test]
async fn test_listing_is_idempotent() {
    let backend = local_backend();
    for role in [Role::Student, Role::Trainer, Role::Student] {
        backend.create_access_request(&wallet(), role, "").await.unwrap();
    }
    let first = backend.get_access_requests(None).await.unwrap();
    let second = backend.get_access_requests(None).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

/// What is tested: check_user_role ignores pending requests and matches approved ones per role
#[tokio::test]
async fn test_check_user_role_requires_processing() {
    let backend = local_backend();
    let requester = wallet();
    let address = requester.address().to_string();
    let created = backend
        .create_access_request(&requester, Role::Trainer, "")
        .await
        .unwrap();

    assert!(!backend.check_user_role(&address, Role::Trainer).await.unwrap());

    backend.approve_access_request(&wallet(), &created.id).await.unwrap();
    assert!(backend.check_user_role(&address, Role::Trainer).await.unwrap());
    assert!(!backend.check_user_role(&address, Role::Student).await.unwrap());
}

/// What is tested: a rejected request also counts as processed for check_user_role
/// Why: The check reports whether a request of that role was handled, not whether it was granted
#[tokio::test]
async fn test_check_user_role_counts_rejected_request() {
    let backend = local_backend();
    let requester = wallet();
    let address = requester.address().to_string();
    let created = backend
        .create_access_request(&requester, Role::Student, "")
        .await
        .unwrap();

    backend.reject_access_request(&wallet(), &created.id).await.unwrap();

    assert!(backend.check_user_role(&address, Role::Student).await.unwrap());
    assert!(!backend.check_user_role(&address, Role::Trainer).await.unwrap());
}

/// What is tested: local mode accepts a wallet identifier that is not a public key
#[tokio::test]
async fn test_local_wallet_identifier() {
    let backend = local_backend();
    let requester = Wallet::local("Www");

    let created = backend
        .create_access_request(&requester, Role::Student, "hi")
        .await
        .expect("Creation should succeed");

    assert_eq!(created.wallet_address, "Www");
    let listed = backend.get_access_requests(Some("Www")).await.unwrap();
    assert_eq!(listed, vec![created]);
}

/// What is tested: local storage info reports the configured admin and the number of requests
#[tokio::test]
async fn test_local_access_storage_info() {
    let backend = local_backend();
    let created = backend
        .create_access_request(&wallet(), Role::Student, "")
        .await
        .unwrap();
    backend.create_access_request(&wallet(), Role::Student, "").await.unwrap();
    backend.approve_access_request(&wallet(), &created.id).await.unwrap();

    let info = backend.get_access_storage().await.unwrap();
    assert!(info.address.is_none());
    assert_eq!(info.admin, ADMIN_ADDRESS);
    assert_eq!(info.request_count, 2);
}

/// What is tested: initialize_all_storage succeeds in local mode and keeps existing requests
/// Why: Initialization must be safe to run on a store that already holds data
#[tokio::test]
async fn test_initialize_all_storage_keeps_data() {
    let backend = local_backend();
    backend.create_access_request(&wallet(), Role::Student, "").await.unwrap();

    backend
        .initialize_all_storage(&wallet())
        .await
        .expect("Local initialization should succeed");

    assert_eq!(backend.store().requests().unwrap().pending.len(), 1);
    assert!(backend.store().formations().unwrap().is_empty());
    assert!(backend.store().attendances().unwrap().is_empty());
}
