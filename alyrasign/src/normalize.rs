//! Converts program accounts and stored JSON records into domain types.

use chain_clients_svm::{
    AccessRequestAccount, AttendanceAccount, FormationAccount, Pubkey,
    RequestStatus as AccountStatus, SessionAccount,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::types::{AccessRequest, Attendance, Formation, RequestStatus, Role, Session};

/// Unix seconds to UTC. Out-of-range values map to the epoch.
pub fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Unix seconds to a calendar date. `0` means "not set".
fn optional_date(secs: i64) -> Option<NaiveDate> {
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

fn status(status: AccountStatus) -> RequestStatus {
    match status {
        AccountStatus::Pending => RequestStatus::Pending,
        AccountStatus::Approved => RequestStatus::Approved,
        AccountStatus::Rejected => RequestStatus::Rejected,
    }
}

/// Builds an [`AccessRequest`] from the request account at `address`.
///
/// The request account stores no processing time, so `processed_at` is
/// always `None` here, including for approved and rejected requests. Only the
/// request returned by an on-chain approve or reject call carries one.
///
/// # Returns
///
/// * `Some(AccessRequest)` - The account carries a known role
/// * `None` - Unknown role label; the slot is skipped
pub fn request_from_account(address: &Pubkey, account: &AccessRequestAccount) -> Option<AccessRequest> {
    let role = match account.role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => {
            warn!("Skipping request {}: {}", address, e);
            return None;
        }
    };
    Some(AccessRequest {
        id: address.to_string(),
        wallet_address: account.requester.to_string(),
        requested_role: role,
        message: account.message.clone(),
        status: status(account.status),
        created_at: from_unix(account.created_at),
        processed_at: None,
    })
}

pub fn formation_from_account(account: &FormationAccount) -> Formation {
    Formation {
        id: account.id.clone(),
        title: account.title.clone(),
        description: account.description.clone(),
        start_date: optional_date(account.start_date),
        end_date: optional_date(account.end_date),
        created_at: from_unix(account.created_at),
        sessions: Vec::new(),
    }
}

/// The program stores a start instant and a duration in minutes; the
/// domain shape splits it into date, start time and end time.
pub fn session_from_account(account: &SessionAccount) -> Session {
    let start = from_unix(account.date);
    let minutes = i64::try_from(account.duration).unwrap_or(i64::MAX);
    let end = start
        .checked_add_signed(Duration::try_minutes(minutes).unwrap_or_else(Duration::zero))
        .unwrap_or(start);
    Session {
        id: account.id.clone(),
        formation_id: account.formation_id.clone(),
        title: account.title.clone(),
        date: start.date_naive(),
        start_time: start.time(),
        end_time: end.time(),
        location: account.location.clone(),
        created_at: from_unix(account.created_at),
    }
}

pub fn attendance_from_account(account: &AttendanceAccount) -> Attendance {
    Attendance {
        id: account.id.clone(),
        session_id: account.session_id.clone(),
        student: account.student.to_string(),
        is_present: account.is_present,
        check_in_time: from_unix(account.check_in_time),
        check_out_time: account.check_out_time.map(from_unix),
        note: account.note.clone(),
        created_at: from_unix(account.created_at),
        updated_at: from_unix(account.updated_at),
    }
}

/// Parses one stored record, skipping it with a warning when malformed.
pub fn local_record<T: DeserializeOwned>(key: &str, value: serde_json::Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping malformed record in '{}': {}", key, e);
            None
        }
    }
}
