//! Account layouts of the AlyraSign program.
//!
//! Accounts are Borsh-encoded behind an 8-byte Anchor discriminator. The
//! program sizes some accounts without room for the trailing bump, so a
//! missing bump decodes as `0`, and trailing padding is ignored.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;
use thiserror::Error;

use crate::anchor::{account_discriminator, DISCRIMINATOR_LEN};

#[derive(Debug, Error)]
pub enum AccountDecodeError {
    #[error("account data too short: {len} bytes")]
    TooShort { len: usize },

    #[error("account discriminator does not match {expected}")]
    DiscriminatorMismatch { expected: &'static str },

    #[error("invalid {account} layout: {source}")]
    Layout {
        account: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Implemented by every account type of the program.
pub trait AnchorAccount: BorshDeserialize + BorshSerialize {
    /// Anchor type name used for the discriminator.
    const NAME: &'static str;

    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(Self::NAME)
    }

    /// Decodes raw account data, checking the discriminator first.
    fn decode(data: &[u8]) -> Result<Self, AccountDecodeError> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(AccountDecodeError::TooShort { len: data.len() });
        }
        let (disc, body) = data.split_at(DISCRIMINATOR_LEN);
        if disc != Self::discriminator() {
            return Err(AccountDecodeError::DiscriminatorMismatch {
                expected: Self::NAME,
            });
        }

        let mut padded = Vec::with_capacity(body.len() + 1);
        padded.extend_from_slice(body);
        padded.push(0);
        let mut cursor = padded.as_slice();
        Self::deserialize(&mut cursor).map_err(|source| AccountDecodeError::Layout {
            account: Self::NAME,
            source,
        })
    }

    /// Encodes the account the way the program stores it.
    fn encode(&self) -> std::io::Result<Vec<u8>> {
        let mut data = Self::discriminator().to_vec();
        self.serialize(&mut data)?;
        Ok(data)
    }
}

// ============================================================================
// ACCESS REQUESTS
// ============================================================================

/// On-chain request status.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Admin authority plus the counter indexing request accounts.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessRequestStorage {
    pub admin: Pubkey,
    pub request_count: u64,
    pub bump: u8,
}

impl AnchorAccount for AccessRequestStorage {
    const NAME: &'static str = "AccessRequestStorage";
}

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessRequestAccount {
    pub requester: Pubkey,
    pub role: String,
    pub message: String,
    pub status: RequestStatus,
    pub created_at: i64,
    pub bump: u8,
}

impl AnchorAccount for AccessRequestAccount {
    const NAME: &'static str = "AccessRequest";
}

// ============================================================================
// FORMATIONS, SESSIONS, ATTENDANCE
// ============================================================================

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct FormationAccount {
    pub id: String,
    pub title: String,
    pub description: String,
    pub creator: Pubkey,
    pub start_date: i64,
    pub end_date: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub bump: u8,
}

impl AnchorAccount for FormationAccount {
    const NAME: &'static str = "Formation";
}

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionAccount {
    pub id: String,
    pub formation_id: String,
    pub title: String,
    pub description: String,
    pub trainer: Pubkey,
    pub date: i64,
    /// Minutes
    pub duration: u64,
    pub location: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub bump: u8,
}

impl AnchorAccount for SessionAccount {
    const NAME: &'static str = "Session";
}

#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct AttendanceAccount {
    pub id: String,
    pub session_id: String,
    pub student: Pubkey,
    pub is_present: bool,
    pub check_in_time: i64,
    pub check_out_time: Option<i64>,
    pub note: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub bump: u8,
}

impl AnchorAccount for AttendanceAccount {
    const NAME: &'static str = "Attendance";
}
