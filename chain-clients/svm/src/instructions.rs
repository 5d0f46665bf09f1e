//! Instruction builders for the AlyraSign program.
//!
//! Instruction data is the Anchor discriminator of the instruction name
//! followed by the Borsh-encoded arguments. Account order matches the
//! program's account contexts.

use anyhow::{Context, Result};
use borsh::BorshSerialize;
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;
use solana_sdk_ids::{system_program, sysvar};

use crate::anchor::instruction_discriminator;

// ============================================================================
// ARGUMENTS
// ============================================================================

#[derive(BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateAccessRequestArgs {
    pub role: String,
    pub message: String,
}

#[derive(BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct UpsertFormationArgs {
    pub formation_id: String,
    pub title: String,
    pub description: String,
}

#[derive(BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionArgs {
    pub session_id: String,
    pub formation_id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub location: String,
}

#[derive(BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct RecordAttendanceArgs {
    pub session_id: String,
    pub is_present: bool,
    pub note: String,
}

#[derive(BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct UpdateAttendanceArgs {
    pub is_present: bool,
    pub note: String,
}

fn encode<T: BorshSerialize>(name: &str, args: &T) -> Result<Vec<u8>> {
    let mut data = instruction_discriminator(name).to_vec();
    args.serialize(&mut data)
        .with_context(|| format!("Failed to serialize {} arguments", name))?;
    Ok(data)
}

fn bare(name: &str) -> Vec<u8> {
    instruction_discriminator(name).to_vec()
}

// ============================================================================
// ACCESS REQUESTS
// ============================================================================

/// Accounts: admin (signer, writable), storage (writable), system program.
pub fn initialize_access_storage(program_id: &Pubkey, admin: &Pubkey, storage: &Pubkey) -> Instruction {
    initialize_storage("initialize_access_storage", program_id, admin, storage)
}

/// Builds `create_access_request`.
///
/// # Arguments
///
/// * `program_id` - AlyraSign program
/// * `requester` - Wallet paying for and owning the request
/// * `storage` - Access storage PDA
/// * `request` - Request PDA at the storage's current request count
/// * `args` - Role label and message
pub fn create_access_request(
    program_id: &Pubkey,
    requester: &Pubkey,
    storage: &Pubkey,
    request: &Pubkey,
    args: &CreateAccessRequestArgs,
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*requester, true),
            AccountMeta::new(*storage, false),
            AccountMeta::new(*request, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: encode("create_access_request", args)?,
    })
}

/// Builds `approve_access_request`. The admin must match the storage admin.
pub fn approve_access_request(
    program_id: &Pubkey,
    storage: &Pubkey,
    admin: &Pubkey,
    request: &Pubkey,
) -> Instruction {
    process_access_request("approve_access_request", program_id, storage, admin, request)
}

/// Builds `reject_access_request`.
pub fn reject_access_request(
    program_id: &Pubkey,
    storage: &Pubkey,
    admin: &Pubkey,
    request: &Pubkey,
) -> Instruction {
    process_access_request("reject_access_request", program_id, storage, admin, request)
}

fn process_access_request(
    name: &str,
    program_id: &Pubkey,
    storage: &Pubkey,
    admin: &Pubkey,
    request: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*storage, false),
            AccountMeta::new(*admin, true),
            AccountMeta::new(*request, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: bare(name),
    }
}

// ============================================================================
// FORMATIONS AND SESSIONS
// ============================================================================

pub fn initialize_formation_storage(program_id: &Pubkey, admin: &Pubkey, storage: &Pubkey) -> Instruction {
    initialize_storage("initialize_formation_storage", program_id, admin, storage)
}

pub fn upsert_formation(
    program_id: &Pubkey,
    signer: &Pubkey,
    storage: &Pubkey,
    formation: &Pubkey,
    args: &UpsertFormationArgs,
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: with_rent(signer, storage, formation),
        data: encode("upsert_formation", args)?,
    })
}

pub fn initialize_session_storage(program_id: &Pubkey, admin: &Pubkey, storage: &Pubkey) -> Instruction {
    initialize_storage("initialize_session_storage", program_id, admin, storage)
}

pub fn create_session(
    program_id: &Pubkey,
    signer: &Pubkey,
    storage: &Pubkey,
    session: &Pubkey,
    args: &CreateSessionArgs,
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: with_rent(signer, storage, session),
        data: encode("create_session", args)?,
    })
}

fn with_rent(signer: &Pubkey, storage: &Pubkey, target: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*signer, true),
        AccountMeta::new(*storage, false),
        AccountMeta::new(*target, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ]
}

// ============================================================================
// ATTENDANCE
// ============================================================================

pub fn initialize_attendance_storage(program_id: &Pubkey, admin: &Pubkey, storage: &Pubkey) -> Instruction {
    initialize_storage("initialize_attendance_storage", program_id, admin, storage)
}

/// Builds `record_attendance`. The student signs and pays for the record.
pub fn record_attendance(
    program_id: &Pubkey,
    student: &Pubkey,
    storage: &Pubkey,
    attendance: &Pubkey,
    args: &RecordAttendanceArgs,
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*student, true),
            AccountMeta::new(*storage, false),
            AccountMeta::new(*attendance, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: encode("record_attendance", args)?,
    })
}

/// Builds `update_attendance` (check-out) on an existing record.
pub fn update_attendance(
    program_id: &Pubkey,
    student: &Pubkey,
    storage: &Pubkey,
    attendance: &Pubkey,
    args: &UpdateAttendanceArgs,
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*student, true),
            AccountMeta::new_readonly(*storage, false),
            AccountMeta::new(*attendance, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: encode("update_attendance", args)?,
    })
}

fn initialize_storage(name: &str, program_id: &Pubkey, admin: &Pubkey, storage: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*admin, true),
            AccountMeta::new(*storage, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: bare(name),
    }
}
