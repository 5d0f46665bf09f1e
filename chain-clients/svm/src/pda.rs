//! Program-derived address (PDA) derivation.
//!
//! Every account family of the program lives under its own seed prefix:
//!
//! | Account | Seeds |
//! |---|---|
//! | access storage | `[access_storage]` |
//! | access request | `[request, storage_pda, index_le_u64]` |
//! | formation storage | `[formation_storage]` |
//! | formation | `[formation, formation_id]` |
//! | session storage | `[session_storage]` |
//! | session | `[session, formation_pda, session_id]` |
//! | attendance storage | `[attendance_storage]` |
//! | attendance | `[attendance, student, session_id]` |
//!
//! Derivation is pure: same seeds and program id always give the same
//! `(address, bump)` pair.

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use thiserror::Error;

/// Errors raised while deriving a program address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PdaError {
    /// No bump in the canonical range yields an off-curve address. Only happens
    /// with misconfigured seeds (e.g. a seed longer than 32 bytes).
    #[error("no viable bump seed for seeds {seeds:?} under program {program_id}")]
    NoViableBump {
        seeds: Vec<String>,
        program_id: Pubkey,
    },
}

/// Derives the canonical program address and bump for `seeds`.
///
/// # Arguments
///
/// * `seeds` - Raw seed byte strings
/// * `program_id` - Owning program
///
/// # Returns
///
/// * `Ok((Pubkey, u8))` - Derived address and its bump
/// * `Err(PdaError)` - No valid bump exists for these seeds
pub fn derive(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), PdaError> {
    Pubkey::try_find_program_address(seeds, program_id).ok_or_else(|| PdaError::NoViableBump {
        seeds: seeds
            .iter()
            .map(|seed| String::from_utf8_lossy(seed).into_owned())
            .collect(),
        program_id: *program_id,
    })
}

/// Encodes a numeric index as a seed (little-endian, 8 bytes).
pub fn index_seed(index: u64) -> [u8; 8] {
    index.to_le_bytes()
}

// ============================================================================
// SEEDS
// ============================================================================

/// Seed prefixes for each account family, as deployed with the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramSeeds {
    pub access_storage: String,
    pub request: String,
    pub formation_storage: String,
    pub formation: String,
    pub session_storage: String,
    pub session: String,
    pub attendance_storage: String,
    pub attendance: String,
}

impl Default for ProgramSeeds {
    fn default() -> Self {
        Self {
            access_storage: "access-storage".to_string(),
            request: "request".to_string(),
            formation_storage: "formation-storage".to_string(),
            formation: "formation".to_string(),
            session_storage: "session-storage".to_string(),
            session: "session".to_string(),
            attendance_storage: "attendance-storage".to_string(),
            attendance: "attendance".to_string(),
        }
    }
}

impl ProgramSeeds {
    /// All seeds with their names, for validation and diagnostics.
    pub fn named(&self) -> [(&'static str, &str); 8] {
        [
            ("access_storage", self.access_storage.as_str()),
            ("request", self.request.as_str()),
            ("formation_storage", self.formation_storage.as_str()),
            ("formation", self.formation.as_str()),
            ("session_storage", self.session_storage.as_str()),
            ("session", self.session.as_str()),
            ("attendance_storage", self.attendance_storage.as_str()),
            ("attendance", self.attendance.as_str()),
        ]
    }
}

// ============================================================================
// DERIVER
// ============================================================================

/// Computes every account address used by the client.
#[derive(Debug, Clone)]
pub struct PdaDeriver {
    program_id: Pubkey,
    seeds: ProgramSeeds,
}

impl PdaDeriver {
    pub fn new(program_id: Pubkey, seeds: ProgramSeeds) -> Self {
        Self { program_id, seeds }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn seeds(&self) -> &ProgramSeeds {
        &self.seeds
    }

    pub fn access_storage(&self) -> Result<(Pubkey, u8), PdaError> {
        derive(&[self.seeds.access_storage.as_bytes()], &self.program_id)
    }

    /// Address of the request stored at `index` under `storage`.
    pub fn access_request(&self, storage: &Pubkey, index: u64) -> Result<(Pubkey, u8), PdaError> {
        derive(
            &[
                self.seeds.request.as_bytes(),
                storage.as_ref(),
                &index_seed(index),
            ],
            &self.program_id,
        )
    }

    pub fn formation_storage(&self) -> Result<(Pubkey, u8), PdaError> {
        derive(&[self.seeds.formation_storage.as_bytes()], &self.program_id)
    }

    pub fn formation(&self, formation_id: &str) -> Result<(Pubkey, u8), PdaError> {
        derive(
            &[self.seeds.formation.as_bytes(), formation_id.as_bytes()],
            &self.program_id,
        )
    }

    pub fn session_storage(&self) -> Result<(Pubkey, u8), PdaError> {
        derive(&[self.seeds.session_storage.as_bytes()], &self.program_id)
    }

    pub fn session(&self, formation: &Pubkey, session_id: &str) -> Result<(Pubkey, u8), PdaError> {
        derive(
            &[
                self.seeds.session.as_bytes(),
                formation.as_ref(),
                session_id.as_bytes(),
            ],
            &self.program_id,
        )
    }

    pub fn attendance_storage(&self) -> Result<(Pubkey, u8), PdaError> {
        derive(&[self.seeds.attendance_storage.as_bytes()], &self.program_id)
    }

    pub fn attendance(&self, student: &Pubkey, session_id: &str) -> Result<(Pubkey, u8), PdaError> {
        derive(
            &[
                self.seeds.attendance.as_bytes(),
                student.as_ref(),
                session_id.as_bytes(),
            ],
            &self.program_id,
        )
    }

    /// Cursor over the request slots `0..request_count` of `storage`.
    pub fn request_slots(&self, storage: Pubkey, request_count: u64) -> RequestSlots {
        RequestSlots {
            deriver: self.clone(),
            storage,
            next: 0,
            end: request_count,
        }
    }
}

// ============================================================================
// REQUEST SLOT CURSOR
// ============================================================================

/// Lazy sequence of candidate request addresses. Clone it to restart a scan.
///
/// Produces one `(index, result)` per slot and stops at the storage's
/// request count. A slot whose derivation fails is yielded as an error so the
/// caller can skip it without aborting the scan.
#[derive(Debug, Clone)]
pub struct RequestSlots {
    deriver: PdaDeriver,
    storage: Pubkey,
    next: u64,
    end: u64,
}

impl Iterator for RequestSlots {
    type Item = (u64, Result<Pubkey, PdaError>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let address = self
            .deriver
            .access_request(&self.storage, index)
            .map(|(address, _)| address);
        Some((index, address))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.end - self.next).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}
