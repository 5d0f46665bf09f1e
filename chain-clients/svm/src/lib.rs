//! Solana SVM client library for the AlyraSign program.
//!
//! The on-chain program is an external collaborator with a fixed instruction
//! surface. This crate knows how to address its accounts ([`pda`]), encode
//! its instructions ([`instructions`]), decode its accounts ([`accounts`]) and
//! read chain state over JSON-RPC ([`rpc`]).

pub mod accounts;
pub mod anchor;
pub mod instructions;
pub mod pda;
pub mod rpc;

pub use accounts::{
    AccessRequestAccount, AccessRequestStorage, AccountDecodeError, AnchorAccount, AttendanceAccount,
    FormationAccount, RequestStatus, SessionAccount,
};
pub use pda::{PdaDeriver, PdaError, ProgramSeeds, RequestSlots};
pub use rpc::{PrioritizationFeeSample, ProgramAccountFilter, SvmRpcClient};

pub use solana_program::instruction::{AccountMeta, Instruction};
pub use solana_program::pubkey::Pubkey;
