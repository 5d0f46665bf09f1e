//! Anchor discriminators.
//!
//! Anchor prefixes instruction data with `SHA-256("global:<ix_name>")[..8]`
//! and account data with `SHA-256("account:<TypeName>")[..8]`.

use sha2::{Digest, Sha256};

/// Length of every Anchor discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Discriminator of the instruction named `ix_name` (snake_case).
pub fn instruction_discriminator(ix_name: &str) -> [u8; DISCRIMINATOR_LEN] {
    hash_prefix(&format!("global:{}", ix_name))
}

/// Discriminator of the account type named `type_name` (CamelCase).
pub fn account_discriminator(type_name: &str) -> [u8; DISCRIMINATOR_LEN] {
    hash_prefix(&format!("account:{}", type_name))
}

fn hash_prefix(preimage: &str) -> [u8; DISCRIMINATOR_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(preimage.as_bytes());
    let hash = hasher.finalize();
    let mut disc = [0u8; DISCRIMINATOR_LEN];
    disc.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    disc
}
