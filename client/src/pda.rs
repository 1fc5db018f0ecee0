//! Program address derivation.
//!
//! Every seed that comes from a user supplied string goes through
//! [`truncate_name`] first. The on-chain program derives from the string it
//! finds in the instruction payload, so the payload and the seeds must carry
//! the same truncated bytes or the addresses disagree.

use solana_program::pubkey::{Pubkey, MAX_SEEDS, MAX_SEED_LEN};

use crate::{
    constants::MAX_NAME_LEN,
    error::{Result, VaultClientError},
    validate,
};

/// Canonical program address and bump for `seeds` under `program_id`.
pub fn derive(program_id: &Pubkey, seeds: &[&[u8]]) -> Result<(Pubkey, u8)> {
    validate!(
        seeds.len() < MAX_SEEDS,
        VaultClientError::InvalidConfig(format!("too many seeds: {}", seeds.len()))
    )?;
    for seed in seeds {
        validate!(
            seed.len() <= MAX_SEED_LEN,
            VaultClientError::InvalidConfig(format!(
                "seed of {} bytes exceeds {} byte limit",
                seed.len(),
                MAX_SEED_LEN
            ))
        )?;
    }

    Pubkey::try_find_program_address(seeds, program_id).ok_or(VaultClientError::DerivationExhausted)
}

/// Longest prefix of `name` that fits in [`MAX_NAME_LEN`] bytes without
/// splitting a character. Names sharing those bytes collide.
pub fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
