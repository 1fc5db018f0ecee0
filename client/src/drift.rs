//! Address scheme of the integrated lending protocol (Drift).
//!
//! The vault account is the authority of a Drift user; every Drift account the
//! vault touches lives in Drift's own namespace and is derived here.

use solana_program::{pubkey, pubkey::Pubkey};

use crate::{error::Result, pda::derive};

pub const DRIFT_PROGRAM_ID: Pubkey = pubkey!("dRiftyHA39MWEi3m9aunc5MzRF1JYuBsbn6VPcn33UH");

pub const STATE_SEED: &[u8] = b"drift_state";
pub const USER_SEED: &[u8] = b"user";
pub const USER_STATS_SEED: &[u8] = b"user_stats";
pub const SPOT_MARKET_SEED: &[u8] = b"spot_market";
pub const SPOT_MARKET_VAULT_SEED: &[u8] = b"spot_market_vault";
pub const SIGNER_SEED: &[u8] = b"drift_signer";

pub fn state_address(drift_program: &Pubkey) -> Result<Pubkey> {
    Ok(derive(drift_program, &[STATE_SEED])?.0)
}

pub fn signer_address(drift_program: &Pubkey) -> Result<Pubkey> {
    Ok(derive(drift_program, &[SIGNER_SEED])?.0)
}

pub fn user_address(drift_program: &Pubkey, authority: &Pubkey, sub_account_id: u16) -> Result<Pubkey> {
    Ok(derive(
        drift_program,
        &[USER_SEED, authority.as_ref(), &sub_account_id.to_le_bytes()],
    )?
    .0)
}

pub fn user_stats_address(drift_program: &Pubkey, authority: &Pubkey) -> Result<Pubkey> {
    Ok(derive(drift_program, &[USER_STATS_SEED, authority.as_ref()])?.0)
}

pub fn spot_market_address(drift_program: &Pubkey, market_index: u16) -> Result<Pubkey> {
    Ok(derive(drift_program, &[SPOT_MARKET_SEED, &market_index.to_le_bytes()])?.0)
}

pub fn spot_market_vault_address(drift_program: &Pubkey, market_index: u16) -> Result<Pubkey> {
    Ok(derive(
        drift_program,
        &[SPOT_MARKET_VAULT_SEED, &market_index.to_le_bytes()],
    )?
    .0)
}

/// The Drift user and user-stats accounts owned by `vault`, sub account 0.
pub fn vault_user(drift_program: &Pubkey, vault: &Pubkey) -> Result<(Pubkey, Pubkey)> {
    Ok((
        user_address(drift_program, vault, 0)?,
        user_stats_address(drift_program, vault)?,
    ))
}
