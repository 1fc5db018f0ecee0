//! Ordered account lists and payloads, one builder per vault instruction.
//!
//! The program reads accounts by position, so a builder either produces the
//! complete list or fails. Builders are pure: every address they need is either
//! derived here or handed in by the caller.

pub mod cancel_withdraw_request;
pub mod deposit;
pub mod initialize_drift;
pub mod initialize_vault;
pub mod initialize_vault_depositor;
pub mod initialize_vault_with_drift;
pub mod manager_collect_fees;
pub mod manager_deposit;
pub mod manager_withdraw;
pub mod request_withdraw;
pub mod reset_delegate;
pub mod update_delegate;
pub mod update_vault;
pub mod withdraw;

pub use cancel_withdraw_request::*;
pub use deposit::*;
pub use initialize_drift::*;
pub use initialize_vault::*;
pub use initialize_vault_depositor::*;
pub use initialize_vault_with_drift::*;
pub use manager_collect_fees::*;
pub use manager_deposit::*;
pub use manager_withdraw::*;
pub use request_withdraw::*;
pub use reset_delegate::*;
pub use update_delegate::*;
pub use update_vault::*;
pub use withdraw::*;

use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use tracing::{debug, info};

use crate::{
    drift,
    error::Result,
    instruction::{InstructionKind, SchemaVersion},
    state::{Treasury, Vault},
};

/// Programs a builder targets, and the vault schema they speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub vault_program: Pubkey,
    pub drift_program: Pubkey,
    pub schema: SchemaVersion,
}

/// Drift spot market accounts for one market index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotMarketAccounts {
    pub market_index: u16,
    pub spot_market: Pubkey,
    pub spot_market_vault: Pubkey,
    pub oracle: Pubkey,
    pub mint: Pubkey,
}

/// Addresses owned by one vault, in the vault program and in Drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultAccounts {
    pub vault: Pubkey,
    pub treasury: Pubkey,
    pub drift_user: Pubkey,
    pub drift_user_stats: Pubkey,
    pub drift_state: Pubkey,
}

impl VaultAccounts {
    pub fn resolve(ids: &ProgramIds, name: &str) -> Result<Self> {
        let (vault, _) = Vault::get_pda(name, &ids.vault_program, ids.schema)?;
        let (treasury, _) = Treasury::get_pda(name, &ids.vault_program)?;
        let (drift_user, drift_user_stats) = drift::vault_user(&ids.drift_program, &vault)?;
        let drift_state = drift::state_address(&ids.drift_program)?;

        debug!(
            %vault,
            %treasury,
            %drift_user,
            %drift_user_stats,
            %drift_state,
            "resolved vault accounts"
        );

        Ok(Self {
            vault,
            treasury,
            drift_user,
            drift_user_stats,
            drift_state,
        })
    }
}

/// drift program, user, user stats, state
fn drift_user_metas(ids: &ProgramIds, accounts: &VaultAccounts) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new_readonly(ids.drift_program, false),
        AccountMeta::new(accounts.drift_user, false),
        AccountMeta::new(accounts.drift_user_stats, false),
        AccountMeta::new(accounts.drift_state, false),
    ]
}

/// The user metas followed by spot market vault, oracle, spot market and,
/// for outgoing transfers, the drift signer.
fn drift_market_metas(
    ids: &ProgramIds,
    accounts: &VaultAccounts,
    market: &SpotMarketAccounts,
    with_signer: bool,
) -> Result<Vec<AccountMeta>> {
    let mut metas = drift_user_metas(ids, accounts);
    metas.push(AccountMeta::new(market.spot_market_vault, false));
    metas.push(AccountMeta::new(market.oracle, false));
    metas.push(AccountMeta::new(market.spot_market, false));
    if with_signer {
        metas.push(AccountMeta::new(drift::signer_address(&ids.drift_program)?, false));
    }
    Ok(metas)
}

/// Fails when the program `ids` targets has no `kind` instruction.
pub(crate) fn check_schema(ids: &ProgramIds, kind: InstructionKind) -> Result<()> {
    kind.tag(ids.schema).map(|_| ())
}

fn vault_instruction(
    ids: &ProgramIds,
    label: &'static str,
    data: Vec<u8>,
    accounts: Vec<AccountMeta>,
) -> Instruction {
    info!(instruction = label, accounts = accounts.len(), "built vault instruction");
    Instruction {
        program_id: ids.vault_program,
        accounts,
        data,
    }
}
