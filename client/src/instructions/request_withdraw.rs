use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use super::{check_schema, vault_instruction, ProgramIds, SpotMarketAccounts, VaultAccounts};
use crate::{
    error::Result,
    instruction::{InstructionKind, VaultInstruction},
    state::VaultDepositor,
};

/// Starts the redeem period for `amount` of the depositor's shares.
pub fn request_withdraw(
    ids: &ProgramIds,
    market: &SpotMarketAccounts,
    authority: &Pubkey,
    name: &str,
    amount: u64,
) -> Result<Instruction> {
    check_schema(ids, InstructionKind::RequestWithdraw)?;
    let metas = withdraw_request_metas(ids, market, authority, name)?;
    let data = VaultInstruction::RequestWithdraw { amount }.pack()?;
    Ok(vault_instruction(ids, "request_withdraw", data, metas))
}

/// vault, depositor, authority, drift user, user stats, state, oracle, spot market
pub(crate) fn withdraw_request_metas(
    ids: &ProgramIds,
    market: &SpotMarketAccounts,
    authority: &Pubkey,
    name: &str,
) -> Result<Vec<AccountMeta>> {
    let accounts = VaultAccounts::resolve(ids, name)?;
    let (depositor, _) = VaultDepositor::get_pda(&accounts.vault, authority, &ids.vault_program)?;
    Ok(vec![
        AccountMeta::new(accounts.vault, false),
        AccountMeta::new(depositor, false),
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new_readonly(accounts.drift_user, false),
        AccountMeta::new_readonly(accounts.drift_user_stats, false),
        AccountMeta::new_readonly(accounts.drift_state, false),
        AccountMeta::new_readonly(market.oracle, false),
        AccountMeta::new_readonly(market.spot_market, false),
    ])
}
