use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use super::{
    check_schema, drift_market_metas, vault_instruction, ProgramIds, SpotMarketAccounts,
    VaultAccounts,
};
use crate::{
    error::Result,
    instruction::{InstructionKind, VaultInstruction},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerTransferArgs {
    pub name: String,
    pub amount: u64,
    pub manager: Pubkey,
    pub manager_token_account: Pubkey,
    pub vault_token_account: Pubkey,
}

/// manager, vault, drift market accounts, manager token, vault token, mint, token program
pub(crate) fn manager_metas(
    ids: &ProgramIds,
    market: &SpotMarketAccounts,
    args: &ManagerTransferArgs,
    with_signer: bool,
) -> Result<Vec<AccountMeta>> {
    let accounts = VaultAccounts::resolve(ids, &args.name)?;
    let mut metas = vec![
        AccountMeta::new(args.manager, true),
        AccountMeta::new(accounts.vault, false),
    ];
    metas.extend(drift_market_metas(ids, &accounts, market, with_signer)?);
    metas.extend([
        AccountMeta::new(args.manager_token_account, false),
        AccountMeta::new(args.vault_token_account, false),
        AccountMeta::new(market.mint, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ]);
    Ok(metas)
}

pub fn manager_deposit(
    ids: &ProgramIds,
    market: &SpotMarketAccounts,
    args: &ManagerTransferArgs,
) -> Result<Instruction> {
    check_schema(ids, InstructionKind::ManagerDeposit)?;
    let metas = manager_metas(ids, market, args, false)?;
    let data = VaultInstruction::ManagerDeposit {
        name: args.name.clone(),
        amount: args.amount,
    }
    .pack()?;
    Ok(vault_instruction(ids, "manager_deposit", data, metas))
}
