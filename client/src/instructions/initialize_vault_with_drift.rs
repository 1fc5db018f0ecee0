use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use super::{
    check_schema, initialize_drift::initialize_drift_metas, vault_instruction, ProgramIds,
    VaultAccounts,
};
use crate::{
    error::Result,
    instruction::{InstructionKind, VaultInstruction, VaultParams},
};

/// Creates the vault and its Drift accounts in one instruction.
///
/// `vault_token_account` is the vault's associated token account for the
/// market mint and must exist before this is sent.
pub fn initialize_vault_with_drift(
    ids: &ProgramIds,
    manager: &Pubkey,
    vault_token_account: &Pubkey,
    params: &VaultParams,
) -> Result<Instruction> {
    check_schema(ids, InstructionKind::InitializeVaultWithDrift)?;
    let accounts = VaultAccounts::resolve(ids, &params.name)?;
    let data = VaultInstruction::InitializeVaultWithDrift(params.clone()).pack()?;

    let mut metas = vec![
        AccountMeta::new_readonly(*manager, true),
        AccountMeta::new(accounts.vault, false),
        AccountMeta::new(*vault_token_account, false),
        AccountMeta::new(accounts.treasury, false),
    ];
    metas.extend(initialize_drift_metas(ids, &accounts));

    Ok(vault_instruction(ids, "initialize_vault_with_drift", data, metas))
}
