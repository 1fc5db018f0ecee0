use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use super::{check_schema, vault_instruction, ProgramIds};
use crate::{
    error::Result,
    instruction::{InstructionKind, VaultInstruction},
    state::{Vault, VaultDepositor},
};

/// Opens the depositor record `authority` needs before its first deposit.
pub fn initialize_vault_depositor(
    ids: &ProgramIds,
    authority: &Pubkey,
    name: &str,
) -> Result<Instruction> {
    check_schema(ids, InstructionKind::InitializeVaultDepositor)?;
    let (vault, _) = Vault::get_pda(name, &ids.vault_program, ids.schema)?;
    let (depositor, _) = VaultDepositor::get_pda(&vault, authority, &ids.vault_program)?;
    let data = VaultInstruction::InitializeVaultDepositor.pack()?;

    let metas = vec![
        AccountMeta::new_readonly(vault, false),
        AccountMeta::new(depositor, false),
        AccountMeta::new(*authority, true),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    Ok(vault_instruction(ids, "initialize_vault_depositor", data, metas))
}
