use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use super::{check_schema, vault_instruction, ProgramIds};
use crate::{
    error::Result,
    instruction::{InstructionKind, UserInfoAction, UserInfoInstruction, UserInfoRecord},
    state::{Treasury, Vault},
};

/// Creates the vault and treasury accounts for `name`. User-info program only;
/// the vault program opens a vault with `initialize_vault_with_drift`.
pub fn initialize_vault(ids: &ProgramIds, payer: &Pubkey, name: &str) -> Result<Instruction> {
    check_schema(ids, InstructionKind::InitializeVault)?;
    let (vault, _) = Vault::get_pda(name, &ids.vault_program, ids.schema)?;
    let (treasury, _) = Treasury::get_pda(name, &ids.vault_program)?;

    let data = UserInfoInstruction {
        action: UserInfoAction::InitializeVault,
        record: UserInfoRecord {
            vault_id: name.to_string(),
            ..Default::default()
        },
    }
    .pack()?;

    let metas = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(vault, false),
        AccountMeta::new(treasury, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(vault_instruction(ids, "initialize_vault", data, metas))
}
