use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use super::{check_schema, vault_instruction, ProgramIds};
use crate::{
    error::Result,
    instruction::{InstructionKind, UpdateVaultParams, VaultInstruction},
    state::Vault,
};

pub fn update_vault(
    ids: &ProgramIds,
    manager: &Pubkey,
    name: &str,
    params: &UpdateVaultParams,
) -> Result<Instruction> {
    check_schema(ids, InstructionKind::UpdateVault)?;
    let (vault, _) = Vault::get_pda(name, &ids.vault_program, ids.schema)?;
    let data = VaultInstruction::UpdateVault(params.clone()).pack()?;

    let metas = vec![
        AccountMeta::new_readonly(*manager, true),
        AccountMeta::new(vault, false),
    ];
    Ok(vault_instruction(ids, "update_vault", data, metas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{instruction::SchemaVersion, instructions::fixtures::ids};

    #[test]
    fn manager_then_vault() {
        let ids = ids(SchemaVersion::V2);
        let manager = Pubkey::new_unique();
        let params = UpdateVaultParams {
            max_tokens: 10_000_000,
            ..Default::default()
        };
        let ix = update_vault(&ids, &manager, "bulk1", &params).unwrap();
        assert_eq!(ix.accounts[0].pubkey, manager);
        assert_eq!(ix.accounts.len(), 2);
        assert_eq!(
            VaultInstruction::unpack(&ix.data).unwrap(),
            VaultInstruction::UpdateVault(params)
        );
    }

    #[test]
    fn legacy_schema_is_rejected() {
        assert!(update_vault(
            &ids(SchemaVersion::V1),
            &Pubkey::new_unique(),
            "bulk1",
            &UpdateVaultParams::default()
        )
        .is_err());
    }
}
