use solana_program::{instruction::Instruction, pubkey::Pubkey};

use super::{check_schema, update_delegate::delegate_metas, vault_instruction, ProgramIds};
use crate::{
    drift,
    error::Result,
    instruction::{InstructionKind, VaultInstruction},
    state::Vault,
};

/// Restores the vault's own delegate after a liquidation.
pub fn reset_delegate(ids: &ProgramIds, manager: &Pubkey, name: &str) -> Result<Instruction> {
    check_schema(ids, InstructionKind::ResetDelegate)?;
    let (vault, _) = Vault::get_pda(name, &ids.vault_program, ids.schema)?;
    let (user, _) = drift::vault_user(&ids.drift_program, &vault)?;
    let data = VaultInstruction::ResetDelegate.pack()?;

    let metas = delegate_metas(ids, manager, &vault, &user);
    Ok(vault_instruction(ids, "reset_delegate", data, metas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{instruction::SchemaVersion, instructions::fixtures::ids};

    #[test]
    fn one_byte_payload_four_accounts() {
        let ix = reset_delegate(&ids(SchemaVersion::V2), &Pubkey::new_unique(), "bulk1").unwrap();
        assert_eq!(ix.data, vec![11]);
        assert_eq!(ix.accounts.len(), 4);
        assert!(ix.accounts[0].is_signer);
    }
}
