use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use super::{check_schema, drift_user_metas, vault_instruction, ProgramIds, VaultAccounts};
use crate::{
    error::Result,
    instruction::{InstructionKind, UserInfoAction, UserInfoInstruction, UserInfoRecord},
};

/// drift program, user, user stats, state, rent, system program
pub(crate) fn initialize_drift_metas(ids: &ProgramIds, accounts: &VaultAccounts) -> Vec<AccountMeta> {
    let mut metas = drift_user_metas(ids, accounts);
    metas.push(AccountMeta::new_readonly(sysvar::rent::id(), false));
    metas.push(AccountMeta::new_readonly(system_program::id(), false));
    metas
}

/// Opens the vault's Drift user and user stats accounts. User-info program only.
pub fn initialize_drift(ids: &ProgramIds, payer: &Pubkey, name: &str) -> Result<Instruction> {
    check_schema(ids, InstructionKind::InitializeDrift)?;
    let accounts = VaultAccounts::resolve(ids, name)?;

    let data = UserInfoInstruction {
        action: UserInfoAction::InitializeDrift,
        record: UserInfoRecord {
            vault_id: name.to_string(),
            ..Default::default()
        },
    }
    .pack()?;

    let mut metas = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(accounts.vault, false),
        AccountMeta::new(accounts.treasury, false),
    ];
    metas.extend(initialize_drift_metas(ids, &accounts));

    Ok(vault_instruction(ids, "initialize_drift", data, metas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{instruction::SchemaVersion, instructions::fixtures::ids};

    #[test]
    fn lists_nine_accounts_ending_with_rent_and_system() {
        let ids = ids(SchemaVersion::V1);
        let payer = Pubkey::new_unique();
        let ix = initialize_drift(&ids, &payer, "bulk1").unwrap();
        let accounts = VaultAccounts::resolve(&ids, "bulk1").unwrap();

        assert_eq!(ix.accounts.len(), 9);
        assert_eq!(ix.accounts[3].pubkey, ids.drift_program);
        assert_eq!(ix.accounts[4].pubkey, accounts.drift_user);
        assert_eq!(ix.accounts[5].pubkey, accounts.drift_user_stats);
        assert_eq!(ix.accounts[6].pubkey, accounts.drift_state);
        assert_eq!(ix.accounts[7].pubkey, sysvar::rent::id());
        assert_eq!(ix.accounts[8].pubkey, system_program::id());
        assert_eq!(ix.data[0], 3);
    }

    #[test]
    fn vault_program_opens_drift_with_the_vault() {
        assert!(initialize_drift(&ids(SchemaVersion::V2), &Pubkey::new_unique(), "bulk1").is_err());
    }
}
