use solana_program::{
    instruction::{AccountMeta, Instruction},
    system_program,
};

use super::{
    deposit::{depositor_and_data, Transfer},
    drift_market_metas, vault_instruction, DepositArgs, ProgramIds, SpotMarketAccounts,
    VaultAccounts,
};
use crate::error::Result;

/// Same arguments as a deposit, funds flow back to `user_token_account`.
/// The vault program ignores `amount` and pays out the pending request.
pub type WithdrawArgs = DepositArgs;

pub fn withdraw(
    ids: &ProgramIds,
    market: &SpotMarketAccounts,
    args: &WithdrawArgs,
) -> Result<Instruction> {
    let accounts = VaultAccounts::resolve(ids, &args.name)?;
    let (depositor, data) = depositor_and_data(ids, market, args, &accounts, Transfer::Withdraw)?;

    let mut metas = vec![
        AccountMeta::new(args.authority, true),
        AccountMeta::new(depositor, false),
        AccountMeta::new(accounts.vault, false),
        AccountMeta::new(accounts.treasury, false),
    ];
    metas.extend(drift_market_metas(ids, &accounts, market, true)?);
    metas.extend([
        AccountMeta::new(args.user_token_account, false),
        AccountMeta::new(args.vault_token_account, false),
        AccountMeta::new(args.treasury_token_account, false),
        AccountMeta::new(market.mint, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ]);

    Ok(vault_instruction(ids, "withdraw", data, metas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        drift,
        instruction::{FundStatus, SchemaVersion, UserInfoInstruction, VaultInstruction},
        instructions::fixtures::{ids, market},
    };
    use solana_program::pubkey::Pubkey;

    fn args() -> WithdrawArgs {
        WithdrawArgs {
            name: "bulk1".to_string(),
            amount: 500_000,
            authority: Pubkey::new_unique(),
            user_pubkey: Pubkey::new_unique().to_string(),
            user_token_account: Pubkey::new_unique(),
            vault_token_account: Pubkey::new_unique(),
            treasury_token_account: Pubkey::new_unique(),
        }
    }

    #[test]
    fn withdraw_inserts_drift_signer_before_token_accounts() {
        let ids = ids(SchemaVersion::V2);
        let market = market();
        let args = args();
        let ix = withdraw(&ids, &market, &args).unwrap();

        assert_eq!(ix.accounts.len(), 18);
        assert_eq!(ix.accounts[10].pubkey, market.spot_market);
        assert_eq!(
            ix.accounts[11].pubkey,
            drift::signer_address(&ids.drift_program).unwrap()
        );
        assert_eq!(ix.accounts[12].pubkey, args.user_token_account);
        assert_eq!(ix.accounts[16].pubkey, spl_token::id());
        assert_eq!(ix.accounts[17].pubkey, system_program::id());
        assert_eq!(ix.data, vec![5]);
        assert_eq!(VaultInstruction::unpack(&ix.data).unwrap(), VaultInstruction::Withdraw);
    }

    #[test]
    fn legacy_withdraw_marks_funds_withdrawn() {
        let ix = withdraw(&ids(SchemaVersion::V1), &market(), &args()).unwrap();
        let decoded = UserInfoInstruction::unpack(&ix.data).unwrap();
        assert_eq!(decoded.record.fund_status, FundStatus::Withdrawn);
        assert_eq!(ix.data[0], 2);
    }
}
