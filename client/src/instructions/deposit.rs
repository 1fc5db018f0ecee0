use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use super::{drift_market_metas, vault_instruction, ProgramIds, SpotMarketAccounts, VaultAccounts};
use crate::{
    error::{Result, VaultClientError},
    instruction::{
        BotStatus, FundStatus, SchemaVersion, UserInfoAction, UserInfoInstruction, UserInfoRecord,
        VaultInstruction,
    },
    state::{UserInfoAccountState, VaultDepositor},
    validate,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositArgs {
    pub name: String,
    pub amount: u64,
    /// Signs and pays. Owns `user_token_account`.
    pub authority: Pubkey,
    /// Key the user-info record is kept under. Read by schema V1 only.
    pub user_pubkey: String,
    pub user_token_account: Pubkey,
    pub vault_token_account: Pubkey,
    pub treasury_token_account: Pubkey,
}

/// Moves `amount` from the user into the vault's Drift account.
pub fn deposit(
    ids: &ProgramIds,
    market: &SpotMarketAccounts,
    args: &DepositArgs,
) -> Result<Instruction> {
    let accounts = VaultAccounts::resolve(ids, &args.name)?;
    let (depositor, data) = depositor_and_data(ids, market, args, &accounts, Transfer::Deposit)?;

    let mut metas = vec![
        AccountMeta::new(args.authority, true),
        AccountMeta::new(depositor, false),
        AccountMeta::new(accounts.vault, false),
        AccountMeta::new(accounts.treasury, false),
    ];
    metas.extend(drift_market_metas(ids, &accounts, market, false)?);
    metas.extend([
        AccountMeta::new(args.user_token_account, false),
        AccountMeta::new(args.vault_token_account, false),
        AccountMeta::new(args.treasury_token_account, false),
        AccountMeta::new(market.mint, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ]);

    Ok(vault_instruction(ids, "deposit", data, metas))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transfer {
    Deposit,
    Withdraw,
}

/// The depositor record and payload differ by schema: V1 keeps a user-info
/// account per (payer, user) pair, V2 a vault depositor per (vault, authority).
pub(crate) fn depositor_and_data(
    ids: &ProgramIds,
    market: &SpotMarketAccounts,
    args: &DepositArgs,
    accounts: &VaultAccounts,
    transfer: Transfer,
) -> Result<(Pubkey, Vec<u8>)> {
    match ids.schema {
        SchemaVersion::V1 => {
            validate!(
                !args.user_pubkey.is_empty(),
                VaultClientError::MissingAccount("user_pubkey")
            )?;
            let (user_info, _) =
                UserInfoAccountState::get_pda(&args.authority, &args.user_pubkey, &ids.vault_program)?;
            let (action, fund_status) = match transfer {
                Transfer::Deposit => (UserInfoAction::Deposit, FundStatus::Deposited),
                Transfer::Withdraw => (UserInfoAction::Withdraw, FundStatus::Withdrawn),
            };
            let data = UserInfoInstruction {
                action,
                record: UserInfoRecord {
                    vault_id: args.name.clone(),
                    user_pubkey: args.user_pubkey.clone(),
                    amount: args.amount,
                    fund_status,
                    bot_status: BotStatus::Init,
                    market_index: market.market_index,
                    ..Default::default()
                },
            }
            .pack()?;
            Ok((user_info, data))
        }
        SchemaVersion::V2 => {
            let (depositor, _) =
                VaultDepositor::get_pda(&accounts.vault, &args.authority, &ids.vault_program)?;
            // A withdraw redeems the amount fixed by the earlier request.
            let data = match transfer {
                Transfer::Deposit => VaultInstruction::Deposit {
                    name: args.name.clone(),
                    amount: args.amount,
                },
                Transfer::Withdraw => VaultInstruction::Withdraw,
            }
            .pack()?;
            Ok((depositor, data))
        }
    }
}
