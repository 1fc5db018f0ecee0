use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use super::{vault_instruction, ProgramIds};
use crate::{
    drift,
    error::Result,
    instruction::{
        BotStatus, FundStatus, SchemaVersion, UserInfoAction, UserInfoInstruction, UserInfoRecord,
        VaultInstruction,
    },
    state::Vault,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDelegateArgs {
    pub name: String,
    pub delegate: Pubkey,
    pub sub_account: u16,
}

/// Lets `delegate` trade the vault's Drift sub account.
pub fn update_delegate(
    ids: &ProgramIds,
    payer: &Pubkey,
    args: &UpdateDelegateArgs,
) -> Result<Instruction> {
    let (vault, _) = Vault::get_pda(&args.name, &ids.vault_program, ids.schema)?;
    let user = drift::user_address(&ids.drift_program, &vault, args.sub_account)?;

    let data = match ids.schema {
        SchemaVersion::V1 => UserInfoInstruction {
            action: UserInfoAction::UpdateDelegate,
            record: UserInfoRecord {
                vault_id: args.name.clone(),
                amount: args.sub_account.into(),
                fund_status: FundStatus::Deposited,
                bot_status: BotStatus::Init,
                delegate: args.delegate.to_string(),
                sub_account: args.sub_account,
                ..Default::default()
            },
        }
        .pack()?,
        SchemaVersion::V2 => VaultInstruction::UpdateDelegate {
            name: args.name.clone(),
            delegate: args.delegate.to_string(),
            sub_account: args.sub_account,
        }
        .pack()?,
    };

    let metas = delegate_metas(ids, payer, &vault, &user);
    Ok(vault_instruction(ids, "update_delegate", data, metas))
}

/// signer, vault, drift program, drift user
pub(crate) fn delegate_metas(
    ids: &ProgramIds,
    signer: &Pubkey,
    vault: &Pubkey,
    user: &Pubkey,
) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*signer, true),
        AccountMeta::new(*vault, false),
        AccountMeta::new_readonly(ids.drift_program, false),
        AccountMeta::new(*user, false),
    ]
}
