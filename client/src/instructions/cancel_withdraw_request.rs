use solana_program::{instruction::Instruction, pubkey::Pubkey};

use super::{
    check_schema, request_withdraw::withdraw_request_metas, vault_instruction, ProgramIds,
    SpotMarketAccounts,
};
use crate::{
    error::Result,
    instruction::{InstructionKind, VaultInstruction},
};

/// Drops the depositor's pending withdraw request. The vault re-reads Drift
/// equity, so the accounts are those of the request itself.
pub fn cancel_withdraw_request(
    ids: &ProgramIds,
    market: &SpotMarketAccounts,
    authority: &Pubkey,
    name: &str,
) -> Result<Instruction> {
    check_schema(ids, InstructionKind::CancelWithdrawRequest)?;
    let metas = withdraw_request_metas(ids, market, authority, name)?;
    let data = VaultInstruction::CancelWithdrawRequest.pack()?;
    Ok(vault_instruction(ids, "cancel_withdraw_request", data, metas))
}
