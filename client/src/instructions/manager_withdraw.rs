use solana_program::instruction::Instruction;

use super::{
    check_schema, manager_deposit::manager_metas, vault_instruction, ManagerTransferArgs,
    ProgramIds, SpotMarketAccounts,
};
use crate::{
    error::Result,
    instruction::{InstructionKind, VaultInstruction},
};

pub fn manager_withdraw(
    ids: &ProgramIds,
    market: &SpotMarketAccounts,
    args: &ManagerTransferArgs,
) -> Result<Instruction> {
    check_schema(ids, InstructionKind::ManagerWithdraw)?;
    let metas = manager_metas(ids, market, args, true)?;
    let data = VaultInstruction::ManagerWithdraw {
        amount: args.amount,
    }
    .pack()?;
    Ok(vault_instruction(ids, "manager_withdraw", data, metas))
}
