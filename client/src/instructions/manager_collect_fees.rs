use solana_program::instruction::Instruction;

use super::{
    check_schema, manager_deposit::manager_metas, vault_instruction, ManagerTransferArgs,
    ProgramIds, SpotMarketAccounts,
};
use crate::{
    error::Result,
    instruction::{InstructionKind, VaultInstruction},
};

/// Pays accrued management fees out to the manager's token account.
pub fn manager_collect_fees(
    ids: &ProgramIds,
    market: &SpotMarketAccounts,
    args: &ManagerTransferArgs,
) -> Result<Instruction> {
    check_schema(ids, InstructionKind::ManagerCollectFees)?;
    let metas = manager_metas(ids, market, args, true)?;
    let data = VaultInstruction::ManagerCollectFees {
        amount: args.amount,
    }
    .pack()?;
    Ok(vault_instruction(ids, "manager_collect_fees", data, metas))
}
