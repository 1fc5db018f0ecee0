use serde::{Deserialize, Serialize};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    signers::Signers,
    transaction::VersionedTransaction,
};

use crate::{
    constants::{DEFAULT_COMPUTE_UNIT_LIMIT, DEFAULT_COMPUTE_UNIT_PRICE},
    error::{Result, VaultClientError},
};

/// A recent blockhash and the last block height at which it is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockhashLease {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

impl BlockhashLease {
    /// Height after which delivery attempts stop, `margin` blocks short of real expiry.
    pub fn deadline(&self, margin: u64) -> u64 {
        self.last_valid_block_height.saturating_sub(margin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeBudget {
    pub unit_limit: u32,
    /// micro-lamports per compute unit
    pub unit_price: u64,
}

impl Default for ComputeBudget {
    fn default() -> Self {
        Self {
            unit_limit: DEFAULT_COMPUTE_UNIT_LIMIT,
            unit_price: DEFAULT_COMPUTE_UNIT_PRICE,
        }
    }
}

/// Which compute budget directives a call site puts ahead of its instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetPolicy {
    None,
    LimitOnly,
    LimitAndPrice,
}

impl ComputeBudget {
    pub fn instructions(&self, policy: BudgetPolicy) -> Vec<Instruction> {
        match policy {
            BudgetPolicy::None => vec![],
            BudgetPolicy::LimitOnly => {
                vec![ComputeBudgetInstruction::set_compute_unit_limit(self.unit_limit)]
            }
            BudgetPolicy::LimitAndPrice => vec![
                ComputeBudgetInstruction::set_compute_unit_limit(self.unit_limit),
                ComputeBudgetInstruction::set_compute_unit_price(self.unit_price),
            ],
        }
    }

    /// Budget directives first, then `instruction`.
    pub fn prepend(&self, policy: BudgetPolicy, instruction: Instruction) -> Vec<Instruction> {
        let mut instructions = self.instructions(policy);
        instructions.push(instruction);
        instructions
    }
}

/// A signed transaction ready to broadcast.
#[derive(Debug, Clone)]
pub struct TransactionEnvelope {
    pub bytes: Vec<u8>,
    /// First signature. Identifies the transaction across every resend.
    pub signature: Signature,
    pub lease: BlockhashLease,
}

pub fn assemble(
    payer: &Pubkey,
    lease: &BlockhashLease,
    instructions: &[Instruction],
) -> Result<VersionedMessage> {
    let message = v0::Message::try_compile(payer, instructions, &[], lease.blockhash)?;
    Ok(VersionedMessage::V0(message))
}

pub fn sign<T: Signers + ?Sized>(
    message: VersionedMessage,
    signers: &T,
    lease: BlockhashLease,
) -> Result<TransactionEnvelope> {
    let transaction = VersionedTransaction::try_new(message, signers)?;
    let signature = *transaction
        .signatures
        .first()
        .ok_or_else(|| VaultClientError::InvalidConfig("transaction has no signer".to_string()))?;
    let bytes = bincode::serialize(&transaction)?;

    Ok(TransactionEnvelope {
        bytes,
        signature,
        lease,
    })
}
