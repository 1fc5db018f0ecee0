use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use super::WithdrawRequest;
use crate::{constants::VAULT_DEPOSITOR_SEED, error::Result, pda::derive};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct VaultDepositor {
    /// The vault deposited into
    pub vault: Pubkey,
    /// Derived from vault and authority
    pub pubkey: Pubkey,
    /// The address allowed to deposit and withdraw
    pub authority: Pubkey,
    /// `vault_shares / vault.total_shares` is the depositor's ownership of vault equity
    pub vault_shares: u128,
    pub last_withdraw_request: WithdrawRequest,
    pub init_ts: u64,
    pub last_valid_ts: u64,
    pub net_deposits: u64,
    pub total_deposits: u64,
    pub total_withdraws: u64,
    /// Gains the depositor has already paid performance fees on
    pub cumulative_profit_share_amount: u64,
    pub profit_share_fee_paid: u64,
    pub vault_shares_base: u32,
    pub padding1: u32,
    pub padding: [u64; 8],
}

impl VaultDepositor {
    pub fn get_pda(vault: &Pubkey, authority: &Pubkey, program_id: &Pubkey) -> Result<(Pubkey, u8)> {
        derive(
            program_id,
            &[VAULT_DEPOSITOR_SEED, vault.as_ref(), authority.as_ref()],
        )
    }

    /// Share of the vault this depositor owns, in basis points of `total_shares`.
    pub fn ownership_bps(&self, total_shares: u128) -> u128 {
        if total_shares == 0 {
            return 0;
        }
        self.vault_shares.saturating_mul(10_000) / total_shares
    }
}
