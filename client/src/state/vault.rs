use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{
    common::bytes32_to_string,
    constants::{PERCENTAGE_PRECISION, VAULT_SEED},
    error::{Result, VaultClientError},
    instruction::SchemaVersion,
    pda::{derive, truncate_name},
    validate,
};

/// Vault account as the program stores it.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Vault {
    /// Zero padded vault name, the derivation seed of the vault address
    pub name: [u8; 32],
    pub pubkey: Pubkey,
    /// Can update vault params and move manager funds
    pub manager: Pubkey,
    pub token_account: Pubkey,
    /// Drift user stats account owned by the vault
    pub user_stats: Pubkey,
    /// Drift user account owned by the vault
    pub user: Pubkey,
    /// Delegate set on the drift user. Differs from `liquidation_delegate` while liquidating
    pub delegate: Pubkey,
    pub liquidation_delegate: Pubkey,
    /// Shares held by depositors
    pub user_shares: u128,
    /// Depositor, manager and protocol shares together
    pub total_shares: u128,
    pub last_fee_update_ts: i64,
    pub liquidation_start_ts: i64,
    /// Seconds between a withdraw request and its completion
    pub redeem_period: u64,
    pub total_withdraw_requested: u64,
    /// Deposits are rejected once this many tokens are held
    pub max_tokens: u64,
    /// Annual fee on assets under management: PERCENTAGE_PRECISION
    pub management_fee: u64,
    pub init_ts: u64,
    pub net_deposits: u64,
    pub manager_net_deposits: i64,
    pub total_deposits: u64,
    pub total_withdraws: u64,
    pub manager_total_deposits: u64,
    pub manager_total_withdraws: u64,
    pub manager_total_fee: i64,
    pub manager_total_profit_share: u64,
    pub min_deposit_amount: u64,
    pub shares_base: u32,
    /// Manager's cut of realized depositor profit: PERCENTAGE_PRECISION
    pub profit_share: u32,
    /// Return below which no incentive fee is taken: PERCENTAGE_PRECISION
    pub hurdle_rate: u32,
    pub spot_market_index: u16,
    pub bump: u8,
    /// Only approved depositors may join
    pub permissioned: bool,
    pub vault_protocol: bool,
}

impl Vault {
    /// Vault address for `name`. The seed layout changed between schema versions.
    pub fn get_pda(name: &str, program_id: &Pubkey, schema: SchemaVersion) -> Result<(Pubkey, u8)> {
        validate!(!name.is_empty(), VaultClientError::EmptyVaultName)?;
        let name = truncate_name(name).as_bytes();
        match schema {
            SchemaVersion::V1 => derive(program_id, &[name]),
            SchemaVersion::V2 => derive(program_id, &[VAULT_SEED, name]),
        }
    }

    pub fn name(&self) -> String {
        bytes32_to_string(self.name)
    }

    pub fn profit_share_pct(&self) -> f64 {
        self.profit_share as f64 * 100.0 / PERCENTAGE_PRECISION as f64
    }
}
