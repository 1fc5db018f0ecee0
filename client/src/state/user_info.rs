use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{
    error::Result,
    instruction::{BotStatus, FundStatus},
    pda::{derive, truncate_name},
};

/// Per-user record kept by the user-info program.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UserInfoAccountState {
    pub is_initialized: bool,
    pub user_pubkey: String,
    pub amount: u64,
    pub fund_status: String,
    pub bot_status: String,
}

impl UserInfoAccountState {
    /// Seeds are the signing payer and the first 32 bytes of the user's base58 key.
    pub fn get_pda(payer: &Pubkey, user_pubkey: &str, program_id: &Pubkey) -> Result<(Pubkey, u8)> {
        derive(
            program_id,
            &[payer.as_ref(), truncate_name(user_pubkey).as_bytes()],
        )
    }

    pub fn fund_status(&self) -> Result<FundStatus> {
        self.fund_status.parse()
    }

    pub fn bot_status(&self) -> Result<BotStatus> {
        self.bot_status.parse()
    }
}
