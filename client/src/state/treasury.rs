use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{constants::TREASURY_SEED, error::Result, pda::{derive, truncate_name}};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Treasury {
    /// The treasury's pubkey.
    pub pubkey: Pubkey,
    /// The manager of the treasury who has ability to update vault params
    pub manager: Pubkey,
    /// The vault this treasury collects fees for
    pub vault: Pubkey,
    /// The treasury token account. Used to receive tokens for deposits and withdrawals fees
    pub token_account: Pubkey,
    /// The bump for the treasury pda
    pub bump: u8,
}

impl Treasury {
    pub fn get_pda(name: &str, program_id: &Pubkey) -> Result<(Pubkey, u8)> {
        derive(program_id, &[TREASURY_SEED, truncate_name(name).as_bytes()])
    }
}
