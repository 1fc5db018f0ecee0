pub mod treasury;
pub mod user_info;
pub mod vault;
pub mod vault_depositor;
pub mod withdraw_request;

pub use treasury::*;
pub use user_info::*;
pub use vault::*;
pub use vault_depositor::*;
pub use withdraw_request::*;

use borsh::BorshDeserialize;
use solana_program::pubkey::Pubkey;

use crate::error::{Result, VaultClientError};

/// Decode a Borsh record from the front of an account's data. Accounts are
/// allocated larger than the record, so trailing bytes are ignored.
pub fn decode_account<T: BorshDeserialize>(address: &Pubkey, data: &[u8]) -> Result<T> {
    let mut data = data;
    T::deserialize(&mut data).map_err(|e| VaultClientError::AccountDecode {
        address: *address,
        reason: e.to_string(),
    })
}
