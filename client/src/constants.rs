use std::time::Duration;

use static_assertions::const_assert;

// SEEDS
pub const VAULT_SEED: &[u8] = b"vault";
pub const TREASURY_SEED: &[u8] = b"treasury";
pub const VAULT_DEPOSITOR_SEED: &[u8] = b"vault_depositor";

/// Names and pubkey strings are cut to this many bytes before they are used as seeds.
pub const MAX_NAME_LEN: usize = 32;
const_assert!(MAX_NAME_LEN <= solana_program::pubkey::MAX_SEED_LEN);

pub const PERCENTAGE_PRECISION: u64 = 1_000_000;

/// Instruction data is written into a buffer this large, then cut to the encoded span.
pub const SCRATCH_BUFFER_LEN: usize = 1000;

// COMPUTE BUDGET
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 400_000;
pub const DEFAULT_COMPUTE_UNIT_PRICE: u64 = 500_000;

// DELIVERY
pub const RESEND_INTERVAL: Duration = Duration::from_millis(500);
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const BLOCK_HEIGHT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Stop waiting this many blocks before the lease really expires.
pub const BLOCK_HEIGHT_SAFETY_MARGIN: u64 = 150;
pub const LOOKUP_RETRIES: u32 = 10;
pub const LOOKUP_DELAY: Duration = Duration::from_millis(500);

pub const EXPLORER_TX_URL: &str = "https://solscan.io/tx/";
