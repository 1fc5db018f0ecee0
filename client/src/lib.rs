//! Client for the vault program and its Drift integration: address derivation,
//! instruction encoding, transaction assembly, and at-least-once delivery.

pub mod macros;

pub mod client;
pub mod common;
pub mod config;
pub mod constants;
pub mod drift;
pub mod error;
pub mod instruction;
pub mod instructions;
pub mod layout;
pub mod pda;
pub mod processor;
pub mod rpc;
pub mod sender;
pub mod state;
pub mod token;
pub mod transaction;

#[cfg(test)]
mod test_utils;

pub use client::VaultClient;
pub use config::ClientConfig;
pub use error::{Result, VaultClientError};
pub use sender::{send_and_confirm, TxOutcome};
