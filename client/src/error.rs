use solana_client::client_error::ClientError;
use solana_program::{message::CompileError, pubkey::Pubkey};
use solana_sdk::signer::SignerError;
use thiserror::Error;

use crate::instruction::{InstructionKind, SchemaVersion};

pub type Result<T, E = VaultClientError> = std::result::Result<T, E>;

/// How an error should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input or missing configuration. Fail fast, never retried.
    Configuration,
    /// A value does not fit its declared field, or bytes do not match a layout.
    Encoding,
    /// Transport failure. Retried inside the engine; surfaced once retries are spent.
    Network,
    /// Local invariant broken (e.g. no bump seed). Not recoverable.
    Fatal,
}

#[derive(Debug, Error)]
pub enum VaultClientError {
    #[error("Vault name must not be empty")]
    EmptyVaultName,

    #[error("Missing required account: {0}")]
    MissingAccount(&'static str),

    #[error("Invalid address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Failed to create token account {address}: {reason}")]
    TokenAccountCreation { address: Pubkey, reason: String },

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{instruction} is not an instruction of schema {schema:?}")]
    UnsupportedSchema {
        instruction: InstructionKind,
        schema: SchemaVersion,
    },

    #[error("Value {value} does not fit in {width}-bit field {field}")]
    ValueOutOfRange {
        field: &'static str,
        width: u32,
        value: u128,
    },

    #[error("Field {field} expects {expected}, got {found}")]
    FieldTypeMismatch {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Layout expects {expected} fields, got {found}")]
    FieldCountMismatch { expected: usize, found: usize },

    #[error("Encoded instruction exceeds scratch buffer of {0} bytes")]
    BufferOverflow(usize),

    #[error("Failed to decode instruction data: {0}")]
    Decode(String),

    #[error("Unknown instruction variant {0}")]
    UnknownVariant(u8),

    #[error("Failed to decode account {address}: {reason}")]
    AccountDecode { address: Pubkey, reason: String },

    #[error("No viable bump seed for program address")]
    DerivationExhausted,

    #[error("Failed to compile transaction message: {0}")]
    Compile(#[from] CompileError),

    #[error("Failed to sign transaction: {0}")]
    Signing(#[from] SignerError),

    #[error("Failed to serialize transaction: {0}")]
    Serialize(#[from] bincode::Error),

    #[error("RPC request failed: {0}")]
    Rpc(String),
}

impl VaultClientError {
    pub fn kind(&self) -> ErrorKind {
        use VaultClientError::*;
        match self {
            EmptyVaultName
            | MissingAccount(_)
            | InvalidAddress { .. }
            | InvalidConfig(_)
            | InvalidRequest(_)
            | UnsupportedSchema { .. } => ErrorKind::Configuration,
            ValueOutOfRange { .. }
            | FieldTypeMismatch { .. }
            | FieldCountMismatch { .. }
            | BufferOverflow(_)
            | Decode(_)
            | UnknownVariant(_)
            | AccountDecode { .. }
            | Serialize(_) => ErrorKind::Encoding,
            Rpc(_) | TokenAccountCreation { .. } => ErrorKind::Network,
            DerivationExhausted | Compile(_) | Signing(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }
}

impl From<ClientError> for VaultClientError {
    fn from(e: ClientError) -> Self {
        VaultClientError::Rpc(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(VaultClientError::Rpc("timeout".into()).is_retryable());
        assert!(!VaultClientError::MissingAccount("oracle").is_retryable());
        assert!(!VaultClientError::DerivationExhausted.is_retryable());
        assert_eq!(
            VaultClientError::ValueOutOfRange {
                field: "sub_account",
                width: 16,
                value: 70_000
            }
            .kind(),
            ErrorKind::Encoding
        );
    }
}
