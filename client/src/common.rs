use std::str::FromStr;
use std::sync::Once;

use solana_program::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tracing_subscriber::EnvFilter;

use crate::{
    constants::{EXPLORER_TX_URL, MAX_NAME_LEN},
    error::{Result, VaultClientError},
    pda::truncate_name,
};

static TRACING: Once = Once::new();

/// Install the fmt subscriber once per process. Honours `RUST_LOG`, defaults to `info`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    });
}

pub fn bytes32_to_string(bytes: [u8; 32]) -> String {
    String::from_utf8(
        bytes
            .iter()
            .take_while(|&&c| c != 0)
            .cloned()
            .collect::<Vec<u8>>(),
    )
    .unwrap_or_else(|_| String::from("Invalid UTF-8"))
}

/// Zero-padded 32 byte form of a vault name, as stored in the vault account.
pub fn encode_name(name: &str) -> [u8; MAX_NAME_LEN] {
    let mut name_32 = [0u8; MAX_NAME_LEN];
    let name_bytes = truncate_name(name).as_bytes();
    name_32[..name_bytes.len()].copy_from_slice(name_bytes);
    name_32
}

pub fn parse_pubkey(field: &'static str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|_| VaultClientError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

pub fn explorer_url(signature: &Signature) -> String {
    format!("{}{}", EXPLORER_TX_URL, signature)
}

/// Base58 (de)serialization for addresses in JSON config and requests.
pub mod pubkey_string {
    use std::str::FromStr;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_program::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(|e| D::Error::custom(format!("invalid pubkey {s}: {e}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            key: &Option<Pubkey>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match key {
                Some(key) => serializer.serialize_some(&key.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Pubkey>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| {
                    Pubkey::from_str(&s)
                        .map_err(|e| D::Error::custom(format!("invalid pubkey {s}: {e}")))
                })
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_name_pads_and_round_trips() {
        let encoded = encode_name("bulk1");
        assert_eq!(&encoded[..5], b"bulk1");
        assert!(encoded[5..].iter().all(|&b| b == 0));
        assert_eq!(bytes32_to_string(encoded), "bulk1");
    }

    #[test]
    fn encode_name_truncates_long_names() {
        let long = "a".repeat(40);
        assert_eq!(bytes32_to_string(encode_name(&long)), "a".repeat(32));
    }

    #[test]
    fn parse_pubkey_reports_field() {
        let err = parse_pubkey("delegate", "not-a-key").unwrap_err();
        assert!(matches!(err, VaultClientError::InvalidAddress { field: "delegate", .. }));
    }
}
