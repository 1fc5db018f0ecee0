use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::{
    common::pubkey_string,
    constants::{
        BLOCK_HEIGHT_POLL_INTERVAL, BLOCK_HEIGHT_SAFETY_MARGIN, LOOKUP_DELAY, LOOKUP_RETRIES,
        RESEND_INTERVAL, STATUS_POLL_INTERVAL,
    },
    drift::{spot_market_address, spot_market_vault_address, DRIFT_PROGRAM_ID},
    error::{Result, VaultClientError},
    instruction::SchemaVersion,
    instructions::SpotMarketAccounts,
    transaction::ComputeBudget,
    validate,
};

/// Everything a [`crate::client::VaultClient`] needs, passed in explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub rpc_url: String,
    /// Derived from `rpc_url` when absent.
    pub ws_url: Option<String>,
    #[serde(with = "pubkey_string")]
    pub program_id: Pubkey,
    #[serde(with = "pubkey_string")]
    pub drift_program_id: Pubkey,
    pub schema: SchemaVersion,
    pub compute_budget: ComputeBudget,
    pub market: MarketConfig,
    pub engine: EngineConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            ws_url: None,
            program_id: Pubkey::default(),
            drift_program_id: DRIFT_PROGRAM_ID,
            schema: SchemaVersion::default(),
            compute_budget: ComputeBudget::default(),
            market: MarketConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| VaultClientError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            VaultClientError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        validate!(
            self.program_id != Pubkey::default(),
            VaultClientError::InvalidConfig("program_id is not set".to_string())
        )?;
        validate!(
            self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://"),
            VaultClientError::InvalidConfig(format!("rpc_url {} is not http(s)", self.rpc_url))
        )?;
        validate!(
            self.engine.lookup_retries > 0,
            VaultClientError::InvalidConfig("lookup_retries must be at least 1".to_string())
        )?;
        Ok(())
    }

    pub fn ws_url(&self) -> String {
        match &self.ws_url {
            Some(url) => url.clone(),
            None => {
                if let Some(rest) = self.rpc_url.strip_prefix("https://") {
                    format!("wss://{rest}")
                } else if let Some(rest) = self.rpc_url.strip_prefix("http://") {
                    format!("ws://{rest}")
                } else {
                    self.rpc_url.clone()
                }
            }
        }
    }
}

/// The spot market a vault trades through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub market_index: u16,
    #[serde(with = "pubkey_string::option")]
    pub mint: Option<Pubkey>,
    #[serde(with = "pubkey_string::option")]
    pub oracle: Option<Pubkey>,
    /// Derived from `market_index` when absent.
    #[serde(with = "pubkey_string::option")]
    pub spot_market: Option<Pubkey>,
    /// Derived from `market_index` when absent.
    #[serde(with = "pubkey_string::option")]
    pub spot_market_vault: Option<Pubkey>,
}

impl MarketConfig {
    /// Fails without touching the network when the oracle or mint is missing.
    pub fn resolve(&self, drift_program: &Pubkey) -> Result<SpotMarketAccounts> {
        let oracle = self.oracle.ok_or(VaultClientError::MissingAccount("oracle"))?;
        let mint = self.mint.ok_or(VaultClientError::MissingAccount("mint"))?;

        let spot_market = match self.spot_market {
            Some(address) => address,
            None => spot_market_address(drift_program, self.market_index)?,
        };
        let spot_market_vault = match self.spot_market_vault {
            Some(address) => address,
            None => spot_market_vault_address(drift_program, self.market_index)?,
        };

        Ok(SpotMarketAccounts {
            market_index: self.market_index,
            spot_market,
            spot_market_vault,
            oracle,
            mint,
        })
    }
}

/// Delivery cadence of the broadcast engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(with = "duration_ms")]
    pub resend_interval: Duration,
    #[serde(with = "duration_ms")]
    pub status_poll_interval: Duration,
    #[serde(with = "duration_ms")]
    pub block_height_poll_interval: Duration,
    pub block_height_safety_margin: u64,
    pub lookup_retries: u32,
    #[serde(with = "duration_ms")]
    pub lookup_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resend_interval: RESEND_INTERVAL,
            status_poll_interval: STATUS_POLL_INTERVAL,
            block_height_poll_interval: BLOCK_HEIGHT_POLL_INTERVAL,
            block_height_safety_margin: BLOCK_HEIGHT_SAFETY_MARGIN,
            lookup_retries: LOOKUP_RETRIES,
            lookup_delay: LOOKUP_DELAY,
        }
    }
}

/// Durations as whole milliseconds in JSON.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_fills_defaults() {
        let program_id = Pubkey::new_unique();
        let oracle = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let config = ClientConfig::from_json(
            &json!({
                "rpc_url": "https://rpc.example.org",
                "program_id": program_id.to_string(),
                "market": {
                    "market_index": 0,
                    "oracle": oracle.to_string(),
                    "mint": mint.to_string(),
                },
                "engine": { "resend_interval": 250 }
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(config.program_id, program_id);
        assert_eq!(config.drift_program_id, DRIFT_PROGRAM_ID);
        assert_eq!(config.schema, SchemaVersion::V2);
        assert_eq!(config.compute_budget, ComputeBudget::default());
        assert_eq!(config.engine.resend_interval, Duration::from_millis(250));
        assert_eq!(config.engine.lookup_retries, 10);
        assert_eq!(config.engine.block_height_safety_margin, 150);
        assert_eq!(config.market.oracle, Some(oracle));
        assert_eq!(config.ws_url(), "wss://rpc.example.org");
    }

    #[test]
    fn missing_program_id_is_rejected() {
        let err = ClientConfig::from_json(r#"{"rpc_url": "https://rpc.example.org"}"#).unwrap_err();
        assert!(matches!(err, VaultClientError::InvalidConfig(_)));
    }

    #[test]
    fn bad_address_is_rejected() {
        let err = ClientConfig::from_json(r#"{"program_id": "nope"}"#).unwrap_err();
        assert!(matches!(err, VaultClientError::InvalidConfig(_)));
    }

    #[test]
    fn market_requires_oracle_and_mint() {
        let mut market = MarketConfig {
            mint: Some(Pubkey::new_unique()),
            ..Default::default()
        };
        assert!(matches!(
            market.resolve(&DRIFT_PROGRAM_ID),
            Err(VaultClientError::MissingAccount("oracle"))
        ));

        market.oracle = Some(Pubkey::new_unique());
        market.mint = None;
        assert!(matches!(
            market.resolve(&DRIFT_PROGRAM_ID),
            Err(VaultClientError::MissingAccount("mint"))
        ));
    }

    #[test]
    fn market_overrides_win_over_derivation() {
        let override_vault = Pubkey::new_unique();
        let market = MarketConfig {
            market_index: 1,
            mint: Some(Pubkey::new_unique()),
            oracle: Some(Pubkey::new_unique()),
            spot_market: None,
            spot_market_vault: Some(override_vault),
        };
        let resolved = market.resolve(&DRIFT_PROGRAM_ID).unwrap();
        assert_eq!(resolved.spot_market_vault, override_vault);
        assert_eq!(
            resolved.spot_market,
            spot_market_address(&DRIFT_PROGRAM_ID, 1).unwrap()
        );
    }
}
