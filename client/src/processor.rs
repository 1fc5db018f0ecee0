//! Maps JSON request bodies onto [`VaultClient`] operations.
//!
//! Every request ends in a [`TxOutcome`]: anything that stops a transaction
//! from being broadcast is reported as [`TxOutcome::RejectedBeforeSend`].

use std::fmt;

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use tracing::{info, warn};

use crate::{
    client::VaultClient,
    common::pubkey_string,
    error::{Result, VaultClientError},
    instruction::{UpdateVaultParams, VaultParams},
    rpc::LedgerRpc,
    sender::TxOutcome,
};

/// Token amount in base units. Accepts a JSON integer or a decimal string;
/// fractions, negatives and values past `u64::MAX` are refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenAmount(pub u64);

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(TokenAmountVisitor)
    }
}

struct TokenAmountVisitor;

impl<'de> Visitor<'de> for TokenAmountVisitor {
    type Value = TokenAmount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer amount, as a number or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<TokenAmount, E> {
        Ok(TokenAmount(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<TokenAmount, E> {
        u64::try_from(v)
            .map(TokenAmount)
            .map_err(|_| E::custom(format!("amount {v} is negative")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<TokenAmount, E> {
        Err(E::custom(format!("amount {v} is not an exact integer")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<TokenAmount, E> {
        let digits = v.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(E::custom(format!("amount {v:?} is not a decimal integer")));
        }
        digits
            .parse::<u64>()
            .map(TokenAmount)
            .map_err(|_| E::custom(format!("amount {v} exceeds u64")))
    }
}

/// One api call. `action` selects the operation; `vault_id` is the vault name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VaultRequest {
    InitializeVault {
        vault_id: String,
    },
    InitializeDrift {
        vault_id: String,
    },
    InitializeVaultWithDrift {
        vault_id: String,
        #[serde(default)]
        spot_market_index: u16,
    },
    InitializeVaultDepositor {
        vault_id: String,
    },
    Deposit {
        vault_id: String,
        #[serde(default)]
        user_pubkey: String,
        amount: TokenAmount,
    },
    Withdraw {
        vault_id: String,
        #[serde(default)]
        user_pubkey: String,
        amount: TokenAmount,
    },
    RequestWithdraw {
        vault_id: String,
        amount: TokenAmount,
    },
    CancelWithdrawRequest {
        vault_id: String,
    },
    UpdateDelegate {
        vault_id: String,
        #[serde(with = "pubkey_string")]
        delegate: Pubkey,
        /// Range-checked to u16 when processed.
        #[serde(default)]
        sub_account: u64,
    },
    ResetDelegate {
        vault_id: String,
    },
    UpdateVault {
        vault_id: String,
        params: UpdateVaultParams,
    },
    ManagerDeposit {
        vault_id: String,
        amount: TokenAmount,
    },
    ManagerWithdraw {
        vault_id: String,
        amount: TokenAmount,
    },
    ManagerCollectFees {
        vault_id: String,
        amount: TokenAmount,
    },
}

impl VaultRequest {
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| VaultClientError::InvalidRequest(e.to_string()))
    }

    pub fn vault_id(&self) -> &str {
        use VaultRequest::*;
        match self {
            InitializeVault { vault_id }
            | InitializeDrift { vault_id }
            | InitializeVaultWithDrift { vault_id, .. }
            | InitializeVaultDepositor { vault_id }
            | Deposit { vault_id, .. }
            | Withdraw { vault_id, .. }
            | RequestWithdraw { vault_id, .. }
            | CancelWithdrawRequest { vault_id }
            | UpdateDelegate { vault_id, .. }
            | ResetDelegate { vault_id }
            | UpdateVault { vault_id, .. }
            | ManagerDeposit { vault_id, .. }
            | ManagerWithdraw { vault_id, .. }
            | ManagerCollectFees { vault_id, .. } => vault_id,
        }
    }
}

fn sub_account_id(value: u64) -> Result<u16> {
    u16::try_from(value).map_err(|_| VaultClientError::ValueOutOfRange {
        field: "sub_account",
        width: 16,
        value: value.into(),
    })
}

/// Run `request` with `signer` paying.
pub async fn process_request<R, S>(
    client: &VaultClient<R>,
    signer: &S,
    request: &VaultRequest,
) -> TxOutcome
where
    R: LedgerRpc,
    S: Signer,
{
    info!(vault_id = request.vault_id(), ?request, "processing request");
    match dispatch(client, signer, request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(vault_id = request.vault_id(), error = %e, kind = ?e.kind(), "request not sent");
            TxOutcome::RejectedBeforeSend {
                reason: e.to_string(),
            }
        }
    }
}

/// Parse `body` and run it. A malformed body is reported like any other
/// pre-broadcast failure.
pub async fn process_json<R, S>(client: &VaultClient<R>, signer: &S, body: &str) -> TxOutcome
where
    R: LedgerRpc,
    S: Signer,
{
    match VaultRequest::from_json(body) {
        Ok(request) => process_request(client, signer, &request).await,
        Err(e) => {
            warn!(error = %e, "malformed request");
            TxOutcome::RejectedBeforeSend {
                reason: e.to_string(),
            }
        }
    }
}

async fn dispatch<R, S>(
    client: &VaultClient<R>,
    signer: &S,
    request: &VaultRequest,
) -> Result<TxOutcome>
where
    R: LedgerRpc,
    S: Signer,
{
    match request {
        VaultRequest::InitializeVault { vault_id } => client.initialize_vault(signer, vault_id).await,
        VaultRequest::InitializeDrift { vault_id } => client.initialize_drift(signer, vault_id).await,
        VaultRequest::InitializeVaultWithDrift {
            vault_id,
            spot_market_index,
        } => {
            let params = VaultParams::with_defaults(vault_id, *spot_market_index);
            client.initialize_vault_with_drift(signer, &params).await
        }
        VaultRequest::InitializeVaultDepositor { vault_id } => {
            client.initialize_vault_depositor(signer, vault_id).await
        }
        VaultRequest::Deposit {
            vault_id,
            user_pubkey,
            amount,
        } => client.deposit(signer, vault_id, user_pubkey, amount.0).await,
        VaultRequest::Withdraw {
            vault_id,
            user_pubkey,
            amount,
        } => client.withdraw(signer, vault_id, user_pubkey, amount.0).await,
        VaultRequest::RequestWithdraw { vault_id, amount } => {
            client.request_withdraw(signer, vault_id, amount.0).await
        }
        VaultRequest::CancelWithdrawRequest { vault_id } => {
            client.cancel_withdraw_request(signer, vault_id).await
        }
        VaultRequest::UpdateDelegate {
            vault_id,
            delegate,
            sub_account,
        } => {
            let sub_account = sub_account_id(*sub_account)?;
            client.update_delegate(signer, vault_id, *delegate, sub_account).await
        }
        VaultRequest::ResetDelegate { vault_id } => client.reset_delegate(signer, vault_id).await,
        VaultRequest::UpdateVault { vault_id, params } => {
            client.update_vault(signer, vault_id, params).await
        }
        VaultRequest::ManagerDeposit { vault_id, amount } => {
            client.manager_deposit(signer, vault_id, amount.0).await
        }
        VaultRequest::ManagerWithdraw { vault_id, amount } => {
            client.manager_withdraw(signer, vault_id, amount.0).await
        }
        VaultRequest::ManagerCollectFees { vault_id, amount } => {
            client.manager_collect_fees(signer, vault_id, amount.0).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ClientConfig, MarketConfig},
        instruction::{SchemaVersion, VaultInstruction},
        test_utils::MockRpc,
    };
    use serde_json::json;
    use solana_sdk::signature::Keypair;

    fn client(rpc: MockRpc) -> VaultClient<MockRpc> {
        VaultClient::new(
            rpc,
            ClientConfig {
                program_id: Pubkey::new_from_array([7; 32]),
                schema: SchemaVersion::V2,
                market: MarketConfig {
                    mint: Some(Pubkey::new_from_array([6; 32])),
                    oracle: Some(Pubkey::new_from_array([9; 32])),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    fn parse(value: serde_json::Value) -> Result<VaultRequest> {
        VaultRequest::from_json(&value.to_string())
    }

    #[test]
    fn amounts_accept_integers_and_decimal_strings() {
        let as_number = parse(json!({"action": "deposit", "vault_id": "bulk1", "amount": 1_000_000})).unwrap();
        let as_string = parse(json!({"action": "deposit", "vault_id": "bulk1", "amount": "1000000"})).unwrap();
        assert_eq!(as_number, as_string);

        let max = parse(json!({"action": "manager_deposit", "vault_id": "v", "amount": "18446744073709551615"})).unwrap();
        assert_eq!(
            max,
            VaultRequest::ManagerDeposit {
                vault_id: "v".into(),
                amount: TokenAmount(u64::MAX)
            }
        );
    }

    #[test]
    fn inexact_amounts_are_refused() {
        for amount in [json!(1.5), json!(-3), json!("1.5"), json!("18446744073709551616"), json!("")] {
            let err = parse(json!({"action": "withdraw", "vault_id": "bulk1", "amount": amount})).unwrap_err();
            assert!(matches!(err, VaultClientError::InvalidRequest(_)), "{amount}");
        }
    }

    #[test]
    fn unknown_action_is_refused() {
        assert!(parse(json!({"action": "liquidate", "vault_id": "bulk1"})).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_sub_account_never_reaches_the_network() {
        let client = client(MockRpc::landing());
        let body = json!({
            "action": "update_delegate",
            "vault_id": "bulk1",
            "delegate": Pubkey::new_unique().to_string(),
            "sub_account": 70_000,
        });

        let outcome = process_json(&client, &Keypair::new(), &body.to_string()).await;

        match outcome {
            TxOutcome::RejectedBeforeSend { reason } => assert!(reason.contains("sub_account")),
            other => panic!("unexpected outcome {other}"),
        }
        assert_eq!(client.rpc().network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_body_is_rejected_before_send() {
        let client = client(MockRpc::landing());
        let outcome = process_json(&client, &Keypair::new(), "{not json").await;
        assert!(matches!(outcome, TxOutcome::RejectedBeforeSend { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn request_drives_one_transaction() {
        let client = client(MockRpc::landing());
        let request = parse(json!({"action": "initialize_vault_depositor", "vault_id": "bulk1"})).unwrap();

        let outcome = process_request(&client, &Keypair::new(), &request).await;

        assert!(outcome.is_success(), "{outcome}");
        let sent = client.rpc().sent_transactions();
        assert_eq!(sent.len(), 1);
        let ix = sent[0].message.instructions().last().unwrap();
        assert_eq!(
            VaultInstruction::unpack(&ix.data).unwrap(),
            VaultInstruction::InitializeVaultDepositor
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_request_is_routed() {
        let client = client(MockRpc::landing());
        let request = parse(json!({"action": "cancel_withdraw_request", "vault_id": "bulk1"})).unwrap();

        let outcome = process_request(&client, &Keypair::new(), &request).await;

        assert!(outcome.is_success(), "{outcome}");
        let sent = client.rpc().sent_transactions();
        let ix = sent[0].message.instructions().last().unwrap();
        assert_eq!(ix.data, vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn user_info_action_against_vault_program_is_not_sent() {
        let client = client(MockRpc::landing());
        let body = json!({"action": "initialize_vault", "vault_id": "bulk1"});

        let outcome = process_json(&client, &Keypair::new(), &body.to_string()).await;

        match outcome {
            TxOutcome::RejectedBeforeSend { reason } => assert!(reason.contains("InitializeVault")),
            other => panic!("unexpected outcome {other}"),
        }
        assert_eq!(client.rpc().network_calls(), 0);
    }
}
