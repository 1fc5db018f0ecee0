//! The ledger surface the client consumes.
//!
//! [`LedgerRpc`] is the seam the delivery engine and the account resolver are
//! written against; [`SolanaRpc`] implements it over a JSON-RPC endpoint plus
//! its websocket twin.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::{pubsub_client::PubsubClient, rpc_client::RpcClient},
    rpc_config::{RpcSendTransactionConfig, RpcSignatureSubscribeConfig, RpcTransactionConfig},
    rpc_request::TokenAccountsFilter,
};
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::{option_serializer::OptionSerializer, UiTransactionEncoding};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    common::parse_pubkey,
    constants::BLOCK_HEIGHT_POLL_INTERVAL,
    error::Result,
    transaction::BlockhashLease,
};

/// How a cancellable confirmation wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmSignal {
    Confirmed,
    /// The chain passed the deadline height first.
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub slot: u64,
    /// Reached at least confirmed commitment.
    pub confirmed: bool,
    pub err: Option<String>,
}

/// Execution result of a landed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub slot: u64,
    pub err: Option<String>,
    pub logs: Vec<String>,
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Broadcast without preflight. Duplicates of an already seen transaction are harmless.
    async fn send_raw_transaction(&self, bytes: &[u8]) -> Result<Signature>;

    async fn get_latest_blockhash(&self) -> Result<BlockhashLease>;

    async fn get_block_height(&self) -> Result<u64>;

    /// Wait until `signature` is confirmed, the block height passes
    /// `last_valid_block_height`, or `cancel` fires. One call holds at most one
    /// subscription connection, closed before returning.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
        cancel: &CancellationToken,
    ) -> Result<ConfirmSignal>;

    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>>;

    /// May lag behind the status path.
    async fn get_transaction(&self, signature: &Signature) -> Result<Option<TransactionRecord>>;

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Account>>;

    async fn get_token_accounts_by_owner(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Vec<Pubkey>>;
}

pub struct SolanaRpc {
    client: RpcClient,
    ws_url: String,
    commitment: CommitmentConfig,
    block_height_poll_interval: Duration,
}

impl SolanaRpc {
    pub fn new(rpc_url: String, ws_url: String) -> Self {
        let commitment = CommitmentConfig::confirmed();
        Self {
            client: RpcClient::new_with_commitment(rpc_url, commitment),
            ws_url,
            commitment,
            block_height_poll_interval: BLOCK_HEIGHT_POLL_INTERVAL,
        }
    }

    pub fn with_block_height_poll_interval(mut self, interval: Duration) -> Self {
        self.block_height_poll_interval = interval;
        self
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Resolves once the block height is beyond `deadline`. Read errors are
    /// logged and retried on the next tick.
    async fn wait_for_block_height(&self, deadline: u64) {
        loop {
            match self.get_block_height().await {
                Ok(height) if height > deadline => return,
                Ok(_) => {}
                Err(e) => warn!(error = %e, "block height read failed"),
            }
            tokio::time::sleep(self.block_height_poll_interval).await;
        }
    }

    async fn height_only(&self, deadline: u64, cancel: &CancellationToken) -> ConfirmSignal {
        tokio::select! {
            _ = cancel.cancelled() => ConfirmSignal::Cancelled,
            _ = self.wait_for_block_height(deadline) => ConfirmSignal::Expired,
        }
    }

    /// Subscribe on `pubsub` and wait. A failed subscription or a stream that
    /// closes early degrades to the height watch.
    async fn watch_signature(
        &self,
        pubsub: &PubsubClient,
        signature: &Signature,
        deadline: u64,
        cancel: &CancellationToken,
    ) -> ConfirmSignal {
        let subscription = pubsub
            .signature_subscribe(
                signature,
                Some(RpcSignatureSubscribeConfig {
                    commitment: Some(self.commitment),
                    enable_received_notification: Some(false),
                }),
            )
            .await;
        let (mut notifications, unsubscribe) = match subscription {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, %signature, "signature subscribe failed, watching block height only");
                return self.height_only(deadline, cancel).await;
            }
        };

        let signal = tokio::select! {
            _ = cancel.cancelled() => ConfirmSignal::Cancelled,
            _ = self.wait_for_block_height(deadline) => ConfirmSignal::Expired,
            notification = notifications.next() => match notification {
                Some(response) => {
                    debug!(slot = response.context.slot, %signature, "signature notification");
                    ConfirmSignal::Confirmed
                }
                None => {
                    warn!(%signature, "signature stream closed, watching block height only");
                    self.height_only(deadline, cancel).await
                }
            },
        };

        drop(notifications);
        unsubscribe().await;
        signal
    }
}

/// `getTransaction` answers `null` until the transaction is visible, which the
/// typed client reports as a deserialization failure.
fn is_not_yet_visible(error: &ClientError) -> bool {
    matches!(error.kind(), ClientErrorKind::SerdeJson(e) if e.to_string().contains("null"))
}

#[async_trait]
impl LedgerRpc for SolanaRpc {
    async fn send_raw_transaction(&self, bytes: &[u8]) -> Result<Signature> {
        let transaction: VersionedTransaction = bincode::deserialize(bytes)?;
        let signature = self
            .client
            .send_transaction_with_config(
                &transaction,
                RpcSendTransactionConfig {
                    skip_preflight: true,
                    ..RpcSendTransactionConfig::default()
                },
            )
            .await?;
        Ok(signature)
    }

    async fn get_latest_blockhash(&self) -> Result<BlockhashLease> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await?;
        Ok(BlockhashLease {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn get_block_height(&self) -> Result<u64> {
        Ok(self
            .client
            .get_block_height_with_commitment(self.commitment)
            .await?)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
        cancel: &CancellationToken,
    ) -> Result<ConfirmSignal> {
        let pubsub = match PubsubClient::new(&self.ws_url).await {
            Ok(pubsub) => pubsub,
            Err(e) => {
                warn!(error = %e, ws_url = %self.ws_url, "signature subscription unavailable, watching block height only");
                return Ok(self.height_only(last_valid_block_height, cancel).await);
            }
        };

        let signal = self
            .watch_signature(&pubsub, signature, last_valid_block_height, cancel)
            .await;
        if let Err(e) = pubsub.shutdown().await {
            debug!(error = %e, "websocket shutdown failed");
        }
        Ok(signal)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>> {
        let response = self.client.get_signature_statuses(&[*signature]).await?;
        Ok(response
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| SignatureStatus {
                slot: status.slot,
                confirmed: status.satisfies_commitment(self.commitment),
                err: status.err.map(|e| e.to_string()),
            }))
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<Option<TransactionRecord>> {
        let response = self
            .client
            .get_transaction_with_config(
                signature,
                RpcTransactionConfig {
                    encoding: Some(UiTransactionEncoding::Base64),
                    commitment: Some(self.commitment),
                    max_supported_transaction_version: Some(0),
                },
            )
            .await;
        let transaction = match response {
            Ok(transaction) => transaction,
            Err(e) if is_not_yet_visible(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Some(meta) = transaction.transaction.meta else {
            return Ok(None);
        };
        let logs = match meta.log_messages {
            OptionSerializer::Some(logs) => logs,
            _ => vec![],
        };
        Ok(Some(TransactionRecord {
            slot: transaction.slot,
            err: meta.err.map(|e| e.to_string()),
            logs,
        }))
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Account>> {
        Ok(self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await?
            .value)
    }

    async fn get_token_accounts_by_owner(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Vec<Pubkey>> {
        self.client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::Mint(*mint))
            .await?
            .into_iter()
            .map(|keyed| parse_pubkey("token_account", &keyed.pubkey))
            .collect()
    }
}
