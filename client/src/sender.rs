//! Broadcast-and-confirm engine.
//!
//! A signed envelope is sent once, then rebroadcast on a fixed cadence while
//! three sources race: the push subscription, a signature status poll, and a
//! block height watch that settles as expired once the lease deadline passes.
//! The height watch is the engine's own, so a push source that keeps failing
//! cannot keep the resend loop alive. The first to settle wins, a shared
//! [`CancellationToken`] stops the rest, and a bounded lookup then fetches the
//! authoritative execution result.
//!
//! Delivery states: `Sending -> InFlight -> {Confirmed, Expired, Failed}`.

use std::fmt;

use solana_sdk::signature::Signature;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    common::explorer_url,
    config::EngineConfig,
    rpc::{ConfirmSignal, LedgerRpc, TransactionRecord},
    transaction::TransactionEnvelope,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Sending,
    InFlight,
    Confirmed,
    /// Lease ran out without a confirmation. The transaction may still land.
    Expired,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    /// The deadline height passed before any confirmation was seen.
    LeaseExpired,
    /// Confirmed, but the execution result never showed up on the lookup path.
    LookupExhausted,
}

/// What the caller learns about one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Succeeded {
        signature: Signature,
        slot: u64,
    },
    /// Landed, and the program returned an error.
    Rejected {
        signature: Signature,
        slot: u64,
        error: String,
        logs: Vec<String>,
    },
    /// Reissue with a fresh lease rather than resending this envelope.
    Unknown {
        signature: Signature,
        reason: UnknownReason,
    },
    /// Never broadcast: bad input, configuration, or assembly failed.
    RejectedBeforeSend {
        reason: String,
    },
}

impl TxOutcome {
    pub fn state(&self) -> DeliveryState {
        match self {
            TxOutcome::Succeeded { .. } => DeliveryState::Confirmed,
            TxOutcome::Unknown {
                reason: UnknownReason::LeaseExpired,
                ..
            } => DeliveryState::Expired,
            TxOutcome::Unknown {
                reason: UnknownReason::LookupExhausted,
                ..
            } => DeliveryState::Confirmed,
            TxOutcome::Rejected { .. } | TxOutcome::RejectedBeforeSend { .. } => DeliveryState::Failed,
        }
    }

    pub fn signature(&self) -> Option<Signature> {
        match self {
            TxOutcome::Succeeded { signature, .. }
            | TxOutcome::Rejected { signature, .. }
            | TxOutcome::Unknown { signature, .. } => Some(*signature),
            TxOutcome::RejectedBeforeSend { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Succeeded { .. })
    }
}

impl fmt::Display for TxOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxOutcome::Succeeded { signature, slot } => {
                write!(f, "succeeded in slot {slot}: {}", explorer_url(signature))
            }
            TxOutcome::Rejected {
                signature, error, ..
            } => write!(f, "rejected by program ({error}): {}", explorer_url(signature)),
            TxOutcome::Unknown { signature, reason } => {
                write!(f, "outcome unknown ({reason:?}): {}", explorer_url(signature))
            }
            TxOutcome::RejectedBeforeSend { reason } => write!(f, "not sent: {reason}"),
        }
    }
}

/// Which confirmation source settled the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Confirmed,
    Expired,
}

/// Deliver `envelope` and report its outcome. Network failures along the way
/// are logged and retried, never returned.
pub async fn send_and_confirm<R: LedgerRpc + ?Sized>(
    rpc: &R,
    envelope: &TransactionEnvelope,
    config: &EngineConfig,
) -> TxOutcome {
    let started = Instant::now();
    let signature = envelope.signature;
    let deadline = envelope.lease.deadline(config.block_height_safety_margin);

    info!(%signature, state = ?DeliveryState::Sending, deadline, "sending transaction");
    if let Err(e) = rpc.send_raw_transaction(&envelope.bytes).await {
        warn!(%signature, error = %e, "initial send failed, resend loop will retry");
    }

    let cancel = CancellationToken::new();
    let _teardown = cancel.clone().drop_guard();
    debug!(%signature, state = ?DeliveryState::InFlight, "awaiting confirmation");

    let race = async {
        let settled = tokio::select! {
            settled = push_confirmation(rpc, &signature, deadline, config, &cancel) => settled,
            settled = poll_confirmation(rpc, &signature, config, &cancel) => settled,
            settled = deadline_watch(rpc, &signature, deadline, config, &cancel) => settled,
        };
        cancel.cancel();
        settled
    };
    let (settled, resends) = tokio::join!(race, resend_loop(rpc, envelope, config, &cancel));

    match settled {
        Settled::Confirmed => info!(%signature, state = ?DeliveryState::Confirmed, resends, "transaction confirmed"),
        Settled::Expired => warn!(%signature, state = ?DeliveryState::Expired, resends, "lease expired before confirmation"),
    }

    let outcome = match (lookup_transaction(rpc, &signature, config).await, settled) {
        (Some(record), _) => match record.err {
            None => TxOutcome::Succeeded {
                signature,
                slot: record.slot,
            },
            Some(error) => TxOutcome::Rejected {
                signature,
                slot: record.slot,
                error,
                logs: record.logs,
            },
        },
        (None, Settled::Expired) => TxOutcome::Unknown {
            signature,
            reason: UnknownReason::LeaseExpired,
        },
        (None, Settled::Confirmed) => TxOutcome::Unknown {
            signature,
            reason: UnknownReason::LookupExhausted,
        },
    };

    info!(
        %signature,
        state = ?outcome.state(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        url = %explorer_url(&signature),
        "delivery finished"
    );
    outcome
}

/// Rebroadcast the same bytes every `resend_interval` until cancelled. Returns
/// the number of resends issued.
async fn resend_loop<R: LedgerRpc + ?Sized>(
    rpc: &R,
    envelope: &TransactionEnvelope,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> u32 {
    let mut resends = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return resends,
            _ = sleep(config.resend_interval) => {}
        }
        if cancel.is_cancelled() {
            return resends;
        }
        resends += 1;
        if let Err(e) = rpc.send_raw_transaction(&envelope.bytes).await {
            warn!(signature = %envelope.signature, attempt = resends, error = %e, "resend failed");
        }
    }
}

/// Push source. Errors are retried after one poll interval; a cancelled wait
/// never settles the race.
async fn push_confirmation<R: LedgerRpc + ?Sized>(
    rpc: &R,
    signature: &Signature,
    deadline: u64,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Settled {
    loop {
        match rpc.confirm_transaction(signature, deadline, cancel).await {
            Ok(ConfirmSignal::Confirmed) => return Settled::Confirmed,
            Ok(ConfirmSignal::Expired) => return Settled::Expired,
            Ok(ConfirmSignal::Cancelled) => return std::future::pending().await,
            Err(e) => warn!(%signature, error = %e, "confirmation subscription failed"),
        }
        tokio::select! {
            _ = cancel.cancelled() => return std::future::pending().await,
            _ = sleep(config.status_poll_interval) => {}
        }
    }
}

/// Poll source. Only settles on a confirmed status.
async fn poll_confirmation<R: LedgerRpc + ?Sized>(
    rpc: &R,
    signature: &Signature,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Settled {
    loop {
        match rpc.get_signature_status(signature).await {
            Ok(Some(status)) if status.confirmed => {
                debug!(%signature, slot = status.slot, "status poll saw confirmation");
                return Settled::Confirmed;
            }
            Ok(_) => {}
            Err(e) => warn!(%signature, error = %e, "signature status poll failed"),
        }
        tokio::select! {
            _ = cancel.cancelled() => return std::future::pending().await,
            _ = sleep(config.status_poll_interval) => {}
        }
    }
}

/// Height source. Settles once the chain is past `deadline`.
async fn deadline_watch<R: LedgerRpc + ?Sized>(
    rpc: &R,
    signature: &Signature,
    deadline: u64,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Settled {
    loop {
        match rpc.get_block_height().await {
            Ok(height) if height > deadline => {
                debug!(%signature, height, deadline, "block height passed deadline");
                return Settled::Expired;
            }
            Ok(_) => {}
            Err(e) => warn!(%signature, error = %e, "block height read failed"),
        }
        tokio::select! {
            _ = cancel.cancelled() => return std::future::pending().await,
            _ = sleep(config.block_height_poll_interval) => {}
        }
    }
}

/// Fetch the execution result, riding out read replica lag.
async fn lookup_transaction<R: LedgerRpc + ?Sized>(
    rpc: &R,
    signature: &Signature,
    config: &EngineConfig,
) -> Option<TransactionRecord> {
    for attempt in 1..=config.lookup_retries {
        match rpc.get_transaction(signature).await {
            Ok(Some(record)) => return Some(record),
            Ok(None) => debug!(%signature, attempt, "transaction not visible yet"),
            Err(e) => warn!(%signature, attempt, error = %e, "transaction lookup failed"),
        }
        if attempt < config.lookup_retries {
            sleep(config.lookup_delay).await;
        }
    }
    None
}
