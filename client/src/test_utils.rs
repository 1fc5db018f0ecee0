use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::{
    account::Account,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Result, VaultClientError},
    rpc::{ConfirmSignal, LedgerRpc, SignatureStatus, TransactionRecord},
    transaction::{assemble, sign, BlockhashLease, TransactionEnvelope},
};

/// How the push confirmation source behaves.
#[derive(Debug, Clone)]
pub enum PushScript {
    Never,
    ConfirmAfter(Duration),
    ExpireAfter(Duration),
    Fail,
}

/// Blocks the mock chain produces per elapsed interval.
const BLOCK_TIME: Duration = Duration::from_millis(400);

/// Scripted ledger. Every call is counted; sends are timestamped on the
/// (paused) tokio clock, and the block height advances with it.
pub struct MockRpc {
    lease: BlockhashLease,
    genesis: Instant,
    start_height: u64,
    fail_block_height: bool,
    push: PushScript,
    confirm_on_poll: Option<usize>,
    fail_sends: bool,
    lookup: Mutex<VecDeque<Result<Option<TransactionRecord>>>>,
    landing: bool,
    sends: Mutex<Vec<(Instant, Vec<u8>)>>,
    status_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    network_calls: AtomicUsize,
    confirmed_at: Mutex<Option<Instant>>,
    last_deadline: Mutex<Option<u64>>,
    accounts: Mutex<HashMap<Pubkey, Account>>,
    token_accounts: Mutex<HashMap<(Pubkey, Pubkey), Vec<Pubkey>>>,
}

impl MockRpc {
    pub fn new() -> Self {
        crate::common::init_tracing();
        Self {
            lease: BlockhashLease {
                blockhash: Hash::new_unique(),
                last_valid_block_height: 1_000,
            },
            genesis: Instant::now(),
            start_height: 0,
            fail_block_height: false,
            push: PushScript::Never,
            confirm_on_poll: None,
            fail_sends: false,
            lookup: Mutex::new(VecDeque::new()),
            landing: false,
            sends: Mutex::new(vec![]),
            status_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
            network_calls: AtomicUsize::new(0),
            confirmed_at: Mutex::new(None),
            last_deadline: Mutex::new(None),
            accounts: Mutex::new(HashMap::new()),
            token_accounts: Mutex::new(HashMap::new()),
        }
    }

    /// Confirms every transaction quickly and reports it landed without error.
    pub fn landing() -> Self {
        let mut rpc = Self::new().with_push(PushScript::ConfirmAfter(Duration::from_millis(100)));
        rpc.landing = true;
        rpc
    }

    pub fn with_push(mut self, push: PushScript) -> Self {
        self.push = push;
        self
    }

    pub fn confirm_on_poll(mut self, call: usize) -> Self {
        self.confirm_on_poll = Some(call);
        self
    }

    /// Height at the moment the mock was built.
    pub fn with_block_height(mut self, height: u64) -> Self {
        self.start_height = height;
        self
    }

    pub fn failing_block_height(mut self) -> Self {
        self.fail_block_height = true;
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn with_lookup(self, script: Vec<Result<Option<TransactionRecord>>>) -> Self {
        *self.lookup.lock().unwrap() = script.into();
        self
    }

    pub fn with_account(self, address: Pubkey, account: Account) -> Self {
        self.accounts.lock().unwrap().insert(address, account);
        self
    }

    pub fn with_token_account(self, owner: Pubkey, mint: Pubkey, token_account: Pubkey) -> Self {
        self.token_accounts
            .lock()
            .unwrap()
            .entry((owner, mint))
            .or_default()
            .push(token_account);
        self
    }

    /// A signed envelope against this mock's lease.
    pub fn envelope(&self) -> TransactionEnvelope {
        let payer = Keypair::new();
        let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1);
        let message = assemble(&payer.pubkey(), &self.lease, &[ix]).unwrap();
        sign(message, &[&payer], self.lease).unwrap()
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }

    pub fn send_times(&self) -> Vec<Instant> {
        self.sends.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    /// Distinct transactions broadcast, in first-send order.
    pub fn sent_transactions(&self) -> Vec<VersionedTransaction> {
        let mut seen: Vec<Signature> = vec![];
        let mut out = vec![];
        for (_, bytes) in self.sends.lock().unwrap().iter() {
            let tx: VersionedTransaction = bincode::deserialize(bytes).unwrap();
            if !seen.contains(&tx.signatures[0]) {
                seen.push(tx.signatures[0]);
                out.push(tx);
            }
        }
        out
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }

    pub fn confirmed_at(&self) -> Option<Instant> {
        *self.confirmed_at.lock().unwrap()
    }

    pub fn last_deadline(&self) -> Option<u64> {
        *self.last_deadline.lock().unwrap()
    }

    fn mark_confirmed(&self) {
        self.confirmed_at.lock().unwrap().get_or_insert_with(Instant::now);
    }

    fn touch(&self) {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerRpc for MockRpc {
    async fn send_raw_transaction(&self, bytes: &[u8]) -> Result<Signature> {
        self.touch();
        self.sends.lock().unwrap().push((Instant::now(), bytes.to_vec()));
        if self.fail_sends {
            return Err(VaultClientError::Rpc("connection reset".into()));
        }
        let tx: VersionedTransaction = bincode::deserialize(bytes)?;
        Ok(tx.signatures[0])
    }

    async fn get_latest_blockhash(&self) -> Result<BlockhashLease> {
        self.touch();
        Ok(self.lease)
    }

    async fn confirm_transaction(
        &self,
        _signature: &Signature,
        last_valid_block_height: u64,
        cancel: &CancellationToken,
    ) -> Result<ConfirmSignal> {
        self.touch();
        *self.last_deadline.lock().unwrap() = Some(last_valid_block_height);
        match &self.push {
            PushScript::Never => {
                cancel.cancelled().await;
                Ok(ConfirmSignal::Cancelled)
            }
            PushScript::ConfirmAfter(delay) => tokio::select! {
                _ = cancel.cancelled() => Ok(ConfirmSignal::Cancelled),
                _ = sleep(*delay) => {
                    self.mark_confirmed();
                    Ok(ConfirmSignal::Confirmed)
                }
            },
            PushScript::ExpireAfter(delay) => tokio::select! {
                _ = cancel.cancelled() => Ok(ConfirmSignal::Cancelled),
                _ = sleep(*delay) => Ok(ConfirmSignal::Expired),
            },
            PushScript::Fail => Err(VaultClientError::Rpc("websocket closed".into())),
        }
    }

    async fn get_block_height(&self) -> Result<u64> {
        self.touch();
        if self.fail_block_height {
            return Err(VaultClientError::Rpc("block height unavailable".into()));
        }
        let blocks = self.genesis.elapsed().as_millis() / BLOCK_TIME.as_millis();
        Ok(self.start_height + blocks as u64)
    }

    async fn get_signature_status(&self, _signature: &Signature) -> Result<Option<SignatureStatus>> {
        self.touch();
        let call = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.confirm_on_poll {
            Some(n) if call >= n => {
                self.mark_confirmed();
                Ok(Some(SignatureStatus {
                    slot: 42,
                    confirmed: true,
                    err: None,
                }))
            }
            _ => Ok(None),
        }
    }

    async fn get_transaction(&self, _signature: &Signature) -> Result<Option<TransactionRecord>> {
        self.touch();
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        match self.lookup.lock().unwrap().pop_front() {
            Some(scripted) => scripted,
            None if self.landing => Ok(Some(TransactionRecord {
                slot: 1,
                err: None,
                logs: vec![],
            })),
            None => Ok(None),
        }
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Account>> {
        self.touch();
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_token_accounts_by_owner(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Vec<Pubkey>> {
        self.touch();
        Ok(self
            .token_accounts
            .lock()
            .unwrap()
            .get(&(*owner, *mint))
            .cloned()
            .unwrap_or_default())
    }
}
