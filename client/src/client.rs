//! One async operation per vault instruction.
//!
//! Each operation checks its inputs against the configured schema, resolves
//! addresses and token accounts, builds the instruction, wraps it in the
//! compute budget its call site uses, signs, and hands the envelope to the
//! delivery engine. Token accounts are only looked up (or created) once the
//! instruction is known to be buildable. An `Err` from the vault instruction
//! itself means it was never broadcast; once it is on the wire the result is a
//! [`TxOutcome`].

use solana_program::{instruction::Instruction, pubkey::Pubkey};
use solana_sdk::signature::Signer;
use spl_associated_token_account::get_associated_token_address;
use tracing::{debug, info};

use crate::{
    config::ClientConfig,
    error::Result,
    instruction::{UpdateVaultParams, VaultParams},
    instructions::{self, DepositArgs, ManagerTransferArgs, ProgramIds, SpotMarketAccounts, UpdateDelegateArgs, VaultAccounts},
    rpc::{LedgerRpc, SolanaRpc},
    sender::{send_and_confirm, TxOutcome},
    state::{decode_account, Vault, VaultDepositor},
    token::{get_or_create_associated_token_account, resolve_owner_token_account},
    transaction::{assemble, sign, BudgetPolicy},
};

pub struct VaultClient<R: LedgerRpc> {
    rpc: R,
    config: ClientConfig,
}

impl VaultClient<SolanaRpc> {
    /// Client over the JSON-RPC and websocket endpoints named in `config`.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let rpc = SolanaRpc::new(config.rpc_url.clone(), config.ws_url())
            .with_block_height_poll_interval(config.engine.block_height_poll_interval);
        Ok(Self { rpc, config })
    }
}

impl<R: LedgerRpc> VaultClient<R> {
    pub fn new(rpc: R, config: ClientConfig) -> Self {
        Self { rpc, config }
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn program_ids(&self) -> ProgramIds {
        ProgramIds {
            vault_program: self.config.program_id,
            drift_program: self.config.drift_program_id,
            schema: self.config.schema,
        }
    }

    /// Configured spot market. Fails before any network call when incomplete.
    pub fn market(&self) -> Result<SpotMarketAccounts> {
        self.config.market.resolve(&self.config.drift_program_id)
    }

    pub async fn initialize_vault<S: Signer>(&self, payer: &S, name: &str) -> Result<TxOutcome> {
        let ix = instructions::initialize_vault(&self.program_ids(), &payer.pubkey(), name)?;
        self.execute(payer, ix, BudgetPolicy::None).await
    }

    pub async fn initialize_drift<S: Signer>(&self, payer: &S, name: &str) -> Result<TxOutcome> {
        let ix = instructions::initialize_drift(&self.program_ids(), &payer.pubkey(), name)?;
        self.execute(payer, ix, BudgetPolicy::LimitAndPrice).await
    }

    /// Creates the vault's token account for the market mint first when needed.
    pub async fn initialize_vault_with_drift<S: Signer>(
        &self,
        manager: &S,
        params: &VaultParams,
    ) -> Result<TxOutcome> {
        let ids = self.program_ids();
        let market = self.market()?;
        instructions::initialize_vault_with_drift(
            &ids,
            &manager.pubkey(),
            &Pubkey::default(),
            params,
        )?;
        let accounts = VaultAccounts::resolve(&ids, &params.name)?;
        let vault_token_account = self.ensure_ata(manager, &accounts.vault, &market.mint).await?;

        let ix = instructions::initialize_vault_with_drift(
            &ids,
            &manager.pubkey(),
            &vault_token_account,
            params,
        )?;
        self.execute(manager, ix, BudgetPolicy::LimitAndPrice).await
    }

    pub async fn initialize_vault_depositor<S: Signer>(
        &self,
        authority: &S,
        name: &str,
    ) -> Result<TxOutcome> {
        let ix = instructions::initialize_vault_depositor(&self.program_ids(), &authority.pubkey(), name)?;
        self.execute(authority, ix, BudgetPolicy::LimitAndPrice).await
    }

    /// `user_pubkey` keys the legacy user-info record and is ignored by schema V2.
    pub async fn deposit<S: Signer>(
        &self,
        authority: &S,
        name: &str,
        user_pubkey: &str,
        amount: u64,
    ) -> Result<TxOutcome> {
        let market = self.market()?;
        let ix = self
            .transfer_instruction(authority, &market, name, user_pubkey, amount, instructions::deposit)
            .await?;
        self.execute(authority, ix, BudgetPolicy::LimitAndPrice).await
    }

    pub async fn withdraw<S: Signer>(
        &self,
        authority: &S,
        name: &str,
        user_pubkey: &str,
        amount: u64,
    ) -> Result<TxOutcome> {
        let market = self.market()?;
        let ix = self
            .transfer_instruction(authority, &market, name, user_pubkey, amount, instructions::withdraw)
            .await?;
        self.execute(authority, ix, BudgetPolicy::LimitAndPrice).await
    }

    pub async fn request_withdraw<S: Signer>(
        &self,
        authority: &S,
        name: &str,
        amount: u64,
    ) -> Result<TxOutcome> {
        let market = self.market()?;
        let ix = instructions::request_withdraw(
            &self.program_ids(),
            &market,
            &authority.pubkey(),
            name,
            amount,
        )?;
        self.execute(authority, ix, BudgetPolicy::LimitAndPrice).await
    }

    pub async fn cancel_withdraw_request<S: Signer>(
        &self,
        authority: &S,
        name: &str,
    ) -> Result<TxOutcome> {
        let market = self.market()?;
        let ix = instructions::cancel_withdraw_request(
            &self.program_ids(),
            &market,
            &authority.pubkey(),
            name,
        )?;
        self.execute(authority, ix, BudgetPolicy::LimitAndPrice).await
    }

    pub async fn update_delegate<S: Signer>(
        &self,
        payer: &S,
        name: &str,
        delegate: Pubkey,
        sub_account: u16,
    ) -> Result<TxOutcome> {
        let args = UpdateDelegateArgs {
            name: name.to_string(),
            delegate,
            sub_account,
        };
        let ix = instructions::update_delegate(&self.program_ids(), &payer.pubkey(), &args)?;
        self.execute(payer, ix, BudgetPolicy::LimitOnly).await
    }

    pub async fn reset_delegate<S: Signer>(&self, manager: &S, name: &str) -> Result<TxOutcome> {
        let ix = instructions::reset_delegate(&self.program_ids(), &manager.pubkey(), name)?;
        self.execute(manager, ix, BudgetPolicy::LimitOnly).await
    }

    pub async fn update_vault<S: Signer>(
        &self,
        manager: &S,
        name: &str,
        params: &UpdateVaultParams,
    ) -> Result<TxOutcome> {
        let ix = instructions::update_vault(&self.program_ids(), &manager.pubkey(), name, params)?;
        self.execute(manager, ix, BudgetPolicy::LimitOnly).await
    }

    pub async fn manager_deposit<S: Signer>(
        &self,
        manager: &S,
        name: &str,
        amount: u64,
    ) -> Result<TxOutcome> {
        let market = self.market()?;
        let ix = self
            .manager_instruction(manager, &market, name, amount, instructions::manager_deposit)
            .await?;
        self.execute(manager, ix, BudgetPolicy::LimitAndPrice).await
    }

    pub async fn manager_withdraw<S: Signer>(
        &self,
        manager: &S,
        name: &str,
        amount: u64,
    ) -> Result<TxOutcome> {
        let market = self.market()?;
        let ix = self
            .manager_instruction(manager, &market, name, amount, instructions::manager_withdraw)
            .await?;
        self.execute(manager, ix, BudgetPolicy::LimitAndPrice).await
    }

    pub async fn manager_collect_fees<S: Signer>(
        &self,
        manager: &S,
        name: &str,
        amount: u64,
    ) -> Result<TxOutcome> {
        let market = self.market()?;
        let ix = self
            .manager_instruction(manager, &market, name, amount, instructions::manager_collect_fees)
            .await?;
        self.execute(manager, ix, BudgetPolicy::LimitAndPrice).await
    }

    /// The vault account for `name`, or `None` if it was never created.
    pub async fn fetch_vault(&self, name: &str) -> Result<Option<Vault>> {
        let (address, _) = Vault::get_pda(name, &self.config.program_id, self.config.schema)?;
        self.fetch(&address).await
    }

    pub async fn fetch_vault_depositor(
        &self,
        name: &str,
        authority: &Pubkey,
    ) -> Result<Option<VaultDepositor>> {
        let (vault, _) = Vault::get_pda(name, &self.config.program_id, self.config.schema)?;
        let (address, _) = VaultDepositor::get_pda(&vault, authority, &self.config.program_id)?;
        self.fetch(&address).await
    }

    async fn fetch<T: borsh::BorshDeserialize>(&self, address: &Pubkey) -> Result<Option<T>> {
        match self.rpc.get_account_info(address).await? {
            Some(account) => decode_account(address, &account.data).map(Some),
            None => {
                debug!(%address, "account not found");
                Ok(None)
            }
        }
    }

    /// Builds with `build` once against placeholder token accounts so every
    /// input check runs before a token account is looked up or created, then
    /// again with the real ones.
    async fn transfer_instruction<S, F>(
        &self,
        authority: &S,
        market: &SpotMarketAccounts,
        name: &str,
        user_pubkey: &str,
        amount: u64,
        build: F,
    ) -> Result<Instruction>
    where
        S: Signer,
        F: Fn(&ProgramIds, &SpotMarketAccounts, &DepositArgs) -> Result<Instruction>,
    {
        let ids = self.program_ids();
        let mut args = DepositArgs {
            name: name.to_string(),
            amount,
            authority: authority.pubkey(),
            user_pubkey: user_pubkey.to_string(),
            user_token_account: Pubkey::default(),
            vault_token_account: Pubkey::default(),
            treasury_token_account: Pubkey::default(),
        };
        build(&ids, market, &args)?;

        let accounts = VaultAccounts::resolve(&ids, name)?;
        args.user_token_account = resolve_owner_token_account(
            &self.rpc,
            authority,
            &authority.pubkey(),
            &market.mint,
            &self.config.engine,
            &self.config.compute_budget,
        )
        .await?;
        args.vault_token_account = self.ensure_ata(authority, &accounts.vault, &market.mint).await?;
        args.treasury_token_account = self.ensure_ata(authority, &accounts.treasury, &market.mint).await?;
        build(&ids, market, &args)
    }

    async fn manager_instruction<S, F>(
        &self,
        manager: &S,
        market: &SpotMarketAccounts,
        name: &str,
        amount: u64,
        build: F,
    ) -> Result<Instruction>
    where
        S: Signer,
        F: Fn(&ProgramIds, &SpotMarketAccounts, &ManagerTransferArgs) -> Result<Instruction>,
    {
        let ids = self.program_ids();
        let mut args = ManagerTransferArgs {
            name: name.to_string(),
            amount,
            manager: manager.pubkey(),
            manager_token_account: Pubkey::default(),
            vault_token_account: Pubkey::default(),
        };
        build(&ids, market, &args)?;

        let accounts = VaultAccounts::resolve(&ids, name)?;
        args.manager_token_account = resolve_owner_token_account(
            &self.rpc,
            manager,
            &manager.pubkey(),
            &market.mint,
            &self.config.engine,
            &self.config.compute_budget,
        )
        .await?;
        args.vault_token_account = self.ensure_ata(manager, &accounts.vault, &market.mint).await?;
        build(&ids, market, &args)
    }

    async fn ensure_ata<S: Signer>(&self, payer: &S, owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey> {
        get_or_create_associated_token_account(
            &self.rpc,
            payer,
            owner,
            mint,
            &self.config.engine,
            &self.config.compute_budget,
        )
        .await
    }

    /// Fresh lease, budget directives, sign, deliver.
    async fn execute<S: Signer>(
        &self,
        signer: &S,
        instruction: Instruction,
        policy: BudgetPolicy,
    ) -> Result<TxOutcome> {
        let payer = signer.pubkey();
        let instructions = self.config.compute_budget.prepend(policy, instruction);
        let lease = self.rpc.get_latest_blockhash().await?;
        let message = assemble(&payer, &lease, &instructions)?;
        let envelope = sign(message, &[signer], lease)?;

        info!(
            signature = %envelope.signature,
            %payer,
            instructions = instructions.len(),
            last_valid_block_height = lease.last_valid_block_height,
            "transaction assembled"
        );
        Ok(send_and_confirm(&self.rpc, &envelope, &self.config.engine).await)
    }
}

/// Address the vault's token account for `mint` lives at.
pub fn vault_token_address(vault: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(vault, mint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MarketConfig,
        error::VaultClientError,
        instruction::{InstructionKind, SchemaVersion, VaultInstruction},
        state::vault::tests::sample,
        test_utils::MockRpc,
    };
    use solana_sdk::{
        account::Account, compute_budget, signature::Keypair, transaction::VersionedTransaction,
    };

    fn config(schema: SchemaVersion) -> ClientConfig {
        ClientConfig {
            program_id: Pubkey::new_from_array([7; 32]),
            schema,
            market: MarketConfig {
                market_index: 0,
                mint: Some(Pubkey::new_from_array([6; 32])),
                oracle: Some(Pubkey::new_from_array([9; 32])),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn token_account() -> Account {
        Account {
            lamports: 2_039_280,
            data: vec![],
            owner: spl_token::id(),
            executable: false,
            rent_epoch: 0,
        }
    }

    /// A ledger where `authority` and the vault already hold token accounts.
    fn funded(config: &ClientConfig, authority: &Pubkey, name: &str) -> MockRpc {
        let ids = ProgramIds {
            vault_program: config.program_id,
            drift_program: config.drift_program_id,
            schema: config.schema,
        };
        let accounts = VaultAccounts::resolve(&ids, name).unwrap();
        let mint = config.market.mint.unwrap();
        MockRpc::landing()
            .with_token_account(*authority, mint, Pubkey::new_from_array([3; 32]))
            .with_account(vault_token_address(&accounts.vault, &mint), token_account())
            .with_account(vault_token_address(&accounts.treasury, &mint), token_account())
    }

    fn programs(tx: &VersionedTransaction) -> Vec<Pubkey> {
        let keys = tx.message.static_account_keys();
        tx.message
            .instructions()
            .iter()
            .map(|ix| keys[ix.program_id_index as usize])
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn deposit_sends_one_transaction_with_full_account_list() {
        let authority = Keypair::new();
        let config = config(SchemaVersion::V2);
        let rpc = funded(&config, &authority.pubkey(), "bulk1");
        let client = VaultClient::new(rpc, config.clone());

        let outcome = client
            .deposit(&authority, "bulk1", &authority.pubkey().to_string(), 1_000_000)
            .await
            .unwrap();
        assert!(outcome.is_success(), "{outcome}");

        let sent = client.rpc().sent_transactions();
        assert_eq!(sent.len(), 1);
        let tx = &sent[0];
        assert_eq!(
            programs(tx),
            vec![compute_budget::id(), compute_budget::id(), config.program_id]
        );
        let deposit = &tx.message.instructions()[2];
        assert_eq!(deposit.accounts.len(), 17);
        assert_eq!(
            VaultInstruction::unpack(&deposit.data).unwrap(),
            VaultInstruction::Deposit {
                name: "bulk1".into(),
                amount: 1_000_000
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_oracle_fails_before_any_network_call() {
        let authority = Keypair::new();
        let mut config = config(SchemaVersion::V2);
        config.market.oracle = None;
        let client = VaultClient::new(MockRpc::landing(), config);

        let err = client
            .deposit(&authority, "bulk1", "", 1_000_000)
            .await
            .unwrap_err();

        assert!(matches!(err, VaultClientError::MissingAccount("oracle")));
        assert_eq!(client.rpc().network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn legacy_deposit_requires_user_pubkey() {
        let authority = Keypair::new();
        // Nothing funded: a token lookup here would mean creating accounts.
        let client = VaultClient::new(MockRpc::landing(), config(SchemaVersion::V1));

        let err = client.deposit(&authority, "bulk1", "", 5).await.unwrap_err();

        assert!(matches!(err, VaultClientError::MissingAccount("user_pubkey")));
        assert_eq!(client.rpc().network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn legacy_manager_transfers_fail_before_token_accounts() {
        let manager = Keypair::new();
        let client = VaultClient::new(MockRpc::landing(), config(SchemaVersion::V1));

        let err = client.manager_deposit(&manager, "bulk1", 5).await.unwrap_err();
        assert!(matches!(
            err,
            VaultClientError::UnsupportedSchema {
                instruction: InstructionKind::ManagerDeposit,
                schema: SchemaVersion::V1
            }
        ));
        assert!(client.manager_withdraw(&manager, "bulk1", 5).await.is_err());
        assert!(client.manager_collect_fees(&manager, "bulk1", 5).await.is_err());
        let params = VaultParams::with_defaults("bulk1", 0);
        assert!(client.initialize_vault_with_drift(&manager, &params).await.is_err());

        assert_eq!(client.rpc().network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_name_fails_before_token_accounts() {
        let authority = Keypair::new();
        let client = VaultClient::new(MockRpc::landing(), config(SchemaVersion::V2));

        let err = client.withdraw(&authority, "", "", 5).await.unwrap_err();

        assert!(matches!(err, VaultClientError::EmptyVaultName));
        assert_eq!(client.rpc().network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn withdraw_redeems_the_pending_request() {
        let authority = Keypair::new();
        let config = config(SchemaVersion::V2);
        let rpc = funded(&config, &authority.pubkey(), "bulk1");
        let client = VaultClient::new(rpc, config);

        let outcome = client.withdraw(&authority, "bulk1", "", 500).await.unwrap();
        assert!(outcome.is_success(), "{outcome}");

        let sent = client.rpc().sent_transactions();
        assert_eq!(sent.len(), 1);
        let withdraw = &sent[0].message.instructions()[2];
        assert_eq!(withdraw.data, vec![5]);
        assert_eq!(withdraw.accounts.len(), 18);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_vault_token_account_is_created_first() {
        let authority = Keypair::new();
        let config = config(SchemaVersion::V2);
        let mint = config.market.mint.unwrap();
        let rpc = MockRpc::landing().with_token_account(
            authority.pubkey(),
            mint,
            Pubkey::new_unique(),
        );
        let client = VaultClient::new(rpc, config);

        let outcome = client
            .manager_deposit(&authority, "bulk1", 2_000_000)
            .await
            .unwrap();

        assert!(outcome.is_success());
        let sent = client.rpc().sent_transactions();
        assert_eq!(sent.len(), 2);
        assert!(programs(&sent[0]).contains(&spl_associated_token_account::id()));
        assert_eq!(*programs(&sent[1]).last().unwrap(), client.config().program_id);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_policy_follows_call_site() {
        let payer = Keypair::new();
        let client = VaultClient::new(MockRpc::landing(), config(SchemaVersion::V1));

        client.initialize_vault(&payer, "bulk1").await.unwrap();
        client
            .update_delegate(&payer, "bulk1", Pubkey::new_unique(), 0)
            .await
            .unwrap();
        client.initialize_drift(&payer, "bulk1").await.unwrap();

        let sent = client.rpc().sent_transactions();
        assert_eq!(sent.len(), 3);
        assert_eq!(programs(&sent[0]), vec![client.config().program_id]);
        assert_eq!(
            programs(&sent[1]),
            vec![compute_budget::id(), client.config().program_id]
        );
        assert_eq!(programs(&sent[2]).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn legacy_schema_has_no_reset_delegate() {
        let payer = Keypair::new();
        let client = VaultClient::new(MockRpc::landing(), config(SchemaVersion::V1));

        let err = client.reset_delegate(&payer, "bulk1").await.unwrap_err();

        assert!(matches!(
            err,
            VaultClientError::UnsupportedSchema {
                instruction: InstructionKind::ResetDelegate,
                schema: SchemaVersion::V1
            }
        ));
        assert_eq!(client.rpc().network_calls(), 0);
    }

    #[tokio::test]
    async fn fetch_vault_decodes_account_data() {
        let config = config(SchemaVersion::V2);
        let (address, _) = Vault::get_pda("bulk1", &config.program_id, config.schema).unwrap();
        let vault = sample("bulk1");
        let mut data = borsh::to_vec(&vault).unwrap();
        data.extend([0u8; 64]);
        let rpc = MockRpc::new().with_account(
            address,
            Account {
                lamports: 1,
                data,
                owner: config.program_id,
                executable: false,
                rent_epoch: 0,
            },
        );
        let client = VaultClient::new(rpc, config);

        assert_eq!(client.fetch_vault("bulk1").await.unwrap(), Some(vault));
        assert_eq!(client.fetch_vault("bulk2").await.unwrap(), None);
        assert_eq!(
            client
                .fetch_vault_depositor("bulk1", &Pubkey::new_unique())
                .await
                .unwrap(),
            None
        );
    }
}
