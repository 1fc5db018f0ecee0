use solana_program::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use tracing::{debug, info};

use crate::{
    config::EngineConfig,
    error::{Result, VaultClientError},
    rpc::LedgerRpc,
    sender::send_and_confirm,
    transaction::{assemble, sign, BudgetPolicy, ComputeBudget},
};

/// The associated token account of `owner` for `mint`, created through the
/// delivery engine when it does not exist yet. `payer` funds the creation.
pub async fn get_or_create_associated_token_account<R, S>(
    rpc: &R,
    payer: &S,
    owner: &Pubkey,
    mint: &Pubkey,
    engine: &EngineConfig,
    budget: &ComputeBudget,
) -> Result<Pubkey>
where
    R: LedgerRpc + ?Sized,
    S: Signer,
{
    let address = get_associated_token_address(owner, mint);

    if let Some(account) = rpc.get_account_info(&address).await? {
        if account.owner != spl_token::id() {
            return Err(VaultClientError::TokenAccountCreation {
                address,
                reason: format!("address is held by program {}", account.owner),
            });
        }
        debug!(%address, %owner, %mint, "token account exists");
        return Ok(address);
    }

    info!(%address, %owner, %mint, "creating associated token account");
    let instruction =
        create_associated_token_account_idempotent(&payer.pubkey(), owner, mint, &spl_token::id());
    let lease = rpc.get_latest_blockhash().await?;
    let message = assemble(
        &payer.pubkey(),
        &lease,
        &budget.prepend(BudgetPolicy::LimitAndPrice, instruction),
    )?;
    let envelope = sign(message, &[payer], lease)?;

    let outcome = send_and_confirm(rpc, &envelope, engine).await;
    if outcome.is_success() {
        Ok(address)
    } else {
        Err(VaultClientError::TokenAccountCreation {
            address,
            reason: outcome.to_string(),
        })
    }
}

/// Any token account `owner` already holds for `mint`, else its associated
/// token account (created if absent).
pub async fn resolve_owner_token_account<R, S>(
    rpc: &R,
    payer: &S,
    owner: &Pubkey,
    mint: &Pubkey,
    engine: &EngineConfig,
    budget: &ComputeBudget,
) -> Result<Pubkey>
where
    R: LedgerRpc + ?Sized,
    S: Signer,
{
    if let Some(existing) = rpc.get_token_accounts_by_owner(owner, mint).await?.first() {
        debug!(token_account = %existing, %owner, %mint, "using existing token account");
        return Ok(*existing);
    }
    get_or_create_associated_token_account(rpc, payer, owner, mint, engine, budget).await
}
