//! The submission pipeline: build the recipe, sign it when the recipe asks
//! for a signature, prove, then broadcast. The caller always gets a
//! [`TransactionOutcome`], never an error.

use log::{info, warn};

use crate::types::EngineError;

use super::keys::{RecipeSigner, WalletSecretKeys};
use super::{Recipe, TokenId, TokenType, TransferIntent, TxId, Utxo, WalletEngine};

/// Terminal result of one wizard run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Success { tx_id: TxId },
    Failure { error: String },
}

/// Everything the transfer wizard collects before entering `processing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferParams {
    pub token_type: TokenType,
    pub token: TokenId,
    pub amount: u128,
    pub receiver: String,
}

/// Build, sign if required, prove, and broadcast a single-output transfer.
/// Shielded transfers skip the signing stage; unshielded recipes come back
/// with `requires_signature` set and are signed through the keystore.
pub async fn execute_transfer(
    engine: &dyn WalletEngine,
    params: &TransferParams,
    keys: &WalletSecretKeys,
    keystore: &dyn RecipeSigner,
) -> TransactionOutcome {
    let intent = TransferIntent {
        token_type: params.token_type,
        token: params.token.clone(),
        amount: params.amount,
        receiver: params.receiver.clone(),
    };

    let run = async {
        let mut recipe = engine.transfer_recipe(vec![intent], keys).await?;
        if recipe.requires_signature {
            recipe = engine.sign_recipe(recipe, keystore).await?;
        }
        prove_and_submit(engine, recipe).await
    };
    into_outcome("transfer", run.await)
}

/// Build, prove, and broadcast a dust-registration transaction.
/// `dust_receiver` of `None` keeps the rewards on the wallet's own dust
/// address.
pub async fn execute_registration(
    engine: &dyn WalletEngine,
    utxos: Vec<Utxo>,
    signer: &dyn RecipeSigner,
    dust_receiver: Option<String>,
) -> TransactionOutcome {
    let run = async {
        let recipe = engine.register_recipe(utxos, signer, dust_receiver).await?;
        prove_and_submit(engine, recipe).await
    };
    into_outcome("dust registration", run.await)
}

/// Build, prove, and broadcast a dust-deregistration transaction.
pub async fn execute_deregistration(
    engine: &dyn WalletEngine,
    utxos: Vec<Utxo>,
    signer: &dyn RecipeSigner,
) -> TransactionOutcome {
    let run = async {
        let recipe = engine.deregister_recipe(utxos, signer).await?;
        prove_and_submit(engine, recipe).await
    };
    into_outcome("dust deregistration", run.await)
}

async fn prove_and_submit(
    engine: &dyn WalletEngine,
    recipe: Recipe,
) -> Result<TxId, EngineError> {
    let proven = engine.finalize_recipe(recipe).await?;
    engine.submit_transaction(proven).await
}

fn into_outcome(label: &str, result: Result<TxId, EngineError>) -> TransactionOutcome {
    match result {
        Ok(tx_id) => {
            info!("{label} submitted: {tx_id}");
            TransactionOutcome::Success { tx_id }
        }
        Err(error) => {
            warn!("{label} failed: {error}");
            TransactionOutcome::Failure {
                error: error.to_string(),
            }
        }
    }
}
