//! In-process wallet engine.
//!
//! Runs a deterministic simulated ledger seeded from the wallet seed, with a
//! background task that replays "sync" progress into the state channel. It
//! enforces the same submission rules a network engine would (balance checks,
//! signature requirements, unknown-UTXO rejection), so every UI flow behaves
//! identically against it. A production build swaps in a network-backed
//! implementation of [`WalletEngine`] behind the same trait.

use async_trait::async_trait;
use log::{debug, info};
use sha3::{Digest, Sha3_256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::EnvironmentConfig;
use crate::types::EngineError;
use crate::utils::address::{encode_address, AddressKind};

use super::keys::{derive_role_secret, RecipeSigner, Role, Seed, UnshieldedKeystore, WalletSecretKeys};
use super::{
    DustCoinInfo, FeeEstimate, ProvenTransaction, Recipe, RecipeKind, ShieldedState, SyncProgress,
    TokenType, TransferIntent, TxId, UnshieldedState, Utxo, UtxoMeta, UtxoWithMeta, WalletEngine,
    WalletState, NIGHT_TOKEN_ID,
};

/// Ticks the simulated sync runs for before reporting `synced`.
const SYNC_TARGET: u64 = 24;
const SYNC_TICK: Duration = Duration::from_millis(120);

/// Flat per-UTXO registration fee, in atomic DUST units.
const REGISTRATION_FEE_PER_UTXO: u128 = 50_000;

/// Cap each registered NIGHT coin generates towards, in atomic DUST units.
const DUST_CAP_PER_COIN: u128 = 5_000_000;

struct Ledger {
    state: WalletState,
    next_intent: u64,
}

pub struct LocalEngine {
    ledger: Mutex<Ledger>,
    state_tx: watch::Sender<WalletState>,
    state_rx: watch::Receiver<WalletState>,
    sync_task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl LocalEngine {
    /// Derive addresses from the seed, build the genesis ledger, and start
    /// the background sync task.
    pub async fn start(
        seed: &Seed,
        config: &EnvironmentConfig,
    ) -> Result<Arc<LocalEngine>, EngineError> {
        let network = config.network_id;
        let keystore = UnshieldedKeystore::from_seed(seed);

        let shielded_payload = derive_role_secret(seed, Role::Zswap);
        let dust_payload = derive_role_secret(seed, Role::Dust);

        let shielded_address = encode_address(AddressKind::Shielded, network, &shielded_payload)
            .map_err(|e| EngineError::Startup(e.to_string()))?;
        let unshielded_address =
            encode_address(AddressKind::Unshielded, network, &keystore.public_key().0)
                .map_err(|e| EngineError::Startup(e.to_string()))?;
        let dust_address = encode_address(AddressKind::Dust, network, &dust_payload)
            .map_err(|e| EngineError::Startup(e.to_string()))?;

        let state = genesis_state(seed, shielded_address, unshielded_address, dust_address);
        let (state_tx, state_rx) = watch::channel(state.clone());

        let engine = Arc::new(LocalEngine {
            ledger: Mutex::new(Ledger {
                state,
                next_intent: 1,
            }),
            state_tx,
            state_rx,
            sync_task: Mutex::new(None),
            stopped: AtomicBool::new(false),
        });

        let task = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.run_sync().await }
        });
        *engine.sync_task.lock().expect("sync task lock") = Some(task);

        info!("local engine started on network {}", network.hrp_suffix());
        Ok(engine)
    }

    /// Replay sync progress into the state channel until all three wallets
    /// report fully applied.
    async fn run_sync(self: Arc<LocalEngine>) {
        let mut interval = tokio::time::interval(SYNC_TICK);
        loop {
            interval.tick().await;
            if self.stopped.load(Ordering::SeqCst) {
                return;
            }

            let done = {
                let mut ledger = self.ledger.lock().expect("ledger lock");
                let state = &mut ledger.state;
                for progress in [
                    &mut state.shielded.progress,
                    &mut state.unshielded.progress,
                    &mut state.dust.progress,
                ] {
                    progress.highest = SYNC_TARGET;
                    if progress.applied < progress.highest {
                        progress.applied += 1;
                    }
                }
                state.synced = [
                    state.shielded.progress,
                    state.unshielded.progress,
                    state.dust.progress,
                ]
                .iter()
                .all(|p| p.applied >= p.highest);

                let _ = self.state_tx.send(state.clone());
                state.synced
            };

            if done {
                debug!("local engine sync complete");
                return;
            }
        }
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.stopped.load(Ordering::SeqCst) {
            Err(EngineError::Stopped)
        } else {
            Ok(())
        }
    }

    fn recipe_payload(recipe: &Recipe) -> Vec<u8> {
        serde_json::to_vec(&recipe.kind).unwrap_or_default()
    }

    /// Apply a proven transaction to the ledger and publish the new state.
    fn apply(&self, tx: &ProvenTransaction) -> Result<TxId, EngineError> {
        let mut ledger = self.ledger.lock().expect("ledger lock");

        match &tx.recipe.kind {
            RecipeKind::Transfer { intents } => {
                for intent in intents {
                    apply_transfer(&mut ledger.state, intent)?;
                }
            }
            RecipeKind::Register { utxos, dust_receiver, .. } => {
                set_registration(&mut ledger.state, utxos, true)?;
                debug!(
                    "registered {} UTXO(s), dust receiver: {}",
                    utxos.len(),
                    dust_receiver.as_deref().unwrap_or("<own dust address>")
                );
            }
            RecipeKind::Deregister { utxos, .. } => {
                set_registration(&mut ledger.state, utxos, false)?;
            }
        }

        rebuild_dust_coins(&mut ledger.state);

        let mut hasher = Sha3_256::new();
        hasher.update(Self::recipe_payload(&tx.recipe));
        hasher.update(&tx.proof);
        hasher.update(ledger.next_intent.to_be_bytes());
        ledger.next_intent += 1;
        let tx_id = hex::encode(hasher.finalize());

        let _ = self.state_tx.send(ledger.state.clone());
        Ok(tx_id)
    }
}

#[async_trait]
impl WalletEngine for LocalEngine {
    fn state(&self) -> watch::Receiver<WalletState> {
        self.state_rx.clone()
    }

    async fn stop(&self) -> Result<(), EngineError> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(task) = self.sync_task.lock().expect("sync task lock").take() {
            task.abort();
        }
        info!("local engine stopped");
        Ok(())
    }

    async fn transfer_recipe(
        &self,
        intents: Vec<TransferIntent>,
        _keys: &WalletSecretKeys,
    ) -> Result<Recipe, EngineError> {
        self.ensure_running()?;
        if intents.is_empty() {
            return Err(EngineError::InvalidRecipe("no transfer outputs".to_string()));
        }

        let ledger = self.ledger.lock().expect("ledger lock");
        for intent in &intents {
            let balances = match intent.token_type {
                TokenType::Shielded => &ledger.state.shielded.balances,
                TokenType::Unshielded => &ledger.state.unshielded.balances,
            };
            let available = balances.get(&intent.token).copied().unwrap_or(0);
            if intent.amount > available {
                return Err(EngineError::InsufficientFunds {
                    token: intent.token.clone(),
                    requested: intent.amount,
                    available,
                });
            }
        }

        let requires_signature = intents
            .iter()
            .any(|i| i.token_type == TokenType::Unshielded);

        Ok(Recipe {
            kind: RecipeKind::Transfer { intents },
            requires_signature,
            signature: None,
        })
    }

    async fn register_recipe(
        &self,
        utxos: Vec<Utxo>,
        signer: &dyn RecipeSigner,
        dust_receiver: Option<String>,
    ) -> Result<Recipe, EngineError> {
        self.ensure_running()?;
        {
            let ledger = self.ledger.lock().expect("ledger lock");
            check_utxos_known(&ledger.state, &utxos, false)?;
        }

        let mut recipe = Recipe {
            kind: RecipeKind::Register {
                utxos,
                public_key: signer.public_key(),
                dust_receiver,
            },
            requires_signature: true,
            signature: None,
        };
        recipe.signature = Some(signer.sign_data(&Self::recipe_payload(&recipe)));
        Ok(recipe)
    }

    async fn deregister_recipe(
        &self,
        utxos: Vec<Utxo>,
        signer: &dyn RecipeSigner,
    ) -> Result<Recipe, EngineError> {
        self.ensure_running()?;
        {
            let ledger = self.ledger.lock().expect("ledger lock");
            check_utxos_known(&ledger.state, &utxos, true)?;
        }

        let mut recipe = Recipe {
            kind: RecipeKind::Deregister {
                utxos,
                public_key: signer.public_key(),
            },
            requires_signature: true,
            signature: None,
        };
        recipe.signature = Some(signer.sign_data(&Self::recipe_payload(&recipe)));
        Ok(recipe)
    }

    async fn sign_recipe(
        &self,
        mut recipe: Recipe,
        signer: &dyn RecipeSigner,
    ) -> Result<Recipe, EngineError> {
        self.ensure_running()?;
        recipe.signature = Some(signer.sign_data(&Self::recipe_payload(&recipe)));
        Ok(recipe)
    }

    async fn finalize_recipe(&self, recipe: Recipe) -> Result<ProvenTransaction, EngineError> {
        self.ensure_running()?;
        if recipe.requires_signature && recipe.signature.is_none() {
            return Err(EngineError::MissingSignature);
        }

        // Stand-in for proof generation; a network engine calls out to the
        // proving server configured in the environment here.
        let mut hasher = Sha3_256::new();
        hasher.update(b"midnight-wallet/proof");
        hasher.update(Self::recipe_payload(&recipe));
        let proof = hasher.finalize().to_vec();

        Ok(ProvenTransaction { recipe, proof })
    }

    async fn submit_transaction(&self, tx: ProvenTransaction) -> Result<TxId, EngineError> {
        self.ensure_running()?;
        let tx_id = self.apply(&tx)?;
        info!("submitted transaction {tx_id}");
        Ok(tx_id)
    }

    async fn estimate_registration(&self, utxos: &[Utxo]) -> Result<FeeEstimate, EngineError> {
        self.ensure_running()?;
        Ok(FeeEstimate {
            fee: REGISTRATION_FEE_PER_UTXO * utxos.len() as u128,
        })
    }
}

/// Deterministic opening balances so a fresh session has something to do.
/// Runs of the same seed see the same ledger.
fn genesis_state(
    seed: &Seed,
    shielded_address: String,
    unshielded_address: String,
    dust_address: String,
) -> WalletState {
    let salt = seed.as_bytes().first().copied().unwrap_or(0) as u128;

    let night_values = [
        (2_000 + salt) * 1_000_000,
        500 * 1_000_000,
        (120 + salt % 7) * 1_000_000,
    ];
    let available_coins: Vec<UtxoWithMeta> = night_values
        .iter()
        .enumerate()
        .map(|(i, value)| UtxoWithMeta {
            utxo: Utxo {
                intent_hash: format!("genesis-{i:02}"),
                output_index: i as u32,
                token: NIGHT_TOKEN_ID.to_string(),
                value: *value,
            },
            meta: UtxoMeta {
                registered_for_dust: false,
            },
        })
        .collect();

    let mut unshielded_balances = BTreeMap::new();
    unshielded_balances.insert(
        NIGHT_TOKEN_ID.to_string(),
        night_values.iter().sum::<u128>(),
    );

    let shielded_values = vec![(800 + salt % 11) * 1_000_000];
    let mut shielded_balances = BTreeMap::new();
    shielded_balances.insert(
        NIGHT_TOKEN_ID.to_string(),
        shielded_values.iter().sum::<u128>(),
    );

    WalletState {
        shielded: ShieldedState {
            address: shielded_address,
            balances: shielded_balances,
            coin_values: shielded_values,
            progress: SyncProgress::default(),
        },
        unshielded: UnshieldedState {
            address: unshielded_address,
            balances: unshielded_balances,
            available_coins,
            progress: SyncProgress::default(),
        },
        dust: super::DustState {
            dust_address,
            balance: 0,
            coins: Vec::new(),
            progress: SyncProgress::default(),
        },
        synced: false,
    }
}

fn utxo_key(utxo: &Utxo) -> String {
    format!("{}:{}", utxo.intent_hash, utxo.output_index)
}

fn check_utxos_known(
    state: &WalletState,
    utxos: &[Utxo],
    want_registered: bool,
) -> Result<(), EngineError> {
    for utxo in utxos {
        let found = state
            .unshielded
            .available_coins
            .iter()
            .find(|c| utxo_key(&c.utxo) == utxo_key(utxo))
            .ok_or_else(|| EngineError::UnknownUtxo(utxo_key(utxo)))?;
        if found.meta.registered_for_dust != want_registered {
            return Err(EngineError::InvalidRecipe(format!(
                "UTXO {} is {}registered for dust generation",
                utxo_key(utxo),
                if want_registered { "not " } else { "already " },
            )));
        }
    }
    Ok(())
}

fn set_registration(
    state: &mut WalletState,
    utxos: &[Utxo],
    registered: bool,
) -> Result<(), EngineError> {
    check_utxos_known(state, utxos, !registered)?;
    for utxo in utxos {
        for coin in &mut state.unshielded.available_coins {
            if utxo_key(&coin.utxo) == utxo_key(utxo) {
                coin.meta.registered_for_dust = registered;
            }
        }
    }
    Ok(())
}

fn apply_transfer(state: &mut WalletState, intent: &TransferIntent) -> Result<(), EngineError> {
    let balances = match intent.token_type {
        TokenType::Shielded => &mut state.shielded.balances,
        TokenType::Unshielded => &mut state.unshielded.balances,
    };
    let available = balances.get(&intent.token).copied().unwrap_or(0);
    if intent.amount > available {
        return Err(EngineError::InsufficientFunds {
            token: intent.token.clone(),
            requested: intent.amount,
            available,
        });
    }
    balances.insert(intent.token.clone(), available - intent.amount);

    // Keep the coin lists roughly consistent with the balances: spend
    // unshielded coins largest-first until the amount is covered.
    if intent.token_type == TokenType::Unshielded {
        let mut remaining = intent.amount;
        let mut coins = std::mem::take(&mut state.unshielded.available_coins);
        coins.sort_by(|a, b| b.utxo.value.cmp(&a.utxo.value));
        let mut kept = Vec::with_capacity(coins.len());
        for mut coin in coins {
            if remaining > 0 && coin.utxo.token == intent.token {
                let spent = remaining.min(coin.utxo.value);
                coin.utxo.value -= spent;
                remaining -= spent;
            }
            if coin.utxo.value > 0 {
                kept.push(coin);
            }
        }
        state.unshielded.available_coins = kept;
    } else {
        let mut remaining = intent.amount;
        let mut values = std::mem::take(&mut state.shielded.coin_values);
        values.sort_unstable_by(|a, b| b.cmp(a));
        let mut kept = Vec::with_capacity(values.len());
        for mut value in values {
            if remaining > 0 {
                let spent = remaining.min(value);
                value -= spent;
                remaining -= spent;
            }
            if value > 0 {
                kept.push(value);
            }
        }
        state.shielded.coin_values = kept;
    }
    Ok(())
}

fn rebuild_dust_coins(state: &mut WalletState) {
    state.dust.coins = state
        .unshielded
        .available_coins
        .iter()
        .filter(|c| c.meta.registered_for_dust)
        .map(|_| DustCoinInfo {
            generated_now: 0,
            max_cap: DUST_CAP_PER_COIN,
            time_to_cap: Some(Duration::from_secs(3 * 86_400)),
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{environment_config, Environment};
    use crate::engine::pipeline;

    fn test_seed() -> Seed {
        Seed::from_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap()
    }

    async fn started() -> (Arc<LocalEngine>, UnshieldedKeystore, WalletSecretKeys) {
        let seed = test_seed();
        let config = environment_config(Environment::Undeployed);
        let engine = LocalEngine::start(&seed, &config).await.unwrap();
        (
            engine,
            UnshieldedKeystore::from_seed(&seed),
            WalletSecretKeys::from_seed(&seed),
        )
    }

    #[tokio::test]
    async fn genesis_is_deterministic_for_a_seed() {
        let config = environment_config(Environment::Undeployed);
        let a = LocalEngine::start(&test_seed(), &config).await.unwrap();
        let b = LocalEngine::start(&test_seed(), &config).await.unwrap();
        assert_eq!(*a.state().borrow(), *b.state().borrow());
        a.stop().await.unwrap();
        b.stop().await.unwrap();
    }

    #[tokio::test]
    async fn unsigned_unshielded_transfer_is_rejected_at_finalize() {
        let (engine, _keystore, keys) = started().await;
        let state = engine.state().borrow().clone();
        let recipe = engine
            .transfer_recipe(
                vec![TransferIntent {
                    token_type: TokenType::Unshielded,
                    token: NIGHT_TOKEN_ID.to_string(),
                    amount: 1_000_000,
                    receiver: state.unshielded.address.clone(),
                }],
                &keys,
            )
            .await
            .unwrap();
        assert!(recipe.requires_signature);
        assert_eq!(
            engine.finalize_recipe(recipe).await.unwrap_err(),
            EngineError::MissingSignature
        );
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn transfer_pipeline_debits_the_balance() {
        let (engine, keystore, keys) = started().await;
        let before = engine.state().borrow().unshielded.balances[NIGHT_TOKEN_ID];

        let params = pipeline::TransferParams {
            token_type: TokenType::Unshielded,
            token: NIGHT_TOKEN_ID.to_string(),
            amount: 2_500_000,
            receiver: "mn_addr_undeployed1receiver".to_string(),
        };
        let outcome = pipeline::execute_transfer(&*engine, &params, &keys, &keystore).await;
        assert!(matches!(outcome, pipeline::TransactionOutcome::Success { .. }));

        let after = engine.state().borrow().unshielded.balances[NIGHT_TOKEN_ID];
        assert_eq!(before - after, 2_500_000);
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn over_balance_transfer_fails_with_insufficient_funds() {
        let (engine, _keystore, keys) = started().await;
        let err = engine
            .transfer_recipe(
                vec![TransferIntent {
                    token_type: TokenType::Shielded,
                    token: NIGHT_TOKEN_ID.to_string(),
                    amount: u128::MAX,
                    receiver: "anyone".to_string(),
                }],
                &keys,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn registration_marks_utxos_and_grows_dust_coins() {
        let (engine, keystore, _keys) = started().await;
        let coins: Vec<Utxo> = engine
            .state()
            .borrow()
            .unshielded
            .available_coins
            .iter()
            .map(|c| c.utxo.clone())
            .collect();

        let outcome =
            pipeline::execute_registration(&*engine, coins.clone(), &keystore, None).await;
        assert!(matches!(outcome, pipeline::TransactionOutcome::Success { .. }));

        let state = engine.state().borrow().clone();
        assert!(state
            .unshielded
            .available_coins
            .iter()
            .all(|c| c.meta.registered_for_dust));
        assert_eq!(state.dust.coins.len(), coins.len());

        // Registering twice is rejected before anything is built.
        let second = pipeline::execute_registration(&*engine, coins, &keystore, None).await;
        assert!(matches!(second, pipeline::TransactionOutcome::Failure { .. }));
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn calls_after_stop_fail_with_stopped() {
        let (engine, _keystore, _keys) = started().await;
        engine.stop().await.unwrap();
        assert_eq!(
            engine.estimate_registration(&[]).await.unwrap_err(),
            EngineError::Stopped
        );
        // Idempotent.
        engine.stop().await.unwrap();
    }
}
