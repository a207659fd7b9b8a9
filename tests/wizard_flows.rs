//! End-to-end wizard runs over a scripted engine: the wizard state machines
//! and the submission pipeline, with the engine's behavior controlled per
//! test.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use midnight_wallet_cli::config::NetworkId;
use midnight_wallet_cli::engine::keys::{
    RecipeSigner, Seed, UnshieldedKeystore, WalletSecretKeys,
};
use midnight_wallet_cli::engine::pipeline::{self, TransactionOutcome};
use midnight_wallet_cli::engine::{
    FeeEstimate, ProvenTransaction, Recipe, RecipeKind, TransferIntent, TxId, Utxo, WalletEngine,
    WalletState, NIGHT_TOKEN_ID,
};
use midnight_wallet_cli::interactive::dust_register::{RegisterStep, RegisterWizard};
use midnight_wallet_cli::interactive::transfer::{TransferStep, TransferWizard};
use midnight_wallet_cli::types::EngineError;
use midnight_wallet_cli::utils::address::{encode_address, AddressKind};

const NETWORK: NetworkId = NetworkId::Undeployed;
const TX_ID: &str = "feedface00";

struct ScriptedEngine {
    _state_tx: watch::Sender<WalletState>,
    state_rx: watch::Receiver<WalletState>,
    calls: Mutex<Vec<&'static str>>,
    fail_submission: bool,
    fail_estimate: bool,
    register_receiver: Mutex<Option<Option<String>>>,
}

impl ScriptedEngine {
    fn new() -> ScriptedEngine {
        let (state_tx, state_rx) = watch::channel(WalletState::default());
        ScriptedEngine {
            _state_tx: state_tx,
            state_rx,
            calls: Mutex::new(Vec::new()),
            fail_submission: false,
            fail_estimate: false,
            register_receiver: Mutex::new(None),
        }
    }

    fn failing_submission() -> ScriptedEngine {
        ScriptedEngine {
            fail_submission: true,
            ..ScriptedEngine::new()
        }
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletEngine for ScriptedEngine {
    fn state(&self) -> watch::Receiver<WalletState> {
        self.state_rx.clone()
    }

    async fn stop(&self) -> Result<(), EngineError> {
        self.record("stop");
        Ok(())
    }

    async fn transfer_recipe(
        &self,
        intents: Vec<TransferIntent>,
        _keys: &WalletSecretKeys,
    ) -> Result<Recipe, EngineError> {
        self.record("transfer_recipe");
        let requires_signature = intents
            .iter()
            .any(|i| i.token_type == midnight_wallet_cli::engine::TokenType::Unshielded);
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
        self.record("register_recipe");
        *self.register_receiver.lock().unwrap() = Some(dust_receiver.clone());
        Ok(Recipe {
            kind: RecipeKind::Register {
                utxos,
                public_key: signer.public_key(),
                dust_receiver,
            },
            requires_signature: true,
            signature: Some(signer.sign_data(b"register")),
        })
    }

    async fn deregister_recipe(
        &self,
        utxos: Vec<Utxo>,
        signer: &dyn RecipeSigner,
    ) -> Result<Recipe, EngineError> {
        self.record("deregister_recipe");
        Ok(Recipe {
            kind: RecipeKind::Deregister {
                utxos,
                public_key: signer.public_key(),
            },
            requires_signature: true,
            signature: Some(signer.sign_data(b"deregister")),
        })
    }

    async fn sign_recipe(
        &self,
        mut recipe: Recipe,
        signer: &dyn RecipeSigner,
    ) -> Result<Recipe, EngineError> {
        self.record("sign_recipe");
        recipe.signature = Some(signer.sign_data(b"signed"));
        Ok(recipe)
    }

    async fn finalize_recipe(&self, recipe: Recipe) -> Result<ProvenTransaction, EngineError> {
        self.record("finalize_recipe");
        if recipe.requires_signature && recipe.signature.is_none() {
            return Err(EngineError::MissingSignature);
        }
        Ok(ProvenTransaction {
            recipe,
            proof: vec![1, 2, 3],
        })
    }

    async fn submit_transaction(&self, _tx: ProvenTransaction) -> Result<TxId, EngineError> {
        self.record("submit_transaction");
        if self.fail_submission {
            Err(EngineError::Submission("node unreachable".to_string()))
        } else {
            Ok(TX_ID.to_string())
        }
    }

    async fn estimate_registration(&self, utxos: &[Utxo]) -> Result<FeeEstimate, EngineError> {
        self.record("estimate_registration");
        if self.fail_estimate {
            Err(EngineError::Proving("estimator offline".to_string()))
        } else {
            Ok(FeeEstimate {
                fee: 50_000 * utxos.len() as u128,
            })
        }
    }
}

fn test_seed() -> Seed {
    Seed::from_hex("cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc").unwrap()
}

fn unshielded_address() -> String {
    encode_address(AddressKind::Unshielded, NETWORK, &[5u8; 32]).unwrap()
}

fn night_utxo(index: u32, value: u128) -> Utxo {
    Utxo {
        intent_hash: format!("intent-{index:02}"),
        output_index: index,
        token: NIGHT_TOKEN_ID.to_string(),
        value,
    }
}

/// Walk the transfer wizard through its happy path: Unshielded, NIGHT,
/// amount 2.5, a valid address, confirm, and a successful submission.
fn confirmed_transfer_wizard() -> TransferWizard {
    use midnight_wallet_cli::engine::TokenType;

    let mut wizard = TransferWizard::new(NETWORK);
    assert_eq!(wizard.step(), TransferStep::SelectType);
    wizard.select_type(TokenType::Unshielded);
    assert_eq!(wizard.step(), TransferStep::SelectToken);
    wizard.select_token(NIGHT_TOKEN_ID.to_string());
    assert_eq!(wizard.step(), TransferStep::EnterAmount);
    assert!(wizard.enter_amount("2.5", 10_000_000));
    assert_eq!(wizard.step(), TransferStep::EnterAddress);
    assert!(wizard.enter_receiver(&unshielded_address()));
    assert_eq!(wizard.step(), TransferStep::Confirm);
    assert!(wizard.confirm());
    assert_eq!(wizard.step(), TransferStep::Processing);
    wizard
}

#[tokio::test]
async fn unshielded_transfer_runs_through_all_six_states_to_success() {
    let engine = ScriptedEngine::new();
    let keys = WalletSecretKeys::from_seed(&test_seed());
    let keystore = UnshieldedKeystore::from_seed(&test_seed());

    let mut wizard = confirmed_transfer_wizard();
    let params = wizard.params().unwrap();
    assert_eq!(params.amount, 2_500_000);

    let outcome = pipeline::execute_transfer(&engine, &params, &keys, &keystore).await;
    wizard.finish(outcome);

    assert_eq!(wizard.step(), TransferStep::Result);
    assert_eq!(
        wizard.outcome,
        Some(TransactionOutcome::Success {
            tx_id: TX_ID.to_string()
        })
    );
    // Unshielded transfers go through every pipeline stage, signing included.
    assert_eq!(
        engine.calls(),
        vec![
            "transfer_recipe",
            "sign_recipe",
            "finalize_recipe",
            "submit_transaction"
        ]
    );
}

#[tokio::test]
async fn submission_failure_surfaces_as_the_terminal_failure_result() {
    let engine = ScriptedEngine::failing_submission();
    let keys = WalletSecretKeys::from_seed(&test_seed());
    let keystore = UnshieldedKeystore::from_seed(&test_seed());

    let mut wizard = confirmed_transfer_wizard();
    let params = wizard.params().unwrap();
    let outcome = pipeline::execute_transfer(&engine, &params, &keys, &keystore).await;
    wizard.finish(outcome);

    assert_eq!(wizard.step(), TransferStep::Result);
    match wizard.outcome {
        Some(TransactionOutcome::Failure { ref error }) => {
            assert!(error.contains("node unreachable"), "got: {error}");
        }
        ref other => panic!("expected a failure outcome, got {other:?}"),
    }
    // Same preceding transitions as the success path.
    assert_eq!(
        engine.calls(),
        vec![
            "transfer_recipe",
            "sign_recipe",
            "finalize_recipe",
            "submit_transaction"
        ]
    );
}

#[tokio::test]
async fn shielded_transfers_skip_the_signing_stage() {
    use midnight_wallet_cli::engine::TokenType;

    let engine = ScriptedEngine::new();
    let keys = WalletSecretKeys::from_seed(&test_seed());
    let keystore = UnshieldedKeystore::from_seed(&test_seed());
    let shielded = encode_address(AddressKind::Shielded, NETWORK, &[5u8; 32]).unwrap();

    let mut wizard = TransferWizard::new(NETWORK);
    wizard.select_type(TokenType::Shielded);
    wizard.select_token(NIGHT_TOKEN_ID.to_string());
    assert!(wizard.enter_amount("1", 10_000_000));
    assert!(wizard.enter_receiver(&shielded));
    assert!(wizard.confirm());

    let outcome =
        pipeline::execute_transfer(&engine, &wizard.params().unwrap(), &keys, &keystore).await;
    assert!(matches!(outcome, TransactionOutcome::Success { .. }));
    assert_eq!(
        engine.calls(),
        vec!["transfer_recipe", "finalize_recipe", "submit_transaction"]
    );
}

#[tokio::test]
async fn registration_with_a_custom_receiver_reaches_the_engine() {
    let engine = ScriptedEngine::new();
    let keystore = UnshieldedKeystore::from_seed(&test_seed());
    let own_dust = encode_address(AddressKind::Dust, NETWORK, &[9u8; 32]).unwrap();
    let custom = encode_address(AddressKind::Dust, NETWORK, &[4u8; 32]).unwrap();

    let mut wizard = RegisterWizard::new(
        NETWORK,
        vec![night_utxo(0, 2_000_000), night_utxo(1, 3_000_000)],
    );
    assert!(wizard.select_utxos(&[0, 1]));
    assert!(wizard.accept_custom_receiver(&custom));

    let fee = engine.estimate_registration(&wizard.selected).await.unwrap();
    wizard.set_fee_estimate(Some(fee.fee));
    assert_eq!(wizard.fee, Some(100_000));
    assert!(wizard.confirm());

    let receiver = wizard.receiver_param(&own_dust);
    let outcome = pipeline::execute_registration(
        &engine,
        wizard.selected.clone(),
        &keystore,
        receiver.clone(),
    )
    .await;
    wizard.finish(outcome);

    assert_eq!(wizard.step(), RegisterStep::Result);
    assert!(matches!(
        wizard.outcome,
        Some(TransactionOutcome::Success { .. })
    ));
    assert_eq!(receiver.as_deref(), Some(custom.as_str()));
    assert_eq!(
        *engine.register_receiver.lock().unwrap(),
        Some(Some(custom))
    );
    assert_eq!(
        engine.calls(),
        vec![
            "estimate_registration",
            "register_recipe",
            "finalize_recipe",
            "submit_transaction"
        ]
    );
}

#[tokio::test]
async fn estimate_failure_still_reaches_confirm_and_submits() {
    let engine = ScriptedEngine {
        fail_estimate: true,
        ..ScriptedEngine::new()
    };
    let keystore = UnshieldedKeystore::from_seed(&test_seed());
    let own_dust = encode_address(AddressKind::Dust, NETWORK, &[9u8; 32]).unwrap();

    let mut wizard = RegisterWizard::new(NETWORK, vec![night_utxo(0, 2_000_000)]);
    assert!(wizard.select_utxos(&[0]));
    wizard.accept_default_receiver();

    // The estimate fails; the confirm step simply has no fee to show.
    let fee = match engine.estimate_registration(&wizard.selected).await {
        Ok(estimate) => Some(estimate.fee),
        Err(_) => None,
    };
    wizard.set_fee_estimate(fee);
    assert!(wizard.fee.is_none());
    assert!(wizard.confirm());

    let outcome = pipeline::execute_registration(
        &engine,
        wizard.selected.clone(),
        &keystore,
        wizard.receiver_param(&own_dust),
    )
    .await;
    assert!(matches!(outcome, TransactionOutcome::Success { .. }));
    assert_eq!(*engine.register_receiver.lock().unwrap(), Some(None));
}

#[tokio::test]
async fn deregistration_runs_the_build_prove_submit_pipeline() {
    use midnight_wallet_cli::interactive::dust_deregister::{DeregisterStep, DeregisterWizard};

    let engine = ScriptedEngine::new();
    let keystore = UnshieldedKeystore::from_seed(&test_seed());

    let mut wizard = DeregisterWizard::new(vec![night_utxo(0, 2_000_000)]);
    assert!(wizard.select_utxos(&[0]));
    assert!(wizard.confirm());

    let outcome =
        pipeline::execute_deregistration(&engine, wizard.selected.clone(), &keystore).await;
    wizard.finish(outcome);

    assert_eq!(wizard.step(), DeregisterStep::Result);
    assert!(matches!(
        wizard.outcome,
        Some(TransactionOutcome::Success { .. })
    ));
    assert_eq!(
        engine.calls(),
        vec!["deregister_recipe", "finalize_recipe", "submit_transaction"]
    );
}
