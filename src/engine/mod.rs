//! The wallet-engine seam.
//!
//! The engine owns key material usage, transaction construction, proving,
//! and network synchronization. This module defines the API surface the UI
//! depends on; [`local::LocalEngine`] is the in-process implementation the
//! binary runs against, and tests script their own implementations.

pub mod keys;
pub mod local;
pub mod pipeline;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::watch;

use crate::types::EngineError;
use keys::{PublicKey, RecipeSigner, Signature, WalletSecretKeys};

pub use local::LocalEngine;
pub use pipeline::{TransactionOutcome, TransferParams};

/// Token id of the native NIGHT token.
pub const NIGHT_TOKEN_ID: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

pub type TokenId = String;
pub type TxId = String;

/// Which sub-ledger a transfer spends from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenType {
    Shielded,
    Unshielded,
}

impl TokenType {
    pub fn label(&self) -> &'static str {
        match self {
            TokenType::Shielded => "shielded",
            TokenType::Unshielded => "unshielded",
        }
    }
}

/// Sync position of one sub-wallet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    pub applied: u64,
    pub highest: u64,
}

/// An unspent output on the unshielded ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Utxo {
    pub intent_hash: String,
    pub output_index: u32,
    pub token: TokenId,
    pub value: u128,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UtxoMeta {
    pub registered_for_dust: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtxoWithMeta {
    pub utxo: Utxo,
    pub meta: UtxoMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShieldedState {
    pub address: String,
    pub balances: BTreeMap<TokenId, u128>,
    pub coin_values: Vec<u128>,
    pub progress: SyncProgress,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnshieldedState {
    pub address: String,
    pub balances: BTreeMap<TokenId, u128>,
    pub available_coins: Vec<UtxoWithMeta>,
    pub progress: SyncProgress,
}

/// A dust coin actively generating rewards against a registered UTXO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DustCoinInfo {
    pub generated_now: u128,
    pub max_cap: u128,
    /// Time until the cap is reached; `None` once complete.
    #[serde(skip)]
    pub time_to_cap: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DustState {
    pub dust_address: String,
    pub balance: u128,
    pub coins: Vec<DustCoinInfo>,
    pub progress: SyncProgress,
}

/// Read-only snapshot of all three sub-wallets, delivered over the engine's
/// state stream. Renderers consult the latest snapshot; wizards never write
/// to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalletState {
    pub shielded: ShieldedState,
    pub unshielded: UnshieldedState,
    pub dust: DustState,
    pub synced: bool,
}

/// A single output of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferIntent {
    pub token_type: TokenType,
    pub token: TokenId,
    pub amount: u128,
    pub receiver: String,
}

/// What a recipe asks the ledger to do. Built by the engine, inspected only
/// by the engine; the UI treats recipes as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RecipeKind {
    Transfer { intents: Vec<TransferIntent> },
    Register {
        utxos: Vec<Utxo>,
        public_key: PublicKey,
        dust_receiver: Option<String>,
    },
    Deregister {
        utxos: Vec<Utxo>,
        public_key: PublicKey,
    },
}

/// An unproven transaction request. `signature` is populated by
/// [`WalletEngine::sign_recipe`] (or at build time for the dust recipes,
/// which sign through a callback-style signer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub kind: RecipeKind,
    pub requires_signature: bool,
    pub signature: Option<Signature>,
}

/// A proven transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvenTransaction {
    pub recipe: Recipe,
    pub proof: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub fee: u128,
}

/// The engine API the UI is written against.
///
/// Every method may fail asynchronously; call sites convert failures into
/// a [`TransactionOutcome`] or an inline message and never let them
/// propagate past a wizard boundary.
#[async_trait]
pub trait WalletEngine: Send + Sync {
    /// Subscribe to state snapshots. The channel lives as long as the
    /// engine; receivers see the latest snapshot immediately.
    fn state(&self) -> watch::Receiver<WalletState>;

    /// Stop syncing and release resources. Idempotent.
    async fn stop(&self) -> Result<(), EngineError>;

    /// Build an unsigned transfer recipe. `keys` provides the shielded and
    /// dust secrets needed to select and balance inputs.
    async fn transfer_recipe(
        &self,
        intents: Vec<TransferIntent>,
        keys: &WalletSecretKeys,
    ) -> Result<Recipe, EngineError>;

    /// Build a dust-registration recipe for the given NIGHT UTXOs, signed
    /// through `signer`. `dust_receiver` of `None` uses the wallet's own
    /// dust address.
    async fn register_recipe(
        &self,
        utxos: Vec<Utxo>,
        signer: &dyn RecipeSigner,
        dust_receiver: Option<String>,
    ) -> Result<Recipe, EngineError>;

    /// Build a dust-deregistration recipe, signed through `signer`.
    async fn deregister_recipe(
        &self,
        utxos: Vec<Utxo>,
        signer: &dyn RecipeSigner,
    ) -> Result<Recipe, EngineError>;

    /// Attach a signature to a recipe that requires one.
    async fn sign_recipe(
        &self,
        recipe: Recipe,
        signer: &dyn RecipeSigner,
    ) -> Result<Recipe, EngineError>;

    /// Generate proofs, producing a broadcastable transaction.
    async fn finalize_recipe(&self, recipe: Recipe) -> Result<ProvenTransaction, EngineError>;

    /// Broadcast a proven transaction, returning its id.
    async fn submit_transaction(&self, tx: ProvenTransaction) -> Result<TxId, EngineError>;

    /// Best-effort fee estimate for registering the given UTXOs.
    async fn estimate_registration(&self, utxos: &[Utxo]) -> Result<FeeEstimate, EngineError>;
}
