use thiserror::Error;

/// Failures surfaced by a wallet engine. Every engine call site converts
/// these into a terminal wizard result or an inline message; they never
/// escape a flow boundary as a raw error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine is stopped")]
    Stopped,

    #[error("insufficient funds for {token}: requested {requested}, available {available}")]
    InsufficientFunds {
        token: String,
        requested: u128,
        available: u128,
    },

    #[error("recipe requires a signature before it can be finalized")]
    MissingSignature,

    #[error("unknown or spent UTXO: {0}")]
    UnknownUtxo(String),

    #[error("invalid recipe: {0}")]
    InvalidRecipe(String),

    #[error("proof generation failed: {0}")]
    Proving(String),

    #[error("submission rejected: {0}")]
    Submission(String),

    #[error("engine startup failed: {0}")]
    Startup(String),
}

/// Address validation failures. The messages name the expected kind so a
/// user pasting the wrong address type sees what was expected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address format: {0}")]
    Malformed(String),

    #[error("expected {expected} address ({hint}...), got {found}")]
    WrongKind {
        expected: &'static str,
        hint: &'static str,
        found: String,
    },

    #[error("address belongs to network '{found}', expected '{expected}'")]
    WrongNetwork { expected: String, found: String },
}

/// Amount parsing failures, local to the amount-entry step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("please enter an amount")]
    Empty,

    #[error("invalid amount format")]
    Invalid,

    #[error("amount must be greater than zero")]
    NotPositive,

    #[error("insufficient balance, available: {0}")]
    InsufficientBalance(String),
}

/// Seed input failures on the setup screens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("invalid seed format, must be exactly 64 hexadecimal characters (0-9, a-f)")]
    InvalidHex,

    #[error("invalid mnemonic, must be 24 valid BIP39 words (comma or space separated)")]
    InvalidMnemonic,
}
