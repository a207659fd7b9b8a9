//! Seed handling and role-based key derivation.
//!
//! One seed drives all three sub-wallets; each role derives its own secret
//! so compromising one sub-wallet's key material never exposes another's.

use bip39::{Language, Mnemonic};
use rand::RngCore;
use serde::Serialize;
use sha3::{Digest, Sha3_256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::SeedError;

/// Wallet seed bytes. Zeroized on drop; never logged or displayed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed(Vec<u8>);

impl Seed {
    /// Parse a 64-character hex seed.
    pub fn from_hex(input: &str) -> Result<Seed, SeedError> {
        let trimmed = input.trim();
        if trimmed.len() != 64 || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SeedError::InvalidHex);
        }
        let bytes = hex::decode(trimmed).map_err(|_| SeedError::InvalidHex)?;
        Ok(Seed(bytes))
    }

    /// Parse a BIP39 mnemonic phrase. Words may be separated by commas,
    /// spaces, or any mix; the phrase is normalized before validation.
    pub fn from_mnemonic(input: &str) -> Result<Seed, SeedError> {
        let normalized = input
            .replace(',', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, &normalized)
            .map_err(|_| SeedError::InvalidMnemonic)?;
        Ok(Seed(mnemonic.to_seed("").to_vec()))
    }

    /// Generate a fresh random 32-byte seed.
    pub fn random() -> Seed {
        let mut bytes = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Seed(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Deliberately opaque.
        write!(f, "Seed(<{} bytes>)", self.0.len())
    }
}

/// Derivation roles, one per sub-wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Zswap,
    NightExternal,
    Dust,
}

impl Role {
    fn domain_tag(&self) -> &'static [u8] {
        match self {
            Role::Zswap => b"midnight-wallet/role/zswap",
            Role::NightExternal => b"midnight-wallet/role/night-external",
            Role::Dust => b"midnight-wallet/role/dust",
        }
    }
}

/// Derive the 32-byte secret for a role from the seed.
pub fn derive_role_secret(seed: &Seed, role: Role) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(role.domain_tag());
    hasher.update(seed.as_bytes());
    hasher.finalize().into()
}

/// Secret keys handed to the engine for the shielded and dust wallets.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WalletSecretKeys {
    pub shielded: [u8; 32],
    pub dust: [u8; 32],
}

impl WalletSecretKeys {
    pub fn from_seed(seed: &Seed) -> WalletSecretKeys {
        WalletSecretKeys {
            shielded: derive_role_secret(seed, Role::Zswap),
            dust: derive_role_secret(seed, Role::Dust),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicKey(pub [u8; 32]);

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature(pub Vec<u8>);

/// Anything able to sign recipe payloads on behalf of the unshielded wallet.
pub trait RecipeSigner: Send + Sync {
    fn public_key(&self) -> PublicKey;
    fn sign_data(&self, payload: &[u8]) -> Signature;
}

/// Keystore for the unshielded (NIGHT) wallet.
pub struct UnshieldedKeystore {
    secret: [u8; 32],
    public: PublicKey,
}

impl UnshieldedKeystore {
    pub fn from_seed(seed: &Seed) -> UnshieldedKeystore {
        let secret = derive_role_secret(seed, Role::NightExternal);
        let mut hasher = Sha3_256::new();
        hasher.update(b"midnight-wallet/public-key");
        hasher.update(secret);
        let public = PublicKey(hasher.finalize().into());
        UnshieldedKeystore { secret, public }
    }
}

impl RecipeSigner for UnshieldedKeystore {
    fn public_key(&self) -> PublicKey {
        self.public.clone()
    }

    fn sign_data(&self, payload: &[u8]) -> Signature {
        let mut hasher = Sha3_256::new();
        hasher.update(b"midnight-wallet/signature");
        hasher.update(self.secret);
        hasher.update(payload);
        Signature(hasher.finalize().to_vec())
    }
}

impl Drop for UnshieldedKeystore {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}
