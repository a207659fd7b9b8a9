//! Bech32m address codec and validators.
//!
//! Addresses are tagged with an address kind (`shield-addr`, `addr`, `dust`)
//! and a network, e.g. `mn_addr_undeployed1...`. Validators never panic on
//! user input; every failure comes back as a typed [`AddressError`].

use bech32::{FromBase32, ToBase32, Variant};

use crate::config::NetworkId;
use crate::types::AddressError;

/// The three address kinds understood by the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Shielded,
    Unshielded,
    Dust,
}

impl AddressKind {
    /// The kind tag embedded in the human-readable part.
    pub fn tag(&self) -> &'static str {
        match self {
            AddressKind::Shielded => "shield-addr",
            AddressKind::Unshielded => "addr",
            AddressKind::Dust => "dust",
        }
    }

    /// Prefix hint shown next to input prompts.
    pub fn hint(&self) -> &'static str {
        match self {
            AddressKind::Shielded => "mn_shield-addr",
            AddressKind::Unshielded => "mn_addr",
            AddressKind::Dust => "mn_dust",
        }
    }

    fn human_name(&self) -> &'static str {
        match self {
            AddressKind::Shielded => "shielded",
            AddressKind::Unshielded => "unshielded",
            AddressKind::Dust => "dust",
        }
    }
}

/// A successfully decoded address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub kind: AddressKind,
    pub network: NetworkId,
    pub payload: Vec<u8>,
}

fn hrp(kind: AddressKind, network: NetworkId) -> String {
    format!("mn_{}_{}", kind.tag(), network.hrp_suffix())
}

/// Encode a payload as a bech32m address for the given kind and network.
pub fn encode_address(
    kind: AddressKind,
    network: NetworkId,
    payload: &[u8],
) -> Result<String, AddressError> {
    bech32::encode(&hrp(kind, network), payload.to_base32(), Variant::Bech32m)
        .map_err(|e| AddressError::Malformed(e.to_string()))
}

/// Decode any wallet address, returning its kind, network, and payload.
pub fn parse_address(address: &str) -> Result<ParsedAddress, AddressError> {
    let (hrp, data, variant) =
        bech32::decode(address).map_err(|e| AddressError::Malformed(e.to_string()))?;
    if variant != Variant::Bech32m {
        return Err(AddressError::Malformed("not a bech32m string".to_string()));
    }

    let rest = hrp
        .strip_prefix("mn_")
        .ok_or_else(|| AddressError::Malformed(format!("unknown address prefix '{hrp}'")))?;

    // "shield-addr" must be matched before "addr" would ever be a candidate,
    // but the tags do not prefix each other so the order is free.
    let (kind, suffix) = [AddressKind::Shielded, AddressKind::Unshielded, AddressKind::Dust]
        .into_iter()
        .find_map(|kind| {
            let tagged = format!("{}_", kind.tag());
            rest.strip_prefix(&tagged).map(|suffix| (kind, suffix))
        })
        .ok_or_else(|| AddressError::Malformed(format!("unknown address kind in '{hrp}'")))?;

    let network = NetworkId::from_hrp_suffix(suffix)
        .ok_or_else(|| AddressError::Malformed(format!("unknown network suffix '{suffix}'")))?;

    let payload =
        Vec::<u8>::from_base32(&data).map_err(|e| AddressError::Malformed(e.to_string()))?;

    Ok(ParsedAddress {
        kind,
        network,
        payload,
    })
}

/// Validate that `address` is a well-formed address of `kind` on `network`.
/// Returns the canonical address string on success.
pub fn validate_address(
    address: &str,
    kind: AddressKind,
    network: NetworkId,
) -> Result<String, AddressError> {
    let parsed = parse_address(address)?;

    if parsed.kind != kind {
        return Err(AddressError::WrongKind {
            expected: kind.human_name(),
            hint: kind.hint(),
            found: parsed.kind.tag().to_string(),
        });
    }
    if parsed.network != network {
        return Err(AddressError::WrongNetwork {
            expected: network.hrp_suffix().to_string(),
            found: parsed.network.hrp_suffix().to_string(),
        });
    }

    Ok(address.to_string())
}

/// Validate a transfer receiver address for the given token type's kind.
pub fn validate_receiver(
    address: &str,
    shielded: bool,
    network: NetworkId,
) -> Result<String, AddressError> {
    let kind = if shielded {
        AddressKind::Shielded
    } else {
        AddressKind::Unshielded
    };
    validate_address(address, kind, network)
}
