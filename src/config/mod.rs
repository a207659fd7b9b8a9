//! Compiled-in environment catalogue and the configuration edited by the
//! settings flow. Nothing here is persisted; edits live for the session only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Proving server default (runs locally). Users are expected to start a
/// proving server instance before pointing the wallet at a real network.
pub const PROVING_SERVER_URL: &str = "http://localhost:6300";

/// Named environments the wallet can connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    PreProd,
    Preview,
    QaNet,
    DevNet,
    Undeployed,
}

impl Environment {
    pub const ALL: [Environment; 5] = [
        Environment::PreProd,
        Environment::Preview,
        Environment::QaNet,
        Environment::DevNet,
        Environment::Undeployed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Environment::PreProd => "PreProd",
            Environment::Preview => "Preview",
            Environment::QaNet => "QANet",
            Environment::DevNet => "DevNet",
            Environment::Undeployed => "Undeployed",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Network identifier carried inside addresses. Tied one-to-one to an
/// [`Environment`] today, but kept separate because addresses are tagged with
/// the network, not with the environment name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkId {
    PreProd,
    Preview,
    QaNet,
    DevNet,
    Undeployed,
}

impl NetworkId {
    /// Suffix appended to the bech32m human-readable part.
    pub fn hrp_suffix(&self) -> &'static str {
        match self {
            NetworkId::PreProd => "preprod",
            NetworkId::Preview => "preview",
            NetworkId::QaNet => "qanet",
            NetworkId::DevNet => "dev",
            NetworkId::Undeployed => "undeployed",
        }
    }

    pub fn from_hrp_suffix(suffix: &str) -> Option<NetworkId> {
        match suffix {
            "preprod" => Some(NetworkId::PreProd),
            "preview" => Some(NetworkId::Preview),
            "qanet" => Some(NetworkId::QaNet),
            "dev" => Some(NetworkId::DevNet),
            "undeployed" => Some(NetworkId::Undeployed),
            _ => None,
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hrp_suffix())
    }
}

/// Endpoints and network identity for one environment. One instance is
/// "current" at any time; only the settings flow replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub network_id: NetworkId,
    pub indexer_http_url: String,
    pub indexer_ws_url: String,
    pub node_ws_url: String,
    pub proving_server_url: String,
}

/// Derive the indexer WebSocket URL from its HTTP URL: swap the scheme
/// (`https` -> `wss`, `http` -> `ws`) and append `/ws` unless already there.
pub fn derive_indexer_ws_url(http_url: &str) -> String {
    let ws_url = if let Some(rest) = http_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = http_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        http_url.to_string()
    };

    if ws_url.ends_with("/ws") {
        ws_url
    } else {
        format!("{ws_url}/ws")
    }
}

fn deployed_config(network_id: NetworkId, indexer_host: &str, rpc_host: &str) -> EnvironmentConfig {
    let indexer_http_url = format!("https://{indexer_host}/api/v3/graphql");
    EnvironmentConfig {
        network_id,
        indexer_ws_url: derive_indexer_ws_url(&indexer_http_url),
        indexer_http_url,
        node_ws_url: format!("wss://{rpc_host}"),
        proving_server_url: PROVING_SERVER_URL.to_string(),
    }
}

/// Compiled-in defaults for a named environment.
pub fn environment_config(environment: Environment) -> EnvironmentConfig {
    match environment {
        Environment::PreProd => deployed_config(
            NetworkId::PreProd,
            "indexer.preprod.midnight.network",
            "rpc.preprod.midnight.network",
        ),
        Environment::Preview => deployed_config(
            NetworkId::Preview,
            "indexer.preview.midnight.network",
            "rpc.preview.midnight.network",
        ),
        Environment::QaNet => deployed_config(
            NetworkId::QaNet,
            "indexer.qanet.dev.midnight.network",
            "rpc.qanet.dev.midnight.network",
        ),
        Environment::DevNet => deployed_config(
            NetworkId::DevNet,
            "indexer.devnet.midnight.network",
            "rpc.devnet.midnight.network",
        ),
        Environment::Undeployed => EnvironmentConfig {
            network_id: NetworkId::Undeployed,
            indexer_http_url: "http://localhost:8088/api/v3/graphql".to_string(),
            indexer_ws_url: "ws://localhost:8088/api/v3/graphql/ws".to_string(),
            node_ws_url: "ws://localhost:8080".to_string(),
            proving_server_url: PROVING_SERVER_URL.to_string(),
        },
    }
}
