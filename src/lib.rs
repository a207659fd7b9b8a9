//! Interactive terminal wallet for Midnight-style multi-ledger networks:
//! shielded, unshielded (NIGHT), and the dust rewards wallet.

pub mod config;
pub mod engine;
pub mod interactive;
pub mod navigation;
pub mod types;
pub mod utils;
