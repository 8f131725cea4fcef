//! Enode derivation and shared runtime config rendering
//!
//! Every non-boot node reads one shared TOML config at start. It carries the
//! fixed node-operation policy for the chain plus the discovery bootstrap
//! list derived from the boot nodes' network identity keys. Rendering must
//! happen after boot chain state exists and before any process launches.

use crate::crypto::KeyPair;
use crate::error::Result;
use crate::settings::PRICE_LIMIT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Upper bound on peer connections for every node.
pub const MAX_PEERS: u32 = 100;

/// A boot node's identity and listen endpoint, as needed to derive its
/// discovery address.
#[derive(Debug, Clone)]
pub struct BootEndpoint {
    pub key: KeyPair,
    pub host: String,
    pub port: u16,
}

/// The shared runtime configuration file, TOML-encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    pub eth: EthSection,
    pub node: NodeSection,
}

/// Execution-layer policy every node runs with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EthSection {
    pub sync_mode: String,
    pub no_pruning: bool,
    pub network_id: u64,
    pub database_cache: u32,
    pub trie_clean_cache: u32,
    pub trie_dirty_cache: u32,
    pub filter_log_cache_size: u32,
    pub txpool: TxPoolSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TxPoolSection {
    /// Minimum tip cap and/or gas price enforced on admission.
    pub price_limit: u64,
    pub no_locals: bool,
    pub price_bump: u32,
    pub account_slots: u32,
    pub global_slots: u32,
    pub account_queue: u32,
    pub global_queue: u32,
    pub lifetime_secs: u64,
}

/// Peer-to-peer parameters shared by every node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSection {
    pub allow_unprotected_txs: bool,
    pub ipc_path: String,
    pub bootnodes: Vec<String>,
    pub max_peers: u32,
}

/// Derive a node's discovery address from its identity key and endpoint:
/// `enode://<uncompressed-pubkey-hex>@<host>:<port>`.
pub fn enode_url(key: &KeyPair, host: &str, port: u16) -> String {
    // The leading 0x04 format byte is not part of the enode identity.
    let pubkey_hex = hex::encode(&key.public_key_bytes()[1..]);
    format!("enode://{}@{}:{}", pubkey_hex, host, port)
}

/// Default execution policy for a chain.
pub fn eth_section(chain_id: u64) -> EthSection {
    EthSection {
        sync_mode: "full".to_string(),
        no_pruning: true,
        network_id: chain_id,
        database_cache: 512,
        trie_clean_cache: 256,
        trie_dirty_cache: 256,
        filter_log_cache_size: 32,
        txpool: TxPoolSection {
            price_limit: PRICE_LIMIT,
            no_locals: true,
            price_bump: 10,
            account_slots: 16,
            global_slots: 4096 + 1024,
            account_queue: 64,
            global_queue: 1024,
            lifetime_secs: 3600,
        },
    }
}

/// Build and write the shared runtime configuration referencing all boot
/// node discovery addresses. Returns the rendered config.
pub fn render_config(boots: &[BootEndpoint], config_path: &Path, chain_id: u64) -> Result<RuntimeConfig> {
    let bootnodes = boots
        .iter()
        .map(|b| enode_url(&b.key, &b.host, b.port))
        .collect();

    let config = RuntimeConfig {
        eth: eth_section(chain_id),
        node: NodeSection {
            allow_unprotected_txs: true,
            ipc_path: "forge.ipc".to_string(),
            bootnodes,
            max_peers: MAX_PEERS,
        },
    };

    fs::write(config_path, toml::to_string_pretty(&config)?)?;
    info!(
        path = %config_path.display(),
        bootnodes = config.node.bootnodes.len(),
        "rendered runtime config"
    );
    Ok(config)
}
