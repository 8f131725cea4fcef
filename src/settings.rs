//! Network and chain parameter tables
//!
//! These are constructed once per bootstrap run and passed by value into the
//! genesis builder and validators, never read as ambient global state.

use crate::error::{BootstrapError, Result};

/// Minimum gas price that RPC nodes will accept for transactions.
pub const PRICE_LIMIT: u64 = 10 * 1_000_000_000;
/// Amount of time between blocks.
pub const SECONDS_PER_BLOCK: u64 = 2;
/// Smaller max base fee rate of change (12.5% -> 2%) to account for the short
/// block time. At 50 it takes 72 seconds for the base fee to double.
pub const BASE_FEE_CHANGE_DENOMINATOR: u64 = 50;

/// Network ID for the mainnet.
pub const MAINNET_NETWORK_ID: u64 = 13371;
/// Network ID for the testnet.
pub const TESTNET_NETWORK_ID: u64 = 13473;
/// Network ID for the devnet.
pub const DEVNET_NETWORK_ID: u64 = 15003;

/// Known network IDs a genesis chain ID must match.
pub const KNOWN_NETWORK_IDS: [u64; 3] =
    [MAINNET_NETWORK_ID, TESTNET_NETWORK_ID, DEVNET_NETWORK_ID];

pub const MAINNET_RPC: &str = "https://rpc.mainnet.chainforge.io";
pub const TESTNET_RPC: &str = "https://rpc.testnet.chainforge.io";
pub const DEVNET_RPC: &str = "https://rpc.devnet.chainforge.io";

const GENESIS_MAINNET_JSON: &str = include_str!("networks/mainnet.json");
const GENESIS_TESTNET_JSON: &str = include_str!("networks/testnet.json");
const GENESIS_DEVNET_JSON: &str = include_str!("networks/devnet.json");

/// A unix timestamp at which a network fork activates. Forks activate via
/// these per-network timestamps outside genesis, never inside it, so the
/// genesis file stays portable across environments that fork at different
/// times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fork {
    unix: i64,
}

impl Fork {
    pub const fn at(unix: i64) -> Self {
        Fork { unix }
    }

    pub fn unix(&self) -> i64 {
        self.unix
    }

    /// Returns true if the given unix timestamp is past the fork timestamp.
    pub fn is_enabled_at(&self, time: i64) -> bool {
        time >= self.unix
    }
}

// Tue Feb 27 21:00:00 UTC 2024
pub const DEVNET_SHANGHAI_FORK: Fork = Fork::at(1_709_067_600);
// Tue Mar 12 22:00:00 UTC 2024
pub const TESTNET_SHANGHAI_FORK: Fork = Fork::at(1_710_280_800);
// Tue Mar 26 22:00:00 UTC 2024
pub const MAINNET_SHANGHAI_FORK: Fork = Fork::at(1_711_490_400);

pub const DEVNET_PREVRANDAO_FORK: Fork = DEVNET_SHANGHAI_FORK;
pub const TESTNET_PREVRANDAO_FORK: Fork = TESTNET_SHANGHAI_FORK;
// Only mainnet has a Prevrandao fork separate from the Shanghai fork.
// Wed Mar 20 01:50:02 UTC 2024
pub const MAINNET_PREVRANDAO_FORK: Fork = Fork::at(1_710_899_402);

// Tue Aug 27 22:00:00 UTC 2024
pub const DEVNET_CANCUN_FORK: Fork = Fork::at(1_724_796_000);
// Mon Sep 23 22:00:00 UTC 2024
pub const TESTNET_CANCUN_FORK: Fork = Fork::at(1_727_128_800);
// Mon Oct  7 22:00:00 UTC 2024
pub const MAINNET_CANCUN_FORK: Fork = Fork::at(1_728_338_400);

/// A named network with its chain parameters and canned genesis resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    name: &'static str,
    id: u64,
    genesis_json: &'static str,
    cancun: Fork,
}

impl Network {
    /// Looks up a network by name, which must be one of `devnet`, `testnet`,
    /// or `mainnet`.
    pub fn new(name: &str) -> Result<Network> {
        match name {
            "devnet" => Ok(Network {
                name: "devnet",
                id: DEVNET_NETWORK_ID,
                genesis_json: GENESIS_DEVNET_JSON,
                cancun: DEVNET_CANCUN_FORK,
            }),
            "testnet" => Ok(Network {
                name: "testnet",
                id: TESTNET_NETWORK_ID,
                genesis_json: GENESIS_TESTNET_JSON,
                cancun: TESTNET_CANCUN_FORK,
            }),
            "mainnet" => Ok(Network {
                name: "mainnet",
                id: MAINNET_NETWORK_ID,
                genesis_json: GENESIS_MAINNET_JSON,
                cancun: MAINNET_CANCUN_FORK,
            }),
            other => Err(BootstrapError::UnsupportedNetwork(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// JSON text of the canned genesis block for this network.
    pub fn genesis_json(&self) -> &'static str {
        self.genesis_json
    }

    pub fn cancun(&self) -> Fork {
        self.cancun
    }

    pub fn rpc(&self) -> Result<&'static str> {
        match self.id {
            MAINNET_NETWORK_ID => Ok(MAINNET_RPC),
            TESTNET_NETWORK_ID => Ok(TESTNET_RPC),
            DEVNET_NETWORK_ID => Ok(DEVNET_RPC),
            _ => Err(BootstrapError::UnsupportedNetwork(self.name.to_string())),
        }
    }

    pub fn is_devnet(&self) -> bool {
        self.id == DEVNET_NETWORK_ID
    }
}
