//! Genesis construction and validation
//!
//! Builds the genesis specification for a locally generated Clique chain:
//! chain parameters, premined allocation, and the binary signer list encoded
//! in extra-data. For a remote-network attach the canned genesis resource is
//! loaded instead, but it must pass the same validation before the bootstrap
//! pipeline is allowed to continue.

use crate::crypto::{address_to_hex, Address, ADDRESS_SIZE};
use crate::error::{BootstrapError, Result};
use crate::settings::{Network, KNOWN_NETWORK_IDS, SECONDS_PER_BLOCK};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Vanity prefix length of the Clique extra-data field.
pub const EXTRA_VANITY: usize = 32;
/// Seal suffix length of the Clique extra-data field.
pub const EXTRA_SEAL: usize = 65;
/// Clique epoch: checkpoint interval in blocks.
pub const CLIQUE_EPOCH: u64 = 30_000;

/// An address and the wei amount credited to it in the genesis block.
#[derive(Debug, Clone, Copy)]
pub struct Premine {
    pub address: Address,
    pub wei: u128,
}

/// All the options for generating a genesis.
#[derive(Debug, Clone)]
pub struct ChainOptions {
    pub gas_limit: u64,
    pub seconds_per_block: u64,
    /// Clique signers, in order. May be empty only for chains that permit
    /// zero signers; an empty list yields an unsealable chain.
    pub validators: Vec<Address>,
    pub premines: Vec<Premine>,
    pub chain_id: u64,
    pub dirpath: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliqueConfig {
    pub period: u64,
    pub epoch: u64,
}

/// Chain parameters embedded in the genesis. All pre/post-merge forks are
/// frozen at block 0; timestamp forks (Shanghai, Prevrandao, Cancun) activate
/// via network-specific timestamps outside genesis, never inside it, so the
/// file stays portable across environments that fork at different times.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    pub homestead_block: u64,
    pub eip150_block: u64,
    pub eip155_block: u64,
    pub eip158_block: u64,
    pub byzantium_block: u64,
    pub constantinople_block: u64,
    pub petersburg_block: u64,
    pub istanbul_block: u64,
    pub muir_glacier_block: u64,
    pub berlin_block: u64,
    pub london_block: u64,
    pub arrow_glacier_block: u64,
    pub gray_glacier_block: u64,
    pub merge_netsplit_block: u64,
    pub clique: Option<CliqueConfig>,
    pub is_reorg_blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shanghai_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevrandao_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancun_time: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisAccount {
    #[serde(with = "wei_string")]
    pub balance: u128,
}

/// The genesis specification serialized to `genesis.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisSpec {
    pub config: ChainConfig,
    #[serde(with = "hex_u64")]
    pub difficulty: u64,
    #[serde(with = "hex_u64")]
    pub gas_limit: u64,
    #[serde(with = "hex_bytes")]
    pub extra_data: Vec<u8>,
    pub alloc: BTreeMap<String, GenesisAccount>,
}

impl GenesisSpec {
    /// Validates the invariants every chain in this deployment must hold:
    /// reorg-blocking enabled, a Clique period equal to the configured
    /// seconds-per-block, and a known chain ID. An invalid genesis must not
    /// reach chain-state rendering because it becomes baked into the ledger.
    pub fn ensure_valid(&self) -> Result<()> {
        if !self.config.is_reorg_blocked {
            return Err(BootstrapError::InvalidGenesis(
                "reorg blocking must be enabled".to_string(),
            ));
        }
        match &self.config.clique {
            None => {
                return Err(BootstrapError::InvalidGenesis(
                    "clique config must be set".to_string(),
                ))
            }
            Some(clique) if clique.period != SECONDS_PER_BLOCK => {
                return Err(BootstrapError::InvalidGenesis(format!(
                    "clique period {} does not match {} seconds per block",
                    clique.period, SECONDS_PER_BLOCK
                )))
            }
            Some(_) => {}
        }
        if !KNOWN_NETWORK_IDS.contains(&self.config.chain_id) {
            return Err(BootstrapError::InvalidGenesis(format!(
                "unknown chain ID {}",
                self.config.chain_id
            )));
        }
        Ok(())
    }
}

/// A built genesis and where it lives on disk.
#[derive(Debug, Clone)]
pub struct Genesis {
    pub spec: GenesisSpec,
    pub filepath: PathBuf,
    /// Serialized form, kept to avoid re-marshalling.
    pub json: Vec<u8>,
}

impl Genesis {
    /// Build a genesis for a locally generated Clique chain.
    pub fn build(opts: &ChainOptions) -> Result<Genesis> {
        // Premined allocation. A duplicate address overwrites the earlier
        // entry; amounts are not summed.
        let mut alloc = BTreeMap::new();
        for premine in &opts.premines {
            alloc.insert(
                address_to_hex(&premine.address),
                GenesisAccount {
                    balance: premine.wei,
                },
            );
        }

        let spec = GenesisSpec {
            config: ChainConfig {
                chain_id: opts.chain_id,
                homestead_block: 0,
                eip150_block: 0,
                eip155_block: 0,
                eip158_block: 0,
                byzantium_block: 0,
                constantinople_block: 0,
                petersburg_block: 0,
                istanbul_block: 0,
                muir_glacier_block: 0,
                berlin_block: 0,
                london_block: 0,
                arrow_glacier_block: 0,
                gray_glacier_block: 0,
                merge_netsplit_block: 0,
                clique: Some(CliqueConfig {
                    period: opts.seconds_per_block,
                    epoch: CLIQUE_EPOCH,
                }),
                is_reorg_blocked: true,
                shanghai_time: None,
                prevrandao_time: None,
                cancun_time: None,
            },
            difficulty: 1,
            gas_limit: opts.gas_limit,
            extra_data: clique_extra_data(&opts.validators),
            alloc,
        };

        let json = serde_json::to_vec_pretty(&spec)?;
        Ok(Genesis {
            spec,
            filepath: opts.dirpath.join("genesis.json"),
            json,
        })
    }

    /// Load the canned genesis resource for a pre-existing remote network.
    pub fn from_network(network: &Network) -> Result<Genesis> {
        let json = network.genesis_json();
        let spec: GenesisSpec = serde_json::from_str(json)?;
        Ok(Genesis {
            spec,
            filepath: PathBuf::from(format!("networks/{}.json", network.name())),
            json: json.as_bytes().to_vec(),
        })
    }

    /// Write the serialized genesis to its file path.
    pub fn write(&self) -> Result<()> {
        fs::write(&self.filepath, &self.json)?;
        info!(path = %self.filepath.display(), "wrote genesis file");
        Ok(())
    }

    /// Parse a genesis file back from disk.
    pub fn read(path: &Path) -> Result<Genesis> {
        let json = fs::read(path)?;
        let spec: GenesisSpec = serde_json::from_slice(&json)?;
        Ok(Genesis {
            spec,
            filepath: path.to_path_buf(),
            json,
        })
    }
}

/// Encode the Clique signer list: 32 vanity zero bytes, the concatenated
/// 20-byte signer addresses in input order, and 65 zero seal bytes.
/// See EIP-225.
pub fn clique_extra_data(validators: &[Address]) -> Vec<u8> {
    let mut extra_data = vec![0u8; EXTRA_VANITY + ADDRESS_SIZE * validators.len() + EXTRA_SEAL];
    for (i, validator) in validators.iter().enumerate() {
        let from = EXTRA_VANITY + ADDRESS_SIZE * i;
        extra_data[from..from + ADDRESS_SIZE].copy_from_slice(validator);
    }
    extra_data
}

mod hex_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        u64::from_str_radix(stripped, 16).map_err(serde::de::Error::custom)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(stripped).map_err(serde::de::Error::custom)
    }
}

mod wei_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map_err(serde::de::Error::custom)
    }
}
