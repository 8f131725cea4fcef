//! Integration tests for the full local bootstrap pipeline

use chainforge::bootstrap::{BootstrapOptions, CleanMode, LocalBootstrapper};
use chainforge::crypto::{address_from_hex, address_to_hex};
use chainforge::discovery::RuntimeConfig;
use chainforge::genesis::Genesis;
use chainforge::keys::{FileSecretStore, SecretStore};
use chainforge::keystore;
use chainforge::premine::{BRIDGE_EOA_ADDRESS, DEV_PREMINE_ADDRESSES, TOTAL_SUPPLY_WEI};
use chainforge::settings::DEVNET_NETWORK_ID;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn devnet_opts(root: &Path) -> BootstrapOptions {
    BootstrapOptions {
        root_dirpath: root.to_path_buf(),
        boot_count: 1,
        validator_count: 1,
        rpc_count: 1,
        gas_limit: 30_000_000,
        block_list_filepath: root.join("blocklist.json"),
        remote_network: None,
        remote_config_filepath: None,
        node_binary: PathBuf::from("forged"),
        clean_mode: CleanMode::Clean,
        secret_id_template: None,
    }
}

#[test]
fn test_devnet_environment_layout() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let bootstrapper = LocalBootstrapper::new(&devnet_opts(root.path()), None)?;

    let chain_dir = root
        .path()
        .join("devnet")
        .join(format!("chain-{}", DEVNET_NETWORK_ID));
    assert_eq!(bootstrapper.chain_dirpath(), chain_dir);

    // One node directory per role, each with a provisioned account
    let all_nodes: Vec<_> = bootstrapper
        .boots()
        .iter()
        .chain(bootstrapper.validators())
        .chain(bootstrapper.rpcs())
        .collect();
    assert_eq!(all_nodes.len(), 3);

    let names: HashSet<String> = all_nodes.iter().map(|n| n.name()).collect();
    assert_eq!(names.len(), 3);

    for node in &all_nodes {
        assert!(node.dirpath().starts_with(&chain_dir));
        let keystore_dir = keystore::keystore_dirpath(node.dirpath());
        assert!(fs::read_dir(&keystore_dir)?.next().is_some());

        let address_text = fs::read_to_string(node.dirpath().join("address"))?;
        let address = address_from_hex(address_text.trim())?;
        assert_eq!(address, node.account().address);

        let password_file = node.dirpath().join("password");
        assert_eq!(fs::read_to_string(password_file)?, "password");
    }
    Ok(())
}

#[test]
fn test_devnet_genesis_premines_and_signers() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let bootstrapper = LocalBootstrapper::new(&devnet_opts(root.path()), None)?;

    let genesis = Genesis::read(&bootstrapper.chain_dirpath().join("genesis.json"))?;
    genesis.spec.ensure_valid()?;

    // Bridge EOA plus every dev premine address, all at the total supply.
    // Duplicates in the dev list collapse into one allocation each.
    let bridge_key = address_to_hex(&address_from_hex(BRIDGE_EOA_ADDRESS)?);
    assert_eq!(genesis.spec.alloc[&bridge_key].balance, TOTAL_SUPPLY_WEI);
    let unique_dev: HashSet<String> = DEV_PREMINE_ADDRESSES
        .iter()
        .map(|a| Ok(address_to_hex(&address_from_hex(a)?)))
        .collect::<Result<_, Box<dyn std::error::Error>>>()?;
    assert_eq!(genesis.spec.alloc.len(), 1 + unique_dev.len());
    for key in &unique_dev {
        assert_eq!(genesis.spec.alloc[key].balance, TOTAL_SUPPLY_WEI);
    }

    // One validator: extra-data carries exactly its address between the
    // vanity and seal sections
    assert_eq!(genesis.spec.extra_data.len(), 32 + 20 + 65);
    let signer = &genesis.spec.extra_data[32..52];
    assert_eq!(signer, bootstrapper.validators()[0].account().address);
    Ok(())
}

#[test]
fn test_devnet_config_references_boot_enode() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let bootstrapper = LocalBootstrapper::new(&devnet_opts(root.path()), None)?;

    let config_text = fs::read_to_string(bootstrapper.chain_dirpath().join("config.toml"))?;
    let config: RuntimeConfig = toml::from_str(&config_text)?;

    assert_eq!(config.eth.network_id, DEVNET_NETWORK_ID);
    assert_eq!(config.node.bootnodes.len(), 1);
    let boot = &bootstrapper.boots()[0];
    assert!(config.node.bootnodes[0].starts_with("enode://"));
    assert!(config.node.bootnodes[0].ends_with(&format!("@127.0.0.1:{}", boot.port())));
    Ok(())
}

#[test]
fn test_chain_state_rendered_for_every_node() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let bootstrapper = LocalBootstrapper::new(&devnet_opts(root.path()), None)?;

    for node in bootstrapper
        .boots()
        .iter()
        .chain(bootstrapper.validators())
        .chain(bootstrapper.rpcs())
    {
        let ledger = node.dirpath().join("ledger");
        assert!(ledger.join("chaindata.db").exists());
        assert!(ledger.join("lightchaindata.db").exists());
        assert!(ledger.join("nodekey").exists());
    }
    Ok(())
}

#[test]
fn test_key_export_to_file_store() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let mut opts = devnet_opts(root.path());
    opts.secret_id_template = Some("forge/{ROLE}/key".to_string());

    let store = FileSecretStore::new(root.path().join("secrets"));
    LocalBootstrapper::new(&opts, Some(&store))?;

    // Boot and validator keys are exported, RPC keys are not
    let boot_key = store.get_secret("forge/boot-0/key")?;
    assert_eq!(boot_key.len(), 64);
    let validator_key = store.get_secret("forge/validator-0/key")?;
    assert_eq!(validator_key.len(), 64);
    assert!(store.get_secret("forge/rpc-0/key").is_err());
    Ok(())
}

#[test]
fn test_remote_attach_with_validators_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let mut opts = devnet_opts(root.path());
    opts.remote_network = Some("testnet".to_string());

    let result = LocalBootstrapper::new(&opts, None);
    assert!(result.is_err());
    assert!(fs::read_dir(root.path())?.next().is_none());
    Ok(())
}

#[test]
fn test_clean_removes_environment() -> Result<(), Box<dyn std::error::Error>> {
    let root = TempDir::new()?;
    let bootstrapper = LocalBootstrapper::new(&devnet_opts(root.path()), None)?;
    assert!(bootstrapper.root_env_dirpath().exists());

    bootstrapper.clean();
    assert!(!bootstrapper.root_env_dirpath().exists());
    Ok(())
}
