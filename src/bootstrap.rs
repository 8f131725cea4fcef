//! Local bootstrapper
//!
//! Provisions a full local chain environment under a root directory and runs
//! every node as a supervised subprocess. The pipeline is: validate options,
//! provision node directories and accounts, build or load the genesis,
//! validate it, render per-node chain state, optionally export node keys,
//! render the shared discovery config, then launch.

use crate::chainstate;
use crate::crypto::address_from_hex;
use crate::discovery::{self, BootEndpoint};
use crate::error::{BootstrapError, Result};
use crate::genesis::{ChainOptions, Genesis};
use crate::keys::{self, SecretStore};
use crate::keystore;
use crate::node::{Node, NodeOptions, NodeRuntimeConfig, PORT_P2P};
use crate::premine::{self, BRIDGE_EOA_ADDRESS};
use crate::role::Role;
use crate::settings::{Network, SECONDS_PER_BLOCK};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Keystore password shared by all local nodes. The password file for each
/// node is written at `<node_dir>/<password>`.
pub const NODE_PASSWORD: &str = "password";

/// Delay between starting the boot nodes and starting the chain nodes, so
/// discovery is listening before anyone dials it. A fixed delay stands in
/// for a readiness probe.
pub const BOOT_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Validators and RPC nodes share per-ordinal port offsets within a range of
/// ten, so a single host cannot run more than this many of them.
pub const MAX_PORT_OFFSET_NODES: usize = 9;

/// What to do with a chain directory left over from a previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanMode {
    /// Wipe the chain directory before provisioning.
    #[default]
    Clean,
    /// Keep existing state. Refuses to run if the chain directory is
    /// non-empty, rather than silently destroying it.
    Reuse,
}

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub root_dirpath: PathBuf,
    pub boot_count: usize,
    pub validator_count: usize,
    pub rpc_count: usize,
    pub gas_limit: u64,
    pub block_list_filepath: PathBuf,
    /// When set, attach to this network with its canned genesis instead of
    /// generating one locally.
    pub remote_network: Option<String>,
    /// Config file to use when attaching to a remote network. Local runs
    /// render their own config under the chain directory.
    pub remote_config_filepath: Option<PathBuf>,
    pub node_binary: PathBuf,
    pub clean_mode: CleanMode,
    /// When set, node keys are exported to the secret store under IDs
    /// derived from this template.
    pub secret_id_template: Option<String>,
}

/// A fully provisioned local environment, ready to launch.
#[derive(Debug)]
pub struct LocalBootstrapper {
    network: Network,
    root_env_dirpath: PathBuf,
    chain_dirpath: PathBuf,
    boots: Vec<Node>,
    validators: Vec<Node>,
    rpcs: Vec<Node>,
}

impl LocalBootstrapper {
    /// Provision the whole environment. Option validation happens before any
    /// filesystem side effect so that bad invocations leave no residue.
    pub fn new(
        opts: &BootstrapOptions,
        secret_store: Option<&dyn SecretStore>,
    ) -> Result<LocalBootstrapper> {
        if let Some(network_name) = &opts.remote_network {
            if opts.validator_count > 0 {
                return Err(BootstrapError::Config(format!(
                    "cannot run validators against remote network {}",
                    network_name
                )));
            }
        }
        if opts.validator_count + opts.rpc_count > MAX_PORT_OFFSET_NODES {
            return Err(BootstrapError::Config(format!(
                "cannot run more than {} validator and rpc nodes on one host",
                MAX_PORT_OFFSET_NODES
            )));
        }
        if let Some(template) = &opts.secret_id_template {
            // Validates the placeholder up front
            keys::secret_id(template, "probe")?;
        }

        let network = Network::new(opts.remote_network.as_deref().unwrap_or("devnet"))?;
        let root_env_dirpath = opts.root_dirpath.join(network.name());
        let chain_dirpath = root_env_dirpath.join(format!("chain-{}", network.id()));

        match opts.clean_mode {
            CleanMode::Clean => {
                if chain_dirpath.exists() {
                    info!(dir = %chain_dirpath.display(), "removing previous chain directory");
                    fs::remove_dir_all(&chain_dirpath)?;
                }
            }
            CleanMode::Reuse => {
                if !chainstate::is_empty_or_missing(&chain_dirpath)? {
                    return Err(BootstrapError::Config(format!(
                        "chain directory {} is not empty; run in clean mode to discard it",
                        chain_dirpath.display()
                    )));
                }
            }
        }
        fs::create_dir_all(&chain_dirpath)?;

        let config_filepath = match &opts.remote_config_filepath {
            Some(path) => path.clone(),
            None => chain_dirpath.join("config.toml"),
        };
        let runtime_conf = NodeRuntimeConfig {
            network: network.clone(),
            config_filepath: config_filepath.clone(),
            block_list_filepath: opts.block_list_filepath.clone(),
            node_binary: opts.node_binary.clone(),
        };

        let total = opts.boot_count + opts.validator_count + opts.rpc_count;
        let mut nodes = Vec::with_capacity(total);
        for i in 0..total {
            let (role, ordinal) =
                role_and_ordinal(opts.boot_count, opts.validator_count, i);
            let node = Node::new(
                &NodeOptions {
                    role,
                    ordinal,
                    password: NODE_PASSWORD.to_string(),
                    host: "127.0.0.1".to_string(),
                    port: PORT_P2P + i as u16,
                    chain_dirpath: chain_dirpath.clone(),
                },
                &runtime_conf,
            )?;
            fs::write(node.password_filepath(), node.password())?;
            nodes.push(node);
        }

        let rpcs = nodes.split_off(opts.boot_count + opts.validator_count);
        let validators = nodes.split_off(opts.boot_count);
        let boots = nodes;

        let genesis = if opts.remote_network.is_none() {
            let genesis = Genesis::build(&ChainOptions {
                gas_limit: opts.gas_limit,
                seconds_per_block: SECONDS_PER_BLOCK,
                validators: validators.iter().map(|n| n.account().address).collect(),
                premines: premine::premines(&network, address_from_hex(BRIDGE_EOA_ADDRESS)?)?,
                chain_id: network.id(),
                dirpath: chain_dirpath.clone(),
            })?;
            genesis.write()?;
            info!(path = %genesis.filepath.display(), "wrote genesis");
            genesis
        } else {
            Genesis::from_network(&network)?
        };
        // Both the generated and the canned genesis must describe a chain we
        // are willing to run.
        genesis.spec.ensure_valid()?;

        let mut boot_endpoints = Vec::new();
        for node in boots.iter().chain(&validators).chain(&rpcs) {
            let node_key = chainstate::render(node.dirpath(), &genesis)?;
            if node.role() == Role::Boot {
                boot_endpoints.push(BootEndpoint {
                    key: node_key,
                    host: node.host().to_string(),
                    port: node.port(),
                });
            }
        }

        if let (Some(template), Some(store)) = (&opts.secret_id_template, secret_store) {
            export_keys(store, template, boots.iter().chain(&validators))?;
        }

        // Local networks render their own shared config; remote attaches
        // bring one along.
        if opts.remote_network.is_none() {
            discovery::render_config(&boot_endpoints, &config_filepath, network.id())?;
        }

        Ok(LocalBootstrapper {
            network,
            root_env_dirpath,
            chain_dirpath,
            boots,
            validators,
            rpcs,
        })
    }

    /// Run every node until all exit. Boot nodes start first and get a fixed
    /// settle delay before the chain nodes dial in. The first node failure
    /// cancels the shared token, terminating the remaining processes, and
    /// becomes the result of the whole run.
    pub async fn launch(&self, extra_args: &[String]) -> Result<()> {
        let shutdown = CancellationToken::new();
        let mut set: JoinSet<Result<()>> = JoinSet::new();

        for node in &self.boots {
            spawn_node(&mut set, node.clone(), Vec::new(), shutdown.clone());
        }
        if !self.boots.is_empty() {
            tokio::time::sleep(BOOT_SETTLE_DELAY).await;
        }
        for node in self.validators.iter().chain(&self.rpcs) {
            spawn_node(&mut set, node.clone(), extra_args.to_vec(), shutdown.clone());
        }

        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            let result = joined
                .map_err(|e| BootstrapError::Process(format!("node task panicked: {}", e)))?;
            if let Err(e) = result {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Remove the whole environment directory for this network.
    pub fn clean(&self) {
        if let Err(e) = fs::remove_dir_all(&self.root_env_dirpath) {
            warn!(dir = %self.root_env_dirpath.display(), error = %e, "failed to clean environment");
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn root_env_dirpath(&self) -> &Path {
        &self.root_env_dirpath
    }

    pub fn chain_dirpath(&self) -> &Path {
        &self.chain_dirpath
    }

    pub fn boots(&self) -> &[Node] {
        &self.boots
    }

    pub fn validators(&self) -> &[Node] {
        &self.validators
    }

    pub fn rpcs(&self) -> &[Node] {
        &self.rpcs
    }
}

fn spawn_node(
    set: &mut JoinSet<Result<()>>,
    node: Node,
    extra_args: Vec<String>,
    shutdown: CancellationToken,
) {
    set.spawn(async move {
        let result = node.run(&extra_args, shutdown.clone()).await;
        if let Err(e) = &result {
            error!(node = %node.name(), error = %e, "node failed, shutting down siblings");
            shutdown.cancel();
        }
        result
    });
}

/// Map a flat launch index to a role and a per-role ordinal. Boot nodes come
/// first, then validators, then RPC nodes.
pub fn role_and_ordinal(boot_count: usize, validator_count: usize, index: usize) -> (Role, usize) {
    if index < boot_count {
        (Role::Boot, index)
    } else if index < boot_count + validator_count {
        (Role::Validator, index - boot_count)
    } else {
        (Role::Rpc, index - boot_count - validator_count)
    }
}

/// Push node keys to the secret store: the account key for validators, the
/// network identity key for boots.
fn export_keys<'a>(
    store: &dyn SecretStore,
    template: &str,
    nodes: impl Iterator<Item = &'a Node>,
) -> Result<()> {
    for node in nodes {
        let id = keys::secret_id(template, &node.name())?;
        let key = match node.role() {
            Role::Boot => chainstate::load_node_key(node.dirpath())?,
            _ => {
                let keystore_dir = keystore::keystore_dirpath(node.dirpath());
                let entry = fs::read_dir(&keystore_dir)?
                    .next()
                    .ok_or_else(|| {
                        BootstrapError::Keystore(format!(
                            "no keystore file under {}",
                            keystore_dir.display()
                        ))
                    })??;
                keystore::decrypt(&entry.path(), node.password())?
            }
        };
        store.put_secret_string(&id, &key.secret_hex())?;
        info!(node = %node.name(), id = %id, "exported node key");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base_opts(root: &Path) -> BootstrapOptions {
        BootstrapOptions {
            root_dirpath: root.to_path_buf(),
            boot_count: 1,
            validator_count: 1,
            rpc_count: 0,
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
    fn test_role_and_ordinal_layout() {
        assert_eq!(role_and_ordinal(2, 3, 0), (Role::Boot, 0));
        assert_eq!(role_and_ordinal(2, 3, 1), (Role::Boot, 1));
        assert_eq!(role_and_ordinal(2, 3, 2), (Role::Validator, 0));
        assert_eq!(role_and_ordinal(2, 3, 4), (Role::Validator, 2));
        assert_eq!(role_and_ordinal(2, 3, 5), (Role::Rpc, 0));
    }

    #[test]
    fn test_remote_network_with_validators_rejected_before_side_effects() {
        let dir = TempDir::new().unwrap();
        let mut opts = base_opts(dir.path());
        opts.remote_network = Some("testnet".to_string());
        opts.validator_count = 1;

        let result = LocalBootstrapper::new(&opts, None);
        assert!(result.is_err());
        // No directories were created
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_too_many_port_offset_nodes_rejected() {
        let dir = TempDir::new().unwrap();
        let mut opts = base_opts(dir.path());
        opts.validator_count = 5;
        opts.rpc_count = 5;

        let result = LocalBootstrapper::new(&opts, None);
        assert!(result.is_err());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_bad_secret_template_rejected_before_side_effects() {
        let dir = TempDir::new().unwrap();
        let mut opts = base_opts(dir.path());
        opts.secret_id_template = Some("forge/keys/no-placeholder".to_string());

        assert!(LocalBootstrapper::new(&opts, None).is_err());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_reuse_mode_refuses_non_empty_chain_dir() {
        let dir = TempDir::new().unwrap();
        let chain_dir = dir
            .path()
            .join("devnet")
            .join(format!("chain-{}", crate::settings::DEVNET_NETWORK_ID));
        fs::create_dir_all(&chain_dir).unwrap();
        fs::write(chain_dir.join("leftover"), b"x").unwrap();

        let mut opts = base_opts(dir.path());
        opts.clean_mode = CleanMode::Reuse;

        let result = LocalBootstrapper::new(&opts, None);
        assert!(result.unwrap_err().to_string().contains("not empty"));
    }

    #[test]
    fn test_clean_mode_wipes_previous_chain_dir() {
        let dir = TempDir::new().unwrap();
        let chain_dir = dir
            .path()
            .join("devnet")
            .join(format!("chain-{}", crate::settings::DEVNET_NETWORK_ID));
        fs::create_dir_all(&chain_dir).unwrap();
        fs::write(chain_dir.join("leftover"), b"x").unwrap();

        let bootstrapper = LocalBootstrapper::new(&base_opts(dir.path()), None).unwrap();
        assert!(!chain_dir.join("leftover").exists());
        assert_eq!(bootstrapper.boots().len(), 1);
        assert_eq!(bootstrapper.validators().len(), 1);
    }
}
