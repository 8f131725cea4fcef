//! Per-node argv/env construction and subprocess supervision
//!
//! A [`Node`] is a runnable chain-node process produced by the bootstrapper.
//! Its argument vector is fixed at provisioning time from its role; ports are
//! offset by ordinal so several nodes can share one host.

use crate::crypto::address_to_hex;
use crate::error::{BootstrapError, Result};
use crate::keystore::{self, Account};
use crate::role::{canonical_node_name, Role};
use crate::settings::Network;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const PORT_P2P: u16 = 30300;
pub const PORT_RPC: u16 = 8545;
pub const PORT_WS: u16 = 8535;
pub const PORT_METRICS: u16 = 6060;
pub const PORT_AUTH_RPC: u16 = 8550;
pub const PORT_PPROF: u16 = 7070;

/// Environment variable carrying the keystore password file path into the
/// node process.
pub const PASSWORD_FILE_ENV_VAR: &str = "FORGE_PASSWORD_FILE";

/// Node-specific values.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    pub role: Role,
    pub ordinal: usize,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub chain_dirpath: PathBuf,
}

/// Configuration relevant for all nodes of a bootstrap run.
#[derive(Debug, Clone)]
pub struct NodeRuntimeConfig {
    pub network: Network,
    pub config_filepath: PathBuf,
    pub block_list_filepath: PathBuf,
    /// The chain-node executable launched for every role.
    pub node_binary: PathBuf,
}

/// A runnable chain node. It depends on files rendered by the bootstrap
/// process and is immutable after creation.
#[derive(Debug, Clone)]
pub struct Node {
    role: Role,
    ordinal: usize,
    account: Account,
    dirpath: PathBuf,
    password: String,
    host: String,
    port: u16,
    args: Vec<String>,
    environ: Vec<(String, String)>,
}

impl Node {
    /// Create the node directory, provision its account, and fix its
    /// role-specific argument and environment vectors.
    pub fn new(opts: &NodeOptions, conf: &NodeRuntimeConfig) -> Result<Node> {
        let dirpath = opts
            .chain_dirpath
            .join(canonical_node_name(opts.role, opts.ordinal));
        fs::create_dir_all(&dirpath)?;

        let account = keystore::provision(&dirpath, &opts.password)?;

        let password_filepath = dirpath.join(&opts.password);
        let environ = vec![(
            PASSWORD_FILE_ENV_VAR.to_string(),
            password_filepath.display().to_string(),
        )];
        let args = role_args(opts, conf, &dirpath, &account, &password_filepath);

        info!(
            node = %canonical_node_name(opts.role, opts.ordinal),
            address = %address_to_hex(&account.address),
            "created node"
        );

        Ok(Node {
            role: opts.role,
            ordinal: opts.ordinal,
            account,
            dirpath,
            password: opts.password.clone(),
            host: opts.host.clone(),
            port: opts.port,
            args,
            environ,
        })
    }

    pub fn name(&self) -> String {
        canonical_node_name(self.role, self.ordinal)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn dirpath(&self) -> &Path {
        &self.dirpath
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn password_filepath(&self) -> PathBuf {
        self.dirpath.join(&self.password)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn environ(&self) -> &[(String, String)] {
        &self.environ
    }

    /// Run the node as a subprocess, blocking until it exits. A non-zero
    /// exit status is an error. If the shutdown token fires first the child
    /// is killed and the run returns cleanly; the failure that triggered the
    /// shutdown is reported by its own task.
    pub async fn run(&self, extra_args: &[String], shutdown: CancellationToken) -> Result<()> {
        let mut cmd = Command::new(&self.args[0]);
        cmd.args(&self.args[1..]).args(extra_args);
        for (key, value) in &self.environ {
            cmd.env(key, value);
        }
        cmd.kill_on_drop(true);

        info!(node = %self.name(), binary = %self.args[0], "launching node process");
        let mut child = cmd.spawn().map_err(|e| {
            BootstrapError::Process(format!("failed to spawn {}: {}", self.name(), e))
        })?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| {
                    BootstrapError::Process(format!("failed to wait on {}: {}", self.name(), e))
                })?;
                if status.success() {
                    info!(node = %self.name(), "node process exited");
                    Ok(())
                } else {
                    Err(BootstrapError::Process(format!(
                        "node {} exited with {}",
                        self.name(),
                        status
                    )))
                }
            }
            _ = shutdown.cancelled() => {
                warn!(node = %self.name(), "shutdown requested, killing node process");
                let _ = child.kill().await;
                Ok(())
            }
        }
    }
}

/// Build the role-specific argument vector. Ports are offset by ordinal to
/// avoid collisions on a shared host; RPC-style roles offset by ordinal + 1
/// to clear the validator slot.
fn role_args(
    opts: &NodeOptions,
    conf: &NodeRuntimeConfig,
    dirpath: &Path,
    account: &Account,
    password_filepath: &Path,
) -> Vec<String> {
    let binary = conf.node_binary.display().to_string();
    let ordinal = opts.ordinal as u16;
    match opts.role {
        Role::Boot => vec![
            binary,
            "discovery".to_string(),
            "run".to_string(),
            "--keystore".to_string(),
            keystore::keystore_dirpath(dirpath).display().to_string(),
            "--port".to_string(),
            opts.port.to_string(),
        ],
        Role::Validator => vec![
            binary,
            "--datadir".to_string(),
            dirpath.display().to_string(),
            "--networkid".to_string(),
            conf.network.id().to_string(),
            "--metrics".to_string(),
            "--metrics.addr".to_string(),
            "127.0.0.1".to_string(),
            "--metrics.port".to_string(),
            (PORT_METRICS + ordinal).to_string(),
            "--authrpc.port".to_string(),
            (PORT_AUTH_RPC + ordinal).to_string(),
            "--verbosity".to_string(),
            "4".to_string(),
            "--port".to_string(),
            opts.port.to_string(),
            "--password".to_string(),
            password_filepath.display().to_string(),
            "--rpc.debugdisable".to_string(),
            "--rpc.txpooldisable".to_string(),
            "--config".to_string(),
            conf.config_filepath.display().to_string(),
            "--pprof".to_string(),
            "--pprof.port".to_string(),
            (PORT_PPROF + ordinal).to_string(),
            "--miner.etherbase".to_string(),
            address_to_hex(&account.address),
            "--mine".to_string(),
            // RPC is exposed on validators for local testing
            "--http".to_string(),
            "--http.port".to_string(),
            (PORT_RPC + ordinal).to_string(),
            "--cache".to_string(),
            "128".to_string(),
        ],
        // Partner roles bootstrap the same way RPC nodes do
        Role::Rpc | Role::Partner | Role::PartnerPublic => {
            let offset = ordinal + 1;
            vec![
                binary,
                "--datadir".to_string(),
                dirpath.display().to_string(),
                "--networkid".to_string(),
                conf.network.id().to_string(),
                "--metrics".to_string(),
                "--metrics.addr".to_string(),
                "127.0.0.1".to_string(),
                "--metrics.port".to_string(),
                (PORT_METRICS + offset).to_string(),
                "--authrpc.port".to_string(),
                (PORT_AUTH_RPC + offset).to_string(),
                "--http".to_string(),
                "--http.port".to_string(),
                (PORT_RPC + offset).to_string(),
                "--ws.port".to_string(),
                (PORT_WS + offset).to_string(),
                "--txpool.blocklist".to_string(),
                conf.block_list_filepath.display().to_string(),
                "--rpc.debugdisable".to_string(),
                "--rpc.txpooldisable".to_string(),
                "--rpc.cliquedisable".to_string(),
                "--rpc.minerdisable".to_string(),
                "--rpc.personaldisable".to_string(),
                "--verbosity".to_string(),
                "4".to_string(),
                "--port".to_string(),
                opts.port.to_string(),
                "--config".to_string(),
                conf.config_filepath.display().to_string(),
                "--pprof".to_string(),
                "--pprof.port".to_string(),
                (PORT_PPROF + offset).to_string(),
                "--cache".to_string(),
                "128".to_string(),
            ]
        }
    }
}
