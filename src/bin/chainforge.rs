#![forbid(unsafe_code)]
//! ChainForge CLI: bootstrap and run a local multi-role chain network

use chainforge::bootstrap::{BootstrapOptions, CleanMode, LocalBootstrapper};
use chainforge::keys::{FileSecretStore, SecretStore};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "chainforge",
    about = "Bootstrap a local Clique proof-of-authority network and run its nodes",
    version
)]
struct Cli {
    /// Number of boot (discovery) nodes
    #[arg(long, default_value_t = 1)]
    boots: usize,

    /// Number of validator nodes
    #[arg(long, default_value_t = 1)]
    validators: usize,

    /// Number of RPC nodes
    #[arg(long, default_value_t = 0)]
    rpcs: usize,

    /// Genesis block gas limit
    #[arg(long, default_value_t = 30_000_000)]
    gas_limit: u64,

    /// Attach to a known remote network (testnet, mainnet) with its canned
    /// genesis instead of generating a local devnet
    #[arg(long)]
    network: Option<String>,

    /// Root directory for the environment
    #[arg(long, default_value_os_t = std::env::temp_dir())]
    root_dir: PathBuf,

    /// Runtime config file for remote attaches; local runs render their own
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transaction pool block list passed to RPC nodes
    #[arg(long, default_value = "blocklist.json")]
    block_list: PathBuf,

    /// Chain-node executable launched for every node
    #[arg(long, default_value = "forged")]
    node_binary: PathBuf,

    /// Keep an existing chain directory instead of wiping it; fails if the
    /// directory is non-empty
    #[arg(long)]
    reuse: bool,

    /// Secret ID template containing the {ROLE} placeholder; enables node
    /// key export
    #[arg(long)]
    secret_id_template: Option<String>,

    /// Directory backing the local secret store
    #[arg(long, default_value = "secrets")]
    secrets_dir: PathBuf,

    /// Extra arguments appended to every validator and RPC node
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, default_values_t = [
        "--gcmode".to_string(),
        "archive".to_string(),
        "--syncmode".to_string(),
        "full".to_string(),
    ])]
    node_args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let opts = BootstrapOptions {
        root_dirpath: cli.root_dir,
        boot_count: cli.boots,
        validator_count: cli.validators,
        rpc_count: cli.rpcs,
        gas_limit: cli.gas_limit,
        block_list_filepath: cli.block_list,
        remote_network: cli.network,
        remote_config_filepath: cli.config,
        node_binary: cli.node_binary,
        clean_mode: if cli.reuse {
            CleanMode::Reuse
        } else {
            CleanMode::Clean
        },
        secret_id_template: cli.secret_id_template,
    };

    let store = opts
        .secret_id_template
        .as_ref()
        .map(|_| FileSecretStore::new(cli.secrets_dir));
    let bootstrapper =
        LocalBootstrapper::new(&opts, store.as_ref().map(|s| s as &dyn SecretStore))?;
    info!(
        network = bootstrapper.network().name(),
        dir = %bootstrapper.chain_dirpath().display(),
        "environment provisioned"
    );

    let result = bootstrapper.launch(&cli.node_args).await;
    bootstrapper.clean();
    result?;
    Ok(())
}
