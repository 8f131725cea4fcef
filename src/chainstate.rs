//! Per-node ledger database initialization
//!
//! Commits the genesis block into each node's two logical chain databases.
//! Rendering also mints the node's network identity key and returns it, so
//! discovery configuration can be derived without reading files back.
//!
//! Re-invocation against a node that already has ledger data is a no-op;
//! existing chain history is never overwritten.

use crate::crypto::KeyPair;
use crate::error::{BootstrapError, Result};
use crate::genesis::Genesis;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The two logical chain databases kept per node.
const CHAIN_DB_NAMES: [&str; 2] = ["chaindata", "lightchaindata"];
const NODE_KEY_FILENAME: &str = "nodekey";

/// Initialize the node's ledger databases with the genesis block and persist
/// a fresh network identity key, returning that key.
///
/// If the ledger directory already contains data the render is skipped and
/// the previously persisted node key is returned instead.
pub fn render(node_dir: &Path, genesis: &Genesis) -> Result<KeyPair> {
    let ledger_dir = ledger_dirpath(node_dir);
    if !is_empty_or_missing(&ledger_dir)? {
        info!(ledger_dir = %ledger_dir.display(), "ledger dir is not empty, skipping render");
        return load_node_key(node_dir);
    }

    fs::create_dir_all(&ledger_dir)?;
    let state_root = genesis_state_root(genesis);
    for name in CHAIN_DB_NAMES {
        let db_path = ledger_dir.join(format!("{}.db", name));
        commit_genesis(&db_path, genesis, &state_root)?;
    }

    // The node's network identity key materializes alongside its ledger.
    let node_key = KeyPair::generate()?;
    fs::write(ledger_dir.join(NODE_KEY_FILENAME), node_key.secret_hex())?;

    info!(node_dir = %node_dir.display(), "rendered chain state");
    Ok(node_key)
}

/// Read the persisted network identity key of an already-rendered node.
pub fn load_node_key(node_dir: &Path) -> Result<KeyPair> {
    let path = ledger_dirpath(node_dir).join(NODE_KEY_FILENAME);
    let hex_str = fs::read_to_string(&path).map_err(|e| {
        BootstrapError::ChainState(format!(
            "failed to read nodekey at {}: {}",
            path.display(),
            e
        ))
    })?;
    KeyPair::from_secret_hex(&hex_str)
}

/// Path of the ledger subdirectory for a node directory.
pub fn ledger_dirpath(node_dir: &Path) -> PathBuf {
    node_dir.join("ledger")
}

/// Returns true if the directory is empty or does not exist.
pub fn is_empty_or_missing(dirpath: &Path) -> Result<bool> {
    match fs::read_dir(dirpath) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

fn commit_genesis(db_path: &Path, genesis: &Genesis, state_root: &str) -> Result<()> {
    let conn = Connection::open(db_path)
        .map_err(|e| BootstrapError::ChainState(format!("failed to open database: {}", e)))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS header (
            field TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| BootstrapError::ChainState(format!("failed to create header table: {}", e)))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS alloc (
            address TEXT PRIMARY KEY,
            balance TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| BootstrapError::ChainState(format!("failed to create alloc table: {}", e)))?;

    // One transaction so a half-written genesis never survives a crash
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| BootstrapError::ChainState(format!("failed to start transaction: {}", e)))?;

    let spec = &genesis.spec;
    let header_fields: [(&str, String); 6] = [
        ("number", "0".to_string()),
        ("chain_id", spec.config.chain_id.to_string()),
        ("difficulty", spec.difficulty.to_string()),
        ("gas_limit", spec.gas_limit.to_string()),
        ("extra_data", hex::encode(&spec.extra_data)),
        ("state_root", state_root.to_string()),
    ];
    for (field, value) in header_fields {
        tx.execute(
            "INSERT OR REPLACE INTO header (field, value) VALUES (?1, ?2)",
            params![field, value],
        )
        .map_err(|e| BootstrapError::ChainState(format!("failed to write header: {}", e)))?;
    }

    for (address, account) in &spec.alloc {
        tx.execute(
            "INSERT OR REPLACE INTO alloc (address, balance) VALUES (?1, ?2)",
            params![address, account.balance.to_string()],
        )
        .map_err(|e| BootstrapError::ChainState(format!("failed to write allocation: {}", e)))?;
    }

    tx.commit()
        .map_err(|e| BootstrapError::ChainState(format!("failed to commit genesis: {}", e)))?;
    Ok(())
}

/// Deterministic digest over the genesis allocation and extra-data, recorded
/// as the genesis state root.
fn genesis_state_root(genesis: &Genesis) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&genesis.spec.extra_data);
    for (address, account) in &genesis.spec.alloc {
        hasher.update(address.as_bytes());
        hasher.update(account.balance.to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::{ChainOptions, Premine};
    use crate::settings::{DEVNET_NETWORK_ID, SECONDS_PER_BLOCK};
    use tempfile::TempDir;

    fn test_genesis(dirpath: &Path) -> Genesis {
        Genesis::build(&ChainOptions {
            gas_limit: 30_000_000,
            seconds_per_block: SECONDS_PER_BLOCK,
            validators: vec![[0x11; 20]],
            premines: vec![
                Premine {
                    address: [0xaa; 20],
                    wei: 1_000,
                },
                Premine {
                    address: [0xbb; 20],
                    wei: 2_000,
                },
            ],
            chain_id: DEVNET_NETWORK_ID,
            dirpath: dirpath.to_path_buf(),
        })
        .unwrap()
    }

    #[test]
    fn test_render_creates_databases_and_nodekey() {
        let dir = TempDir::new().unwrap();
        let genesis = test_genesis(dir.path());

        let node_key = render(dir.path(), &genesis).unwrap();

        let ledger_dir = ledger_dirpath(dir.path());
        for name in CHAIN_DB_NAMES {
            let db_path = ledger_dir.join(format!("{}.db", name));
            assert!(db_path.exists());

            let conn = Connection::open(&db_path).unwrap();
            let alloc_rows: i64 = conn
                .query_row("SELECT COUNT(*) FROM alloc", [], |row| row.get(0))
                .unwrap();
            assert_eq!(alloc_rows, 2);

            let number: String = conn
                .query_row(
                    "SELECT value FROM header WHERE field = 'number'",
                    [],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(number, "0");
        }

        assert_eq!(load_node_key(dir.path()).unwrap().address(), node_key.address());
    }

    #[test]
    fn test_render_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let genesis = test_genesis(dir.path());

        let first = render(dir.path(), &genesis).unwrap();
        let before: Vec<_> = fs::read_dir(ledger_dirpath(dir.path()))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();

        // Second render must be a no-op returning the same identity key.
        let second = render(dir.path(), &genesis).unwrap();
        assert_eq!(first.address(), second.address());

        let after: Vec<_> = fs::read_dir(ledger_dirpath(dir.path()))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(before.len(), after.len());
    }

    #[test]
    fn test_is_empty_or_missing() {
        let dir = TempDir::new().unwrap();
        assert!(is_empty_or_missing(&dir.path().join("absent")).unwrap());
        assert!(is_empty_or_missing(dir.path()).unwrap());

        fs::write(dir.path().join("f"), b"x").unwrap();
        assert!(!is_empty_or_missing(dir.path()).unwrap());
    }

    #[test]
    fn test_load_node_key_requires_rendered_state() {
        let dir = TempDir::new().unwrap();
        assert!(load_node_key(dir.path()).is_err());
    }
}
