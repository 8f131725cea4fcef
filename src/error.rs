//! Error types for ChainForge

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("Cryptographic error: {0}")]
    Crypto(String),
    #[error("Keystore error: {0}")]
    Keystore(String),
    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),
    #[error("Chain state error: {0}")]
    ChainState(String),
    #[error("Secret not found: {0}")]
    SecretNotFound(String),
    #[error("Secret store error: {0}")]
    SecretStore(String),
    #[error("Process error: {0}")]
    Process(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, BootstrapError>;
