//! Encrypted on-disk keystores
//!
//! Each node owns exactly one keystore file under `<node-dir>/keystore/`,
//! encrypted with a password-derived key (argon2id + AES-256-GCM). The
//! account address is mirrored as plain text in an `address` file at the node
//! directory root so other tooling can read it without decrypting anything.
//!
//! Provisioning is intentionally not re-entrant: a directory that already
//! holds a key file is refused rather than silently overwritten. The caller's
//! top-level clean() removes the whole run directory on failure.

use crate::crypto::{address_to_hex, Address, KeyPair};
use crate::error::{BootstrapError, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const KEYSTORE_VERSION: u32 = 1;

/// A provisioned node account.
#[derive(Debug, Clone, Copy)]
pub struct Account {
    pub address: Address,
    pub public_key: PublicKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeystoreFile {
    address: String,
    crypto: CryptoSection,
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CryptoSection {
    cipher: String,
    ciphertext: String,
    nonce: String,
    kdf: String,
    salt: String,
}

/// Create an encrypted keystore file in the node's `keystore` subdirectory
/// and write the account's address to an `address` file at the node directory
/// root. Returns the provisioned account.
pub fn provision(node_dir: &Path, password: &str) -> Result<Account> {
    if password.is_empty() {
        return Err(BootstrapError::Config(
            "keystore password must not be empty".to_string(),
        ));
    }

    let keystore_dir = keystore_dirpath(node_dir);
    fs::create_dir_all(&keystore_dir)?;
    if fs::read_dir(&keystore_dir)?.next().is_some() {
        return Err(BootstrapError::Keystore(format!(
            "keystore dir {} already contains a key",
            keystore_dir.display()
        )));
    }

    let keypair = KeyPair::generate()?;
    let address = keypair.address();
    let file = encrypt(&keypair, password)?;

    let unix_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let filename = format!("{}--{}.json", unix_secs, hex::encode(address));
    let keystore_path = keystore_dir.join(filename);
    fs::write(&keystore_path, serde_json::to_vec_pretty(&file)?)?;

    fs::write(node_dir.join("address"), address_to_hex(&address))?;

    info!(
        address = %address_to_hex(&address),
        path = %keystore_path.display(),
        "provisioned node account"
    );

    Ok(Account {
        address,
        public_key: keypair.public_key,
    })
}

/// Decrypt a keystore file with the given password, recovering the keypair.
pub fn decrypt(keystore_path: &Path, password: &str) -> Result<KeyPair> {
    let file: KeystoreFile = serde_json::from_slice(&fs::read(keystore_path)?)?;
    if file.version != KEYSTORE_VERSION {
        return Err(BootstrapError::Keystore(format!(
            "unsupported keystore version {}",
            file.version
        )));
    }

    let salt = BASE64
        .decode(&file.crypto.salt)
        .map_err(|e| BootstrapError::Keystore(format!("invalid salt: {}", e)))?;
    let nonce = BASE64
        .decode(&file.crypto.nonce)
        .map_err(|e| BootstrapError::Keystore(format!("invalid nonce: {}", e)))?;
    let ciphertext = BASE64
        .decode(&file.crypto.ciphertext)
        .map_err(|e| BootstrapError::Keystore(format!("invalid ciphertext: {}", e)))?;

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
        .map_err(|_| BootstrapError::Keystore("decryption failed".to_string()))?;

    KeyPair::from_secret_bytes(&plaintext)
}

/// Path of the keystore subdirectory for a node directory.
pub fn keystore_dirpath(node_dir: &Path) -> PathBuf {
    node_dir.join("keystore")
}

fn encrypt(keypair: &KeyPair, password: &str) -> Result<KeystoreFile> {
    let mut salt = [0u8; SALT_SIZE];
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            keypair.secret_key.secret_bytes().as_ref(),
        )
        .map_err(|_| BootstrapError::Keystore("encryption failed".to_string()))?;

    Ok(KeystoreFile {
        address: address_to_hex(&keypair.address()),
        crypto: CryptoSection {
            cipher: "aes-256-gcm".to_string(),
            ciphertext: BASE64.encode(ciphertext),
            nonce: BASE64.encode(nonce),
            kdf: "argon2id".to_string(),
            salt: BASE64.encode(salt),
        },
        version: KEYSTORE_VERSION,
    })
}

fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; 32]> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| BootstrapError::Keystore(format!("key derivation failed: {}", e)))?;
    Ok(key)
}
