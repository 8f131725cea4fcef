//! Cryptographic identity primitives for ChainForge

use crate::error::BootstrapError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{SECRET_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE},
    All, PublicKey, Secp256k1, SecretKey,
};
use sha3::{Digest, Keccak256};

/// A thread-safe, lazily initialized Secp256k1 context.
/// This prevents repeated, unnecessary context creation.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Length of an account address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// An account address: the last 20 bytes of the Keccak-256 hash of the
/// uncompressed public key.
pub type Address = [u8; ADDRESS_SIZE];

/// Convert an address to its 0x-prefixed hex representation.
pub fn address_to_hex(addr: &Address) -> String {
    format!("0x{}", hex::encode(addr))
}

/// Parse an address from a hex string, with or without the 0x prefix.
pub fn address_from_hex(hex_str: &str) -> Result<Address, BootstrapError> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(stripped)
        .map_err(|e| BootstrapError::Crypto(format!("Invalid hex address: {}", e)))?;
    if bytes.len() != ADDRESS_SIZE {
        return Err(BootstrapError::Crypto(format!(
            "Address must be {} bytes, got {}",
            ADDRESS_SIZE,
            bytes.len()
        )));
    }
    bytes
        .try_into()
        .map_err(|_| BootstrapError::Crypto("Failed to convert bytes into address".to_string()))
}

#[derive(Debug, Clone, Copy)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self, BootstrapError> {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, BootstrapError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                BootstrapError::Crypto(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                BootstrapError::Crypto(format!("Invalid secret key bytes: {}", e))
            }
        })?;
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Creates a KeyPair from a hex-encoded secret key.
    pub fn from_secret_hex(hex_str: &str) -> Result<Self, BootstrapError> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| BootstrapError::Crypto(format!("Invalid secret key hex: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Returns the secret key as lowercase hex.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Computes the account address: last 20 bytes of Keccak-256 over the
    /// uncompressed public key (without the 0x04 format prefix).
    pub fn address(&self) -> Address {
        let pubkey_bytes = self.public_key.serialize_uncompressed();
        let digest = Keccak256::digest(&pubkey_bytes[1..]);
        let mut addr = [0u8; ADDRESS_SIZE];
        addr.copy_from_slice(&digest[digest.len() - ADDRESS_SIZE..]);
        addr
    }

    /// Returns the uncompressed public key bytes including the 0x04 prefix.
    pub fn public_key_bytes(&self) -> [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE] {
        self.public_key.serialize_uncompressed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let keypair = KeyPair::generate().unwrap();
        assert_eq!(keypair.public_key_bytes().len(), UNCOMPRESSED_PUBLIC_KEY_SIZE);
        assert_eq!(keypair.public_key_bytes()[0], 0x04);
        assert_eq!(keypair.secret_key.secret_bytes().len(), SECRET_KEY_SIZE);
    }

    #[test]
    fn test_address_derivation_is_deterministic() {
        // Known key from go-ethereum test fixtures.
        let keypair = KeyPair::from_secret_hex(
            "48aa455c373ec5ce7fefb0e54f44a215decdc85b9047bc4d09801e038909bdbe",
        )
        .unwrap();
        assert_eq!(
            address_to_hex(&keypair.address()),
            "0x02f0d131f1f97aef08aec6e3291b957d9efe7105"
        );
    }

    #[test]
    fn test_secret_hex_round_trip() {
        let keypair = KeyPair::generate().unwrap();
        let restored = KeyPair::from_secret_hex(&keypair.secret_hex()).unwrap();
        assert_eq!(restored.address(), keypair.address());
    }

    #[test]
    fn test_address_hex_round_trip() {
        let keypair = KeyPair::generate().unwrap();
        let addr = keypair.address();
        assert_eq!(address_from_hex(&address_to_hex(&addr)).unwrap(), addr);
        // Prefix is optional on parse
        assert_eq!(address_from_hex(&hex::encode(addr)).unwrap(), addr);
    }

    #[test]
    fn test_address_from_hex_rejects_bad_input() {
        assert!(address_from_hex("0x1234").is_err());
        assert!(address_from_hex("zz").is_err());
    }

    #[test]
    fn test_from_secret_bytes_invalid_length() {
        let short_bytes = [0u8; SECRET_KEY_SIZE - 1];
        let result = KeyPair::from_secret_bytes(&short_bytes);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Secret key must be"));
    }
}
