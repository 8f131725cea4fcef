//! Secret store capability and secret ID templating
//!
//! Node private keys can live in a secure store keyed by a deployment-scoped
//! secret ID. The ID is built from a template containing a `{ROLE}`
//! placeholder, substituted with the canonical `<role>-<ordinal>` node name.

use crate::crypto::{address_to_hex, KeyPair};
use crate::error::{BootstrapError, Result};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Value of a private key secret before it is set by a bootstrap operation.
pub const EMPTY_SECRET_VALUE: &str = "EMPTY";
/// Placeholder for the node name in the secret ID template.
pub const ROLE_PLACEHOLDER: &str = "{ROLE}";

/// Capability to retrieve and store private keys.
pub trait SecretStore {
    /// Returns the secret value, or `BootstrapError::SecretNotFound`.
    fn get_secret(&self, id: &str) -> Result<String>;
    fn put_secret_string(&self, id: &str, value: &str) -> Result<()>;
}

/// Build the secret ID for a node by substituting the canonical node name
/// into the template. The template must contain the `{ROLE}` placeholder.
pub fn secret_id(template: &str, owner: &str) -> Result<String> {
    if !template.contains(ROLE_PLACEHOLDER) {
        return Err(BootstrapError::Config(format!(
            "secret ID template must contain the placeholder {}",
            ROLE_PLACEHOLDER
        )));
    }
    Ok(template.replacen(ROLE_PLACEHOLDER, owner, 1))
}

/// Retrieve or create the private key stored under `id`.
///
/// A stored value equal to [`EMPTY_SECRET_VALUE`] means the secret slot has
/// been allocated but never initialized; a fresh key is generated and pushed
/// back. A missing secret is an error so that misconfigured deployments fail
/// loudly instead of minting untracked keys.
pub fn render(store: &dyn SecretStore, id: &str) -> Result<KeyPair> {
    let existing = store.get_secret(id)?;
    if existing == EMPTY_SECRET_VALUE {
        info!(secret_id = id, "private key secret is empty, creating new key");
        let keypair = KeyPair::generate()?;
        store.put_secret_string(id, &keypair.secret_hex())?;
        info!(
            address = %address_to_hex(&keypair.address()),
            "generated node key"
        );
        return Ok(keypair);
    }
    let keypair = KeyPair::from_secret_hex(&existing)?;
    info!(
        address = %address_to_hex(&keypair.address()),
        "decoded existing node key"
    );
    Ok(keypair)
}

/// Retrieve an existing private key from the store; never creates one.
pub fn retrieve(store: &dyn SecretStore, id: &str) -> Result<KeyPair> {
    KeyPair::from_secret_hex(&store.get_secret(id)?)
}

/// A local file-backed secret store. Each secret is one file under the root
/// directory; path separators in IDs are flattened. Useful for local runs
/// that want the same export flow as a deployed secret backend.
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    pub fn new(root: PathBuf) -> Self {
        FileSecretStore { root }
    }

    fn secret_path(&self, id: &str) -> PathBuf {
        self.root.join(id.replace('/', "_"))
    }
}

impl SecretStore for FileSecretStore {
    fn get_secret(&self, id: &str) -> Result<String> {
        let path = self.secret_path(id);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(value),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BootstrapError::SecretNotFound(id.to_string()))
            }
            Err(e) => Err(BootstrapError::SecretStore(format!(
                "failed to read secret {}: {}",
                id, e
            ))),
        }
    }

    fn put_secret_string(&self, id: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.secret_path(id), value)?;
        Ok(())
    }
}
