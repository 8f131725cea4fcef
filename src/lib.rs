//! ChainForge - local multi-role bootstrapper for Clique proof-of-authority networks
//!
//! Given counts of nodes by role (boot, validator, RPC), ChainForge provisions
//! cryptographic identities, builds a genesis block with deployment-specific
//! validator and premine configuration, initializes each node's on-disk ledger,
//! renders a shared runtime configuration, and launches the nodes as supervised
//! subprocesses in dependency order.
//!
//! # Architecture
//!
//! ## Chain Artifacts
//! - [`genesis`] - Genesis construction and validation (Clique extra-data)
//! - [`premine`] - Deployment premine tables
//! - [`chainstate`] - Per-node ledger database initialization
//!
//! ## Identity & Secrets
//! - [`crypto`] - Keys and addresses (secp256k1 + Keccak-256)
//! - [`keystore`] - Encrypted on-disk keystores
//! - [`keys`] - Secret store capability and ID templating
//!
//! ## Topology & Orchestration
//! - [`role`] - Node role catalog and canonical naming
//! - [`node`] - Per-node argv/env construction and subprocess supervision
//! - [`discovery`] - Enode derivation and shared runtime config rendering
//! - [`bootstrap`] - Top-level bootstrap coordinator
//!
//! ## Configuration & Utilities
//! - [`settings`] - Network and chain parameter tables
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Chain Artifacts
// ============================================================================
pub mod chainstate;
pub mod genesis;
pub mod premine;

// ============================================================================
// Identity & Secrets
// ============================================================================
pub mod crypto;
pub mod keys;
pub mod keystore;

// ============================================================================
// Topology & Orchestration
// ============================================================================
pub mod bootstrap;
pub mod discovery;
pub mod node;
pub mod role;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod error;
pub mod settings;
