//! Node role catalog and canonical naming

use crate::error::BootstrapError;
use std::fmt;
use std::str::FromStr;

/// Role of a node in the network.
///
/// Boot and Validator are singleton roles in a deployed topology; the local
/// bootstrapper distinguishes same-role nodes by ordinal instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Boot,
    Validator,
    Rpc,
    Partner,
    PartnerPublic,
}

pub const ALL_ROLES: [Role; 5] = [
    Role::Boot,
    Role::Validator,
    Role::Rpc,
    Role::Partner,
    Role::PartnerPublic,
];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Boot => "boot",
            Role::Validator => "validator",
            Role::Rpc => "rpc",
            Role::Partner => "partner",
            Role::PartnerPublic => "partner-public",
        }
    }

    /// Key/value labels assigned to k8s resources for this role.
    pub fn labels(&self) -> Vec<(String, String)> {
        vec![
            ("app".to_string(), "forge-node".to_string()),
            ("forge".to_string(), format!("node-{}", self.as_str())),
        ]
    }

    /// Name of the k8s external secret used for the role.
    pub fn external_secret_name(&self) -> String {
        format!("forge-node-{}-chain", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = BootstrapError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ALL_ROLES
            .into_iter()
            .find(|r| r.as_str() == name)
            .ok_or_else(|| BootstrapError::Config(format!("no such role: {}", name)))
    }
}

/// Canonical name of a node based on role and ordinal, e.g. `validator-0`.
/// Used as directory name, secret ID suffix, and k8s resource qualifier.
pub fn canonical_node_name(role: Role, ordinal: usize) -> String {
    format!("{}-{}", role.as_str(), ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in ALL_ROLES {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("observer".parse::<Role>().is_err());
    }

    #[test]
    fn test_canonical_node_name() {
        assert_eq!(canonical_node_name(Role::Validator, 0), "validator-0");
        assert_eq!(canonical_node_name(Role::Boot, 3), "boot-3");
        assert_eq!(canonical_node_name(Role::PartnerPublic, 1), "partner-public-1");
    }

    #[test]
    fn test_canonical_node_names_are_unique() {
        let mut names = std::collections::HashSet::new();
        for role in ALL_ROLES {
            for ordinal in 0..4 {
                assert!(names.insert(canonical_node_name(role, ordinal)));
            }
        }
    }

    #[test]
    fn test_labels_and_secret_name() {
        let labels = Role::Rpc.labels();
        assert!(labels.contains(&("forge".to_string(), "node-rpc".to_string())));
        assert_eq!(Role::Boot.external_secret_name(), "forge-node-boot-chain");
    }
}
