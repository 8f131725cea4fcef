//! Deployment premine tables

use crate::crypto::{address_from_hex, Address};
use crate::error::Result;
use crate::genesis::Premine;
use crate::settings::Network;

/// Amount of the native token pre-funded to the bridge EOA: 2e9 tokens at
/// 1e18 wei each.
pub const TOTAL_SUPPLY_WEI: u128 = 2_000_000_000_000_000_000_000_000_000;

/// The bridge EOA credited with the total supply on every network.
pub const BRIDGE_EOA_ADDRESS: &str = "0x02F0d131F1f97aef08aEc6E3291B957d9Efe7105";

/// EOAs pre-funded on dev networks so developers can deploy contracts
/// without requesting funds from a faucet.
pub const DEV_PREMINE_ADDRESSES: &[&str] = &[
    "0x340bC2c77514ede2a23Fd4F42F411A8e351d8eE6",
    "0xebbf4C07a63986204C37cc5A188AaBF53564C583",
    "0xdEAdC0de8a3B037925a895843f96b0c525FBC31f",
    "0xeFE12952541356Ffc969A343A81D1cE7D2806179",
    "0x4AEdf28A437b94749037cC39f83F4422469CF2F7",
    "0x8318a871CC140d9f77a1999f84875AC36EeCC04E",
    "0xCc5C8CEa877f2F351F38c190867BbD31FaFadD22",
    "0x000000000013B7b1B08B3c8EFE02E866F746bD38",
    "0xa6C368164Eb270C31592c1830Ed25c2bf5D34BAE",
    "0xC606830D8341bc9F5F5Dd7615E9313d2655B505D",
    "0x784578949A4A50DeA641Fb15dd2B11C72E76919a",
    "0xEac347177DbA4a190B632C7d9b8da2AbfF57c772",
    "0xD509997AB62fDA51c32E64E69Fb090DF8894105e",
    "0xF6372939CE2d14A68A629B8E4785E9dCB4EdA0cf",
    "0x9C1634bebC88653D2Aebf4c14a3031f62092b1D9",
    "0xb3343666188A694120C18c4985C57e4C0913A6F0",
    "0x2E969d22e6654e064F461cf8B1314Cc0864a4914",
    "0xd9275Eb8276E14b9e28d5f9B12e90dDAAF3586Ef",
    "0x3e290FE8F2A5dB60A81cb47EA296e0299048Dd71",
    "0x4A73506a31DB769AC442b17ca9A1679f44757Bbf",
    "0x7C3E6CE6fd293Fc66d9d73d49fd546CCE1e19F0e",
    "0xEB7FFb9fb0c80437120f6F97EdE60aB59055EAE0",
    "0xe567Ea84e1eB3fFdc8F5aA420BF14A16eeE6A809",
    "0xC8714F989cE817e5d21349888077Aa5Db4A9BCf6",
    "0x0CCB0a3fc5Ca38fcd9FfD8a667Cb83e3194250d7",
    "0x5ABFc3E307b037325BFC6988Ae265dcB211Ec533",
    "0x7442eD1e3c9FD421F47d12A2742AfF5DaFBf43f8",
    "0xed557863FFD4C87537BA8264098B22483c6145f2",
    "0x7924BF4cBb25f7bA2aB1335e293afe6a7E78235a",
];

/// Builds the premine list for a network. The bridge EOA is always premined;
/// the developer premine list is added on devnet only.
pub fn premines(network: &Network, bridge_eoa: Address) -> Result<Vec<Premine>> {
    let mut premines = vec![Premine {
        address: bridge_eoa,
        wei: TOTAL_SUPPLY_WEI,
    }];
    if !network.is_devnet() {
        return Ok(premines);
    }
    for address in DEV_PREMINE_ADDRESSES {
        premines.push(Premine {
            address: address_from_hex(address)?,
            wei: TOTAL_SUPPLY_WEI,
        });
    }
    Ok(premines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> Address {
        address_from_hex(BRIDGE_EOA_ADDRESS).unwrap()
    }

    #[test]
    fn test_devnet_premines_include_dev_addresses() {
        let network = Network::new("devnet").unwrap();
        let premines = premines(&network, bridge()).unwrap();

        assert_eq!(premines.len(), 1 + DEV_PREMINE_ADDRESSES.len());
        assert_eq!(premines[0].address, bridge());
        assert!(premines.iter().all(|p| p.wei == TOTAL_SUPPLY_WEI));
    }

    #[test]
    fn test_non_dev_networks_premine_bridge_only() {
        for name in ["testnet", "mainnet"] {
            let network = Network::new(name).unwrap();
            let premines = premines(&network, bridge()).unwrap();
            assert_eq!(premines.len(), 1);
            assert_eq!(premines[0].address, bridge());
        }
    }

    #[test]
    fn test_total_supply_is_two_billion_tokens() {
        assert_eq!(TOTAL_SUPPLY_WEI, 2_000_000_000u128 * 1_000_000_000_000_000_000u128);
    }

    #[test]
    fn test_dev_addresses_all_parse() {
        for address in DEV_PREMINE_ADDRESSES {
            address_from_hex(address).unwrap();
        }
    }
}
