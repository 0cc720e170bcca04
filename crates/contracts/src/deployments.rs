//! Static per-chain deployment tables of the protocol contracts.

use {
    crate::alloy::networks::*,
    alloy::primitives::{Address, address},
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, sync::LazyLock},
};

/// The protocol runs two deployments of its off-chain infrastructure: the
/// production one and a staging one (called "barn") that is used to roll out
/// new versions.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    #[default]
    #[strum(serialize = "prod")]
    Prod,
    #[serde(alias = "barn")]
    #[strum(to_string = "staging", serialize = "barn")]
    Staging,
}

/// The settlement contract shares its address on every supported chain.
pub const SETTLEMENT: Address = address!("9008D19f58AAbD9eD0D60971565AA8510560ab41");
pub const VAULT_RELAYER: Address = address!("C92E8bdf79f0507f65a392b0ab4667716BFE0110");

const ETH_FLOW: Address = address!("ba3cb449bd2b4adddbc894d8697f5170800eadec");
const BARN_ETH_FLOW: Address = address!("04501b9b1d52e67f6862d157e00d13419d2d6e95");
// Lens does not share the deterministic eth-flow address of the other chains.
const ETH_FLOW_LENS: Address = address!("5A5b8aE7a0b4C0EAf453d10DCcfbA413f07ebdC2");
const BARN_ETH_FLOW_LENS: Address = address!("Fb337f8a725A142f65fb9ff4902d41cc901de222");

struct Chain {
    /// Path segment of the order book API for this chain.
    network: &'static str,
    wrapped_native: Address,
    eth_flow: Address,
    barn_eth_flow: Address,
}

impl Chain {
    fn new(network: &'static str, wrapped_native: Address) -> Self {
        Self {
            network,
            wrapped_native,
            eth_flow: ETH_FLOW,
            barn_eth_flow: BARN_ETH_FLOW,
        }
    }
}

static CHAINS: LazyLock<HashMap<u64, Chain>> = LazyLock::new(|| {
    maplit::hashmap! {
        MAINNET => Chain::new("mainnet", address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")),
        BNB => Chain::new("bnb", address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c")),
        GNOSIS => Chain::new("xdai", address!("e91D153E0b41518A2Ce8Dd3D7944Fa863463a97d")),
        POLYGON => Chain::new("polygon", address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270")),
        LENS => Chain {
            eth_flow: ETH_FLOW_LENS,
            barn_eth_flow: BARN_ETH_FLOW_LENS,
            ..Chain::new("lens", address!("6bDc36E20D267Ff0dd6097799f82e78907105e2F"))
        },
        BASE => Chain::new("base", address!("4200000000000000000000000000000000000006")),
        PLASMA => Chain::new("plasma", address!("6100E367285b01F48D07953803A2d8dCA5D19873")),
        ARBITRUM_ONE => Chain::new("arbitrum_one", address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1")),
        AVALANCHE => Chain::new("avalanche", address!("B31f66AA3C1e785363F0875A1B74E27b85FD66c7")),
        LINEA => Chain::new("linea", address!("e5D7C2a44FfDDf6b295A15c148167daaAf5Cf34f")),
        SEPOLIA => Chain::new("sepolia", address!("fFf9976782d46CC05630D1f6eBAb18b2324d6B14")),
    }
});

pub fn is_supported(chain_id: u64) -> bool {
    CHAINS.contains_key(&chain_id)
}

/// All chains the protocol is deployed on, in ascending order.
pub fn supported_chains() -> Vec<u64> {
    let mut chains: Vec<_> = CHAINS.keys().copied().collect();
    chains.sort_unstable();
    chains
}

pub fn network_name(chain_id: u64) -> Option<&'static str> {
    CHAINS.get(&chain_id).map(|chain| chain.network)
}

/// The verifying contract of orders signed for `chain_id`.
pub fn settlement(chain_id: u64) -> Option<Address> {
    is_supported(chain_id).then_some(SETTLEMENT)
}

/// The contract traders approve to spend their sell tokens.
pub fn vault_relayer(chain_id: u64) -> Option<Address> {
    is_supported(chain_id).then_some(VAULT_RELAYER)
}

pub fn wrapped_native_token(chain_id: u64) -> Option<Address> {
    CHAINS.get(&chain_id).map(|chain| chain.wrapped_native)
}

/// The contract that places orders selling the native token on behalf of
/// users.
pub fn eth_flow(chain_id: u64, env: Env) -> Option<Address> {
    CHAINS.get(&chain_id).map(|chain| match env {
        Env::Prod => chain.eth_flow,
        Env::Staging => chain.barn_eth_flow,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_is_shared_across_chains() {
        for chain_id in supported_chains() {
            assert_eq!(settlement(chain_id), Some(SETTLEMENT));
            assert!(wrapped_native_token(chain_id).is_some());
            assert!(network_name(chain_id).is_some());
        }
        assert_eq!(settlement(5), None);
        assert_eq!(vault_relayer(5), None);
    }

    #[test]
    fn eth_flow_depends_on_env() {
        assert_eq!(eth_flow(MAINNET, Env::Prod), Some(ETH_FLOW));
        assert_eq!(eth_flow(GNOSIS, Env::Staging), Some(BARN_ETH_FLOW));
        assert_eq!(eth_flow(LENS, Env::Prod), Some(ETH_FLOW_LENS));
        assert_eq!(eth_flow(LENS, Env::Staging), Some(BARN_ETH_FLOW_LENS));
        assert_eq!(eth_flow(10, Env::Prod), None);
    }

    #[test]
    fn network_names() {
        assert_eq!(network_name(MAINNET), Some("mainnet"));
        assert_eq!(network_name(GNOSIS), Some("xdai"));
        assert_eq!(network_name(ARBITRUM_ONE), Some("arbitrum_one"));
        assert_eq!(network_name(SEPOLIA), Some("sepolia"));
    }

    #[test]
    fn wrapped_native_tokens() {
        assert_eq!(
            wrapped_native_token(MAINNET),
            Some(address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"))
        );
        assert_eq!(
            wrapped_native_token(BASE),
            Some(address!("4200000000000000000000000000000000000006"))
        );
        assert_eq!(wrapped_native_token(5), None);
    }

    #[test]
    fn env_labels() {
        assert_eq!(Env::Prod.to_string(), "prod");
        assert_eq!(Env::Staging.to_string(), "staging");
        assert_eq!("barn".parse::<Env>().unwrap(), Env::Staging);
        assert_eq!("prod".parse::<Env>().unwrap(), Env::Prod);
    }
}
