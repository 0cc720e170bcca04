use {
    alloy::primitives::{Address, Bytes},
    serde::{Deserialize, Serialize},
    serde_with::{DisplayFromStr, PickFirst, serde_as},
    std::fmt::{self, Debug, Formatter},
};

/// Order hooks are user-specified Ethereum calls that get executed as part of
/// a pre- or post- interaction.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Hooks {
    #[serde(default)]
    pub pre: Vec<Hook>,
    #[serde(default)]
    pub post: Vec<Hook>,
}

impl Hooks {
    pub fn gas_limit(&self) -> u64 {
        std::iter::empty()
            .chain(&self.pre)
            .chain(&self.post)
            .fold(0_u64, |total, hook| total.saturating_add(hook.gas_limit))
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }
}

/// A user-specified hook.
#[serde_as]
#[derive(Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub target: Address,
    pub call_data: Bytes,
    /// Travels as a decimal string; plain numbers are accepted when reading.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub gas_limit: u64,
    /// Identifies the integration that injected the hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dapp_id: Option<String>,
}

impl Debug for Hook {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Hook")
            .field("target", &self.target)
            .field("call_data", &const_hex::encode_prefixed(&self.call_data))
            .field("gas_limit", &self.gas_limit)
            .field("dapp_id", &self.dapp_id)
            .finish()
    }
}
