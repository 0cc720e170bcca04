//! Typed shapes of the metadata categories an app data document can carry.

use {
    alloy::primitives::{Address, B256, Bytes, U256},
    number::serialization::HexOrDecimalU256,
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    serde_with::{DisplayFromStr, PickFirst, serde_as},
    std::{
        fmt::{self, Display},
        slice::Iter,
        str::FromStr,
    },
};

/// Slippage the user accepted when the order was created.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Older documents carry the value as a decimal string.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub slippage_bips: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smart_slippage: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderClassKind {
    #[default]
    Market,
    Limit,
    Liquidity,
    Twap,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderClass {
    pub order_class: OrderClassKind,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Referrer {
    pub address: Address,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Utm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
}

/// The widget an order was placed through, when embedded in a third party
/// application.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub app_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Cross-chain destination of the proceeds of an order.
#[serde_as]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bridging {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub destination_chain_id: u64,
    pub destination_token_address: Address,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReplacedOrder {
    pub uid: OrderUid,
}

/// Contains information to hint at how a solver could make
/// use of flashloans to settle the associated order.
/// Since using flashloans introduces a bunch of complexities
/// all these hints are not binding for the solver.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashloan {
    /// Which contract to request the flashloan from.
    pub liquidity_provider: Address,
    /// Which helper contract should be used to request
    /// the flashloan with.
    pub protocol_adapter: Address,
    /// Who should receive the borrowed tokens.
    pub receiver: Address,
    /// Which token to flashloan.
    pub token: Address,
    /// How much of the token to flashloan.
    #[serde_as(as = "HexOrDecimalU256")]
    pub amount: U256,
}

/// Contains information about wrapper contracts
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperCall {
    /// The address of the wrapper contract.
    pub address: Address,
    /// Additional calldata to be passed to the wrapper contract.
    pub data: Bytes,
    /// Declares whether this wrapper (and its data) needs to be included
    /// unmodified in a solution containing this order.
    #[serde(default)]
    pub is_omittable: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PartnerFee {
    #[serde(flatten)]
    pub policy: FeePolicy,
    pub recipient: Address,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeePolicy {
    /// Fees should be captured from the difference between execution price
    /// and the orders' limit price (i.e. improvement over the price signed
    /// by the user).
    Surplus {
        /// How many bps of surplus should be captured as fees.
        bps: u64,
        /// How many bps of the total volume may be captured at most.
        max_volume_bps: u64,
    },
    /// Fees should be captured from the difference between execution price
    /// and the price of the order's reference quote.
    PriceImprovement { bps: u64, max_volume_bps: u64 },
    /// Fees should be captured from an order's entire volume.
    Volume { bps: u64 },
}

impl FeePolicy {
    /// All basis point values the policy carries.
    pub fn bps_values(&self) -> Vec<(&'static str, u64)> {
        match *self {
            Self::Surplus {
                bps,
                max_volume_bps,
            } => vec![("surplusBps", bps), ("maxVolumeBps", max_volume_bps)],
            Self::PriceImprovement {
                bps,
                max_volume_bps,
            } => vec![
                ("priceImprovementBps", bps),
                ("maxVolumeBps", max_volume_bps),
            ],
            Self::Volume { bps } => vec![("volumeBps", bps)],
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum FeePolicyHelper {
    #[serde(rename_all = "camelCase")]
    Surplus {
        surplus_bps: u64,
        max_volume_bps: u64,
    },
    #[serde(rename_all = "camelCase")]
    PriceImprovement {
        price_improvement_bps: u64,
        max_volume_bps: u64,
    },
    #[serde(rename_all = "camelCase")]
    Volume { volume_bps: u64 },
    // Originally only volume fees were allowed and they used the field `bps`.
    // Old documents are still accepted in that format.
    VolumeOld { bps: u64 },
}

impl<'de> Deserialize<'de> for FeePolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match FeePolicyHelper::deserialize(deserializer)? {
            FeePolicyHelper::Surplus {
                surplus_bps,
                max_volume_bps,
            } => FeePolicy::Surplus {
                bps: surplus_bps,
                max_volume_bps,
            },
            FeePolicyHelper::PriceImprovement {
                price_improvement_bps,
                max_volume_bps,
            } => FeePolicy::PriceImprovement {
                bps: price_improvement_bps,
                max_volume_bps,
            },
            FeePolicyHelper::Volume { volume_bps } => FeePolicy::Volume { bps: volume_bps },
            FeePolicyHelper::VolumeOld { bps } => FeePolicy::Volume { bps },
        })
    }
}

impl Serialize for FeePolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let helper = match *self {
            Self::Volume { bps } => FeePolicyHelper::Volume { volume_bps: bps },
            Self::Surplus {
                bps,
                max_volume_bps,
            } => FeePolicyHelper::Surplus {
                surplus_bps: bps,
                max_volume_bps,
            },
            Self::PriceImprovement {
                bps,
                max_volume_bps,
            } => FeePolicyHelper::PriceImprovement {
                price_improvement_bps: bps,
                max_volume_bps,
            },
        };
        helper.serialize(serializer)
    }
}

/// A list containing all the partner fees. A single fee is written as a plain
/// object, several fees as an array.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PartnerFees(pub Vec<PartnerFee>);

impl PartnerFees {
    pub fn iter(&self) -> Iter<'_, PartnerFee> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<PartnerFee> for PartnerFees {
    fn from(fee: PartnerFee) -> Self {
        Self(vec![fee])
    }
}

impl<'de> Deserialize<'de> for PartnerFees {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Single(PartnerFee),
            Multiple(Vec<PartnerFee>),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Single(fee) => Ok(PartnerFees(vec![fee])),
            Helper::Multiple(fees) => Ok(PartnerFees(fees)),
        }
    }
}

impl Serialize for PartnerFees {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0.as_slice() {
            [single] => single.serialize(serializer),
            fees => fees.serialize(serializer),
        }
    }
}

// uid as 56 bytes: 32 for orderDigest, 20 for ownerAddress and 4 for validTo
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct OrderUid(pub [u8; 56]);

impl OrderUid {
    pub fn from_parts(digest: B256, owner: Address, valid_to: u32) -> Self {
        let mut uid = [0u8; 56];
        uid[0..32].copy_from_slice(digest.as_slice());
        uid[32..52].copy_from_slice(owner.as_slice());
        uid[52..56].copy_from_slice(&valid_to.to_be_bytes());
        Self(uid)
    }

    /// Splits the uid into its order digest, owner and validTo.
    pub fn parts(&self) -> (B256, Address, u32) {
        let mut valid_to = [0u8; 4];
        valid_to.copy_from_slice(&self.0[52..56]);
        (
            B256::from_slice(&self.0[0..32]),
            Address::from_slice(&self.0[32..52]),
            u32::from_be_bytes(valid_to),
        )
    }
}

impl Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&const_hex::encode_prefixed(self.0))
    }
}

impl fmt::Debug for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Default for OrderUid {
    fn default() -> Self {
        Self([0u8; 56])
    }
}

impl FromStr for OrderUid {
    type Err = const_hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut value = [0u8; 56];
        const_hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), value.as_mut())?;
        Ok(Self(value))
    }
}

impl Serialize for OrderUid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OrderUid {
    fn deserialize<D>(deserializer: D) -> Result<OrderUid, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor {}
        impl de::Visitor<'_> for Visitor {
            type Value = OrderUid;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "an uid with orderDigest_owner_validTo")
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let hex = s.strip_prefix("0x").ok_or_else(|| {
                    de::Error::custom(format!(
                        "{s:?} can't be decoded as hex uid because it does not start with '0x'"
                    ))
                })?;
                hex.parse().map_err(|err| {
                    de::Error::custom(format!("failed to decode {s:?} as hex uid: {err}"))
                })
            }
        }

        deserializer.deserialize_str(Visitor {})
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::{address, b256},
        serde_json::json,
    };

    #[test]
    fn partner_fee_formats() {
        let recipient = "0x0202020202020202020202020202020202020202";
        for (value, policy) in [
            (json!({"bps": 10, "recipient": recipient}), FeePolicy::Volume { bps: 10 }),
            (
                json!({"volumeBps": 20, "recipient": recipient}),
                FeePolicy::Volume { bps: 20 },
            ),
            (
                json!({"surplusBps": 30, "maxVolumeBps": 100, "recipient": recipient}),
                FeePolicy::Surplus {
                    bps: 30,
                    max_volume_bps: 100,
                },
            ),
            (
                json!({"priceImprovementBps": 40, "maxVolumeBps": 100, "recipient": recipient}),
                FeePolicy::PriceImprovement {
                    bps: 40,
                    max_volume_bps: 100,
                },
            ),
        ] {
            let fee: PartnerFee = serde_json::from_value(value).unwrap();
            assert_eq!(fee.policy, policy);
            assert_eq!(fee.recipient, Address::repeat_byte(2));
        }
    }

    #[test]
    fn partner_fees_single_and_multiple() {
        let fee = PartnerFee {
            policy: FeePolicy::Volume { bps: 50 },
            recipient: Address::repeat_byte(1),
        };
        let single = serde_json::to_value(PartnerFees::from(fee.clone())).unwrap();
        assert!(single.is_object());
        assert_eq!(single["volumeBps"], json!(50));

        let multiple = PartnerFees(vec![fee.clone(), fee.clone()]);
        let value = serde_json::to_value(&multiple).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(
            serde_json::from_value::<PartnerFees>(value).unwrap(),
            multiple
        );
        assert_eq!(
            serde_json::from_value::<PartnerFees>(single).unwrap(),
            PartnerFees(vec![fee])
        );
    }

    #[test]
    fn quote_accepts_legacy_string_slippage() {
        let quote: Quote = serde_json::from_value(json!({"slippageBips": "50", "version": "0.2.0"})).unwrap();
        assert_eq!(quote.slippage_bips, 50);
        let quote: Quote = serde_json::from_value(json!({"slippageBips": 75})).unwrap();
        assert_eq!(quote.slippage_bips, 75);
        assert_eq!(
            serde_json::to_value(&quote).unwrap(),
            json!({"slippageBips": 75})
        );
    }

    #[test]
    fn order_uid_parts() {
        let digest = b256!("0e45d31fd31b28c26031cdd81b35a8938b2ccca2cc425fcf440fd3bfed1eede9");
        let owner = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
        let uid = OrderUid::from_parts(digest, owner, u32::MAX);
        assert_eq!(uid.parts(), (digest, owner, u32::MAX));
        assert_eq!(
            uid.to_string(),
            "0x0e45d31fd31b28c26031cdd81b35a8938b2ccca2cc425fcf440fd3bfed1eede970997970c51812dc3a010c7d01b50e0d17dc79c8ffffffff"
        );
        let round_trip: OrderUid = serde_json::from_value(json!(uid.to_string())).unwrap();
        assert_eq!(round_trip, uid);
        assert!(serde_json::from_value::<OrderUid>(json!("0e45")).is_err());
    }
}
