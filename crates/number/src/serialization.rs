use {
    alloy::primitives::U256,
    serde::{Deserializer, Serializer, de},
    serde_with::{DeserializeAs, SerializeAs},
    std::fmt,
};

/// (De)serialize [`U256`] as a decimal string. Deserialization also accepts a
/// `0x` prefixed hex string or a plain JSON integer.
///
/// Token amounts routinely exceed 2^53 so they travel as strings on the wire.
pub struct HexOrDecimalU256;

impl<'de> DeserializeAs<'de, U256> for HexOrDecimalU256 {
    fn deserialize_as<D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;

        impl de::Visitor<'_> for Visitor {
            type Value = U256;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "a u256 encoded either as 0x hex prefixed or decimal encoded string"
                )
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let s = s.trim();
                match s.strip_prefix("0x") {
                    Some(hex) => U256::from_str_radix(hex, 16).map_err(|err| {
                        E::custom(format!("failed to decode {s:?} as hex u256: {err}"))
                    }),
                    None => U256::from_str_radix(s, 10).map_err(|err| {
                        E::custom(format!("failed to decode {s:?} as decimal u256: {err}"))
                    }),
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(U256::from(v))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

impl SerializeAs<U256> for HexOrDecimalU256 {
    fn serialize_as<S>(source: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(source)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        rstest::rstest,
        serde::{Deserialize, Serialize},
        serde_with::serde_as,
    };

    #[serde_as]
    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Amount(#[serde_as(as = "HexOrDecimalU256")] U256);

    #[rstest]
    #[case::decimal(r#""1000000""#, 1_000_000)]
    #[case::hex(r#""0xf4240""#, 1_000_000)]
    #[case::number("1000000", 1_000_000)]
    #[case::zero(r#""0""#, 0)]
    fn deserializes(#[case] json: &str, #[case] expected: u64) {
        let amount: Amount = serde_json::from_str(json).unwrap();
        assert_eq!(amount.0, U256::from(expected));
    }

    #[test]
    fn serializes_as_decimal_string() {
        let amount = Amount(U256::MAX);
        assert_eq!(
            serde_json::to_string(&amount).unwrap(),
            format!("\"{}\"", U256::MAX)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Amount>(r#""12ab""#).is_err());
        assert!(serde_json::from_str::<Amount>(r#""0xzz""#).is_err());
        assert!(serde_json::from_str::<Amount>("-1").is_err());
    }
}
