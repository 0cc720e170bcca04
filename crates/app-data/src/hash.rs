use {
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    std::{
        borrow::Cow,
        fmt::{self, Debug, Display, Formatter},
        str::FromStr,
    },
    tiny_keccak::{Hasher, Keccak},
};

/// Computes the keccak-256 digest of a full app data document. This is the
/// value orders commit to in their `appData` field.
pub fn hash_full_app_data(full_app_data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(full_app_data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

/// On the contract level orders have 32 bytes of generic data that are freely
/// choosable by the user. On the protocol level this is the keccak-256 hash of
/// an app data json document, which associates arbitrary information with an
/// order while being signed by the user.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct AppDataHash(pub [u8; 32]);

impl AppDataHash {
    /// Hashes the exact bytes of a full app data document.
    pub fn of_full_app_data(full_app_data: &str) -> Self {
        Self(hash_full_app_data(full_app_data.as_bytes()))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl Display for AppDataHash {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&const_hex::encode_prefixed(self.0))
    }
}

impl Debug for AppDataHash {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid app data hash: {0}")]
pub struct ParseAppDataHashError(#[from] const_hex::FromHexError);

impl FromStr for AppDataHash {
    type Err = ParseAppDataHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        const_hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for AppDataHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AppDataHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Cow::<str>::deserialize(deserializer)?;
        s.parse().map_err(|err| {
            de::Error::custom(format!(
                "failed to decode {s:?} as hex appdata 32 bytes: {err}"
            ))
        })
    }
}

impl PartialEq<[u8; 32]> for AppDataHash {
    fn eq(&self, other: &[u8; 32]) -> bool {
        self.0 == *other
    }
}

impl From<[u8; 32]> for AppDataHash {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl From<AppDataHash> for alloy::primitives::B256 {
    fn from(value: AppDataHash) -> Self {
        Self(value.0)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn known_documents() {
        assert_eq!(
            hash_full_app_data(br#"{"appCode":"CoW Swap","metadata":{},"version":"0.7.0"}"#),
            hex!("337aa6e6c2a7a0d1eb79a35ebd88b08fc963d5f7a3fc953b7ffb2b7f5898a1df"),
        );
        assert_eq!(
            AppDataHash::of_full_app_data(
                r#"{"appCode":"CoW Swap","environment":"production","metadata":{"quote":{"slippageBips":"50","version":"0.2.0"},"orderClass":{"orderClass":"market","version":"0.1.0"}},"version":"0.6.0"}"#
            ),
            hex!("8af4e8c9973577b08ac21d17d331aade86c11ebcc5124744d621ca8365ec9424"),
        );
    }

    #[test]
    fn parses_with_and_without_prefix() {
        let prefixed: AppDataHash =
            "0x337aa6e6c2a7a0d1eb79a35ebd88b08fc963d5f7a3fc953b7ffb2b7f5898a1df"
                .parse()
                .unwrap();
        let bare: AppDataHash = "337aa6e6c2a7a0d1eb79a35ebd88b08fc963d5f7a3fc953b7ffb2b7f5898a1df"
            .parse()
            .unwrap();
        assert_eq!(prefixed, bare);
        assert!("0x1234".parse::<AppDataHash>().is_err());
    }

    #[test]
    fn serde_as_prefixed_hex() {
        let hash = AppDataHash([0x42; 32]);
        let json = serde_json::to_value(hash).unwrap();
        assert_eq!(json, serde_json::json!(format!("0x{}", "42".repeat(32))));
        assert_eq!(serde_json::from_value::<AppDataHash>(json).unwrap(), hash);
    }
}
