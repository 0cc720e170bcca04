use {
    crate::{DomainSeparator, hashed_eip712_message},
    alloy::primitives::{Address, B256, keccak256},
    anyhow::{Context as _, Result, ensure},
    serde::{Deserialize, Serialize, de},
    std::fmt::{self, Debug, Formatter},
};

/// See [`Signature`].
#[derive(
    Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SigningScheme {
    #[default]
    Eip712,
    EthSign,
    Eip1271,
    PreSign,
}

/// Signature over the order data.
/// All variants rely on the EIP-712 hash of the order data, referred to as the
/// order hash.
#[derive(Eq, PartialEq, Clone, Deserialize, Serialize, Hash)]
#[serde(into = "JsonSignature", try_from = "JsonSignature")]
pub enum Signature {
    /// The order struct is signed according to EIP-712.
    ///
    /// https://eips.ethereum.org/EIPS/eip-712
    Eip712(EcdsaSignature),
    /// The order hash is signed according to EIP-191's personal_sign signature
    /// format.
    ///
    /// https://eips.ethereum.org/EIPS/eip-191
    EthSign(EcdsaSignature),
    /// Signature verified according to EIP-1271, which facilitates a way for
    /// contracts to verify signatures using an arbitrary method. This
    /// allows smart contracts to sign and place orders. The order hash is
    /// passed to the verification method, along with this signature.
    ///
    /// https://eips.ethereum.org/EIPS/eip-1271
    Eip1271(Vec<u8>),
    /// For these signatures, the user broadcasts a transaction onchain. The
    /// off-chain part only carries the owner address.
    PreSign(Address),
}

impl Default for Signature {
    fn default() -> Self {
        Self::default_with(SigningScheme::default())
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let scheme = format!("{:?}", self.scheme());
        let bytes = const_hex::encode_prefixed(self.to_bytes());
        f.debug_tuple(&scheme).field(&bytes).finish()
    }
}

impl Signature {
    pub fn default_with(scheme: SigningScheme) -> Self {
        match scheme {
            SigningScheme::Eip712 => Signature::Eip712(Default::default()),
            SigningScheme::EthSign => Signature::EthSign(Default::default()),
            SigningScheme::Eip1271 => Signature::Eip1271(Default::default()),
            SigningScheme::PreSign => Signature::PreSign(Address::ZERO),
        }
    }

    /// Recovers the owner of the specified signature for a given message.
    ///
    /// This method returns an error if there is an issue recovering an ECDSA
    /// signature, or `None` for on-chain schemes that don't support owner
    /// recovery.
    pub fn recover(
        &self,
        domain_separator: &DomainSeparator,
        struct_hash: &[u8; 32],
    ) -> Result<Option<Address>> {
        match self {
            Self::Eip712(signature) => signature
                .recover(EcdsaSigningScheme::Eip712, domain_separator, struct_hash)
                .map(Some),
            Self::EthSign(signature) => signature
                .recover(EcdsaSigningScheme::EthSign, domain_separator, struct_hash)
                .map(Some),
            Self::Eip1271(_) | Self::PreSign(_) => Ok(None),
        }
    }

    pub fn from_bytes(scheme: SigningScheme, bytes: &[u8]) -> Result<Self> {
        Ok(match scheme {
            SigningScheme::Eip712 | SigningScheme::EthSign => {
                let bytes: &[u8; 65] = bytes
                    .try_into()
                    .context("ECDSA signature must be 65 bytes long")?;
                let signature = EcdsaSignature::from_bytes(bytes);
                match scheme {
                    SigningScheme::EthSign => Self::EthSign(signature),
                    _ => Self::Eip712(signature),
                }
            }
            SigningScheme::Eip1271 => Self::Eip1271(bytes.to_vec()),
            SigningScheme::PreSign => {
                ensure!(
                    bytes.is_empty() || bytes.len() == 20,
                    "presign signature bytes should be empty or the owner address",
                );
                if bytes.is_empty() {
                    Self::PreSign(Address::ZERO)
                } else {
                    Self::PreSign(Address::from_slice(bytes))
                }
            }
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Eip712(signature) | Self::EthSign(signature) => signature.to_bytes().to_vec(),
            Self::Eip1271(signature) => signature.clone(),
            Self::PreSign(owner) => owner.to_vec(),
        }
    }

    pub fn scheme(&self) -> SigningScheme {
        match self {
            Signature::Eip712(_) => SigningScheme::Eip712,
            Signature::EthSign(_) => SigningScheme::EthSign,
            Signature::Eip1271(_) => SigningScheme::Eip1271,
            Signature::PreSign(_) => SigningScheme::PreSign,
        }
    }
}

/// An internal type used for deriving `serde` implementations for the
/// `Signature` type.
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSignature {
    signing_scheme: SigningScheme,
    signature: alloy::primitives::Bytes,
}

impl From<Signature> for JsonSignature {
    fn from(signature: Signature) -> Self {
        Self {
            signing_scheme: signature.scheme(),
            signature: signature.to_bytes().into(),
        }
    }
}

impl TryFrom<JsonSignature> for Signature {
    type Error = anyhow::Error;

    fn try_from(json: JsonSignature) -> Result<Self, Self::Error> {
        Self::from_bytes(json.signing_scheme, &json.signature)
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EcdsaSigningScheme {
    #[default]
    Eip712,
    EthSign,
}

impl From<EcdsaSigningScheme> for SigningScheme {
    fn from(scheme: EcdsaSigningScheme) -> Self {
        match scheme {
            EcdsaSigningScheme::Eip712 => Self::Eip712,
            EcdsaSigningScheme::EthSign => Self::EthSign,
        }
    }
}

impl SigningScheme {
    pub fn is_ecdsa_scheme(&self) -> bool {
        self.try_to_ecdsa_scheme().is_some()
    }

    pub fn try_to_ecdsa_scheme(&self) -> Option<EcdsaSigningScheme> {
        match self {
            Self::Eip712 => Some(EcdsaSigningScheme::Eip712),
            Self::EthSign => Some(EcdsaSigningScheme::EthSign),
            Self::Eip1271 | Self::PreSign => None,
        }
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Hash)]
pub struct EcdsaSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

/// Returns the message used for signing and recovery for the specified order
/// hash.
///
/// The signing message depends on the signature scheme that was used.
pub fn signing_message(
    signing_scheme: EcdsaSigningScheme,
    domain_separator: &DomainSeparator,
    struct_hash: &[u8; 32],
) -> B256 {
    let message = hashed_eip712_message(domain_separator, struct_hash);
    match signing_scheme {
        EcdsaSigningScheme::Eip712 => message,
        EcdsaSigningScheme::EthSign => hashed_ethsign_message(&message.0),
    }
}

/// EIP-191 personal message hash of a 32 byte message.
pub fn hashed_ethsign_message(message: &[u8; 32]) -> B256 {
    let mut buffer = [0u8; 60];
    buffer[..28].copy_from_slice(b"\x19Ethereum Signed Message:\n32");
    buffer[28..].copy_from_slice(message);
    keccak256(buffer)
}

impl EcdsaSignature {
    pub fn to_signature(self, scheme: EcdsaSigningScheme) -> Signature {
        match scheme {
            EcdsaSigningScheme::Eip712 => Signature::Eip712(self),
            EcdsaSigningScheme::EthSign => Signature::EthSign(self),
        }
    }

    /// r + s + v
    pub fn to_bytes(self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.v;
        bytes
    }

    /// Parses r + s + v. Signers differ in whether they return the recovery
    /// id as `0`/`1` or `27`/`28`; it is always stored as the latter.
    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        let v = match bytes[64] {
            v @ (0 | 1) => v + 27,
            v => v,
        };
        EcdsaSignature {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v,
        }
    }

    pub fn recover(
        &self,
        signing_scheme: EcdsaSigningScheme,
        domain_separator: &DomainSeparator,
        struct_hash: &[u8; 32],
    ) -> Result<Address> {
        let message = signing_message(signing_scheme, domain_separator, struct_hash);
        let signature = alloy::primitives::Signature::from_raw_array(&self.to_bytes())
            .context("unexpectedly invalid signature")?;
        Ok(signature.recover_address_from_prehash(&message)?)
    }

    /// Returns an arbitrary non-zero signature that can be used for recovery
    /// when you don't actually care about the owner.
    pub fn non_zero() -> Self {
        Self {
            r: B256::repeat_byte(1),
            s: B256::repeat_byte(2),
            v: 27,
        }
    }
}

impl Serialize for EcdsaSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&const_hex::encode_prefixed(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for EcdsaSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor {}
        impl de::Visitor<'_> for Visitor {
            type Value = EcdsaSignature;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "the 65 ecdsa signature bytes as a hex encoded string, ordered as r, s, v, \
                     where v is either 27 or 28"
                )
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let s = s.strip_prefix("0x").ok_or_else(|| {
                    de::Error::custom(format!(
                        "{s:?} can't be decoded as hex ecdsa signature because it does not start \
                         with '0x'"
                    ))
                })?;
                let mut bytes = [0u8; 65];
                const_hex::decode_to_slice(s, &mut bytes).map_err(|err| {
                    de::Error::custom(format!(
                        "failed to decode {s:?} as hex ecdsa signature: {err}"
                    ))
                })?;
                Ok(EcdsaSignature::from_bytes(&bytes))
            }
        }

        deserializer.deserialize_str(Visitor {})
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn onchain_signatures_cannot_recover_owners() {
        for signature in [
            Signature::PreSign(Address::repeat_byte(1)),
            Signature::Eip1271(Default::default()),
        ] {
            assert_eq!(
                signature
                    .recover(&Default::default(), &Default::default())
                    .unwrap(),
                None
            );
        }
    }

    #[test]
    fn onchain_signatures_fail_to_convert_to_ecdsa_signature() {
        for signature in [SigningScheme::PreSign, SigningScheme::Eip1271] {
            assert!(signature.try_to_ecdsa_scheme().is_none());
        }
    }

    #[test]
    fn signature_from_bytes() {
        assert!(Signature::from_bytes(SigningScheme::Eip712, &[0u8; 20]).is_err());
        assert!(Signature::from_bytes(SigningScheme::EthSign, &[0u8; 20]).is_err());
        assert!(Signature::from_bytes(SigningScheme::PreSign, &[0u8; 32]).is_err());

        assert_eq!(
            Signature::from_bytes(SigningScheme::Eip712, &[0u8; 65]).unwrap(),
            Signature::Eip712(EcdsaSignature {
                v: 27,
                ..Default::default()
            })
        );
        assert_eq!(
            Signature::from_bytes(SigningScheme::PreSign, &[]).unwrap(),
            Signature::default_with(SigningScheme::PreSign)
        );
        assert_eq!(
            Signature::from_bytes(SigningScheme::PreSign, &[7u8; 20]).unwrap(),
            Signature::PreSign(Address::repeat_byte(7))
        );
        assert_eq!(
            Signature::from_bytes(SigningScheme::Eip1271, &[1, 2, 3]).unwrap(),
            Signature::Eip1271(vec![1, 2, 3]),
        );
    }

    #[test]
    fn recovery_id_is_normalized() {
        let mut bytes = [0u8; 65];
        for (raw, normalized) in [(0, 27), (1, 28), (27, 27), (28, 28)] {
            bytes[64] = raw;
            assert_eq!(EcdsaSignature::from_bytes(&bytes).v, normalized);
        }
    }

    #[test]
    fn signature_to_bytes() {
        assert_eq!(
            Signature::default_with(SigningScheme::Eip712).to_bytes(),
            [0u8; 65].to_vec()
        );
        assert_eq!(
            Signature::PreSign(Address::repeat_byte(3)).to_bytes(),
            [3u8; 20].to_vec()
        );
        assert_eq!(Signature::Eip1271(vec![1, 2, 3]).to_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn ecdsa_scheme_conversion() {
        for ecdsa_scheme in [EcdsaSigningScheme::Eip712, EcdsaSigningScheme::EthSign] {
            let scheme = SigningScheme::from(ecdsa_scheme);
            assert!(scheme.is_ecdsa_scheme())
        }

        for onchain_scheme in [SigningScheme::PreSign, SigningScheme::Eip1271] {
            assert!(!onchain_scheme.is_ecdsa_scheme())
        }
    }

    #[test]
    fn deserialize_and_back() {
        for (signature, json) in [
            (
                Signature::EthSign(EcdsaSignature {
                    r: B256::repeat_byte(1),
                    s: B256::repeat_byte(2),
                    v: 28,
                }),
                json!({
                    "signingScheme": "ethsign",
                    "signature": "0x\
                        0101010101010101010101010101010101010101010101010101010101010101\
                        0202020202020202020202020202020202020202020202020202020202020202\
                        1c",
                }),
            ),
            (
                Signature::Eip1271(vec![1, 2, 3]),
                json!({
                    "signingScheme": "eip1271",
                    "signature": "0x010203",
                }),
            ),
            (
                Signature::PreSign(Address::repeat_byte(0x0f)),
                json!({
                    "signingScheme": "presign",
                    "signature": "0x0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f",
                }),
            ),
        ] {
            assert_eq!(signature, serde_json::from_value(json.clone()).unwrap());
            assert_eq!(json, json!(signature));
        }
    }

    #[test]
    fn deserialization_errors() {
        for json in [
            json!({
                "signingScheme": "eip712",
                "signature": "0x0102",
            }),
            json!({
                "signingScheme": "ethsign",
                "signature": 1234,
            }),
            json!({
                "signingScheme": "eip1271",
            }),
            json!({
                "signingScheme": "presign",
                "signature": "0x01",
            }),
        ] {
            assert!(serde_json::from_value::<Signature>(json).is_err());
        }
    }

    #[test]
    fn ethsign_message() {
        // keccak256("\x19Ethereum Signed Message:\n32" ++ 32 zero bytes)
        assert_eq!(
            hashed_ethsign_message(&[0u8; 32]),
            alloy::primitives::b256!(
                "5e4106618209740b9f773a94c5667b9659a7a4e2691c7c8a78336e9889a6be07"
            )
        );
    }
}
