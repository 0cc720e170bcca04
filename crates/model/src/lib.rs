//! Contains the order types that are signed by users and exchanged with the
//! order book.

pub mod order;
pub mod quote;
pub mod signature;

use {
    alloy::{
        primitives::{Address, B256, U256, keccak256},
        sol_types::Eip712Domain,
    },
    std::{borrow::Cow, fmt, str::FromStr, sync::LazyLock},
};

/// The EIP-712 domain name used for computing the domain separator.
pub const DOMAIN_NAME: &str = "Gnosis Protocol";

/// The EIP-712 domain version used for computing the domain separator.
pub const DOMAIN_VERSION: &str = "v2";

#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct DomainSeparator(pub [u8; 32]);

impl FromStr for DomainSeparator {
    type Err = const_hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        const_hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for DomainSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&const_hex::encode(self.0))
    }
}

impl DomainSeparator {
    pub fn new(chain_id: u64, contract_address: Address) -> Self {
        static DOMAIN_NAME_HASH: LazyLock<B256> = LazyLock::new(|| keccak256(DOMAIN_NAME));
        static DOMAIN_VERSION_HASH: LazyLock<B256> = LazyLock::new(|| keccak256(DOMAIN_VERSION));
        static DOMAIN_TYPE_HASH: LazyLock<B256> = LazyLock::new(|| {
            keccak256(
                "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
            )
        });

        let mut encoded = [0u8; 160];
        encoded[0..32].copy_from_slice(DOMAIN_TYPE_HASH.as_slice());
        encoded[32..64].copy_from_slice(DOMAIN_NAME_HASH.as_slice());
        encoded[64..96].copy_from_slice(DOMAIN_VERSION_HASH.as_slice());
        encoded[96..128].copy_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
        encoded[140..160].copy_from_slice(contract_address.as_slice());
        Self(keccak256(encoded).0)
    }
}

/// The domain orders and cancellations are signed in, as expected by
/// typed-data signers.
pub fn eip712_domain(chain_id: u64, contract_address: Address) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(DOMAIN_NAME)),
        Some(Cow::Borrowed(DOMAIN_VERSION)),
        Some(U256::from(chain_id)),
        Some(contract_address),
        None,
    )
}

/// Returns the EIP-712 digest for a struct hash: the message that actually
/// gets signed.
pub fn hashed_eip712_message(domain_separator: &DomainSeparator, struct_hash: &[u8; 32]) -> B256 {
    let mut message = [0u8; 66];
    message[0..2].copy_from_slice(&[0x19, 0x01]);
    message[2..34].copy_from_slice(&domain_separator.0);
    message[34..66].copy_from_slice(struct_hash);
    keccak256(message)
}
