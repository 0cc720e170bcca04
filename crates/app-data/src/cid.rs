//! Content identifiers under which app data documents are stored on IPFS.

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum CidError {
    #[error("incorrect hash length: expected 32 bytes, got {actual}")]
    InvalidHashLength { actual: usize },
    #[error("app data hash is not hex: {0}")]
    InvalidHex(#[from] const_hex::FromHexError),
}

fn parse_hash(app_data_hex: &str) -> Result<[u8; 32], CidError> {
    let bytes = const_hex::decode(app_data_hex.strip_prefix("0x").unwrap_or(app_data_hex))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CidError::InvalidHashLength {
            actual: bytes.len(),
        })
}

/// Legacy identifier: the hash is treated as a sha2-256 digest of a dag-pb
/// node and encoded as a version 0 CID.
pub fn cid_v0_from_hash(hash: &[u8; 32]) -> String {
    let mut raw_cid = [0u8; 4 + 32];
    raw_cid[0] = 1; // cid version
    raw_cid[1] = 0x70; // dag-pb
    raw_cid[2] = 0x12; // sha2-256
    raw_cid[3] = 32; // hash length
    raw_cid[4..].copy_from_slice(hash);
    // A v0 CID is the bare multihash in base58btc, without multibase prefix.
    let encoded = multibase::encode(multibase::Base::Base58Btc, &raw_cid[2..]);
    encoded
        .strip_prefix(multibase::Base::Base58Btc.code())
        .map(str::to_owned)
        .unwrap_or(encoded)
}

/// Identifier of the raw document bytes addressed by their keccak-256 hash.
pub fn cid_v1_from_hash(hash: &[u8; 32]) -> String {
    let mut raw_cid = [0u8; 4 + 32];
    raw_cid[0] = 1; // cid version
    raw_cid[1] = 0x55; // raw
    raw_cid[2] = 0x1b; // keccak-256
    raw_cid[3] = 32; // hash length
    raw_cid[4..].copy_from_slice(hash);
    multibase::encode(multibase::Base::Base16Lower, raw_cid)
}

/// Converts a `0x` prefixed (or bare) app data hash to its legacy CID.
pub fn app_data_hex_to_cid(app_data_hex: &str) -> Result<String, CidError> {
    parse_hash(app_data_hex).map(|hash| cid_v0_from_hash(&hash))
}

pub fn app_data_hex_to_cid_v1(app_data_hex: &str) -> Result<String, CidError> {
    parse_hash(app_data_hex).map(|hash| cid_v1_from_hash(&hash))
}
