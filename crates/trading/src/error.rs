use {
    crate::{order_book::OrderBookError, signer::SignerError},
    app_data::{CanonicalError, CidError, RetrievalError, SchemaValidationError},
};

/// Everything that can go wrong while building, signing and posting an order.
#[derive(Debug, thiserror::Error, strum::EnumDiscriminants)]
#[strum_discriminants(name(ErrorKind))]
#[strum_discriminants(derive(Hash, strum::Display, strum::IntoStaticStr))]
pub enum Error {
    /// The app data document does not match the schema of its version.
    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),
    #[error("incorrect hash length: expected 32 bytes, got {actual}")]
    InvalidHashLength { actual: usize },
    /// Fetching a document from IPFS failed. Callers may retry.
    #[error("could not retrieve app data document: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("invalid order validity: {0}")]
    InvalidValidity(&'static str),
    #[error("signer rejected the request: {0}")]
    SigningRejected(String),
    #[error("signer is not configured for this request: {0}")]
    SignerConfiguration(String),
    #[error("selling the native currency requires a quote id")]
    MissingQuoteId,
    #[error("invalid trade parameters: {0}")]
    InvalidTrade(String),
    #[error(transparent)]
    OrderBook(#[from] OrderBookError),
    #[error("chain {0} is not supported")]
    UnsupportedChain(u64),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("arithmetic overflow computing {0}")]
    Arithmetic(&'static str),
    /// The transaction could not be broadcast. App data that was uploaded
    /// before stays uploaded; re-uploading it is idempotent.
    #[error("transaction broadcast failed: {0}")]
    Broadcast(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.into()
    }
}

impl From<CidError> for Error {
    fn from(err: CidError) -> Self {
        match err {
            CidError::InvalidHashLength { actual } => Self::InvalidHashLength { actual },
            CidError::InvalidHex(err) => Self::Serialization(err.to_string()),
        }
    }
}

impl From<CanonicalError> for Error {
    fn from(err: CanonicalError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<SignerError> for Error {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Rejected(reason) => Self::SigningRejected(reason),
            SignerError::Configuration(reason) => Self::SignerConfiguration(reason),
            SignerError::Transaction(reason) => Self::Broadcast(reason),
        }
    }
}
