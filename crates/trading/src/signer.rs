//! The wallet capability the trading flow needs: the owner address, signing
//! typed data and personal messages, and broadcasting a transaction.

use {
    alloy::{
        dyn_abi::TypedData,
        network::{EthereumWallet, TransactionBuilder},
        primitives::{Address, B256, Bytes, U256},
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::types::TransactionRequest,
        signers::{Signer as _, local::PrivateKeySigner},
    },
    anyhow::Context,
    std::{fmt, str::FromStr},
    url::Url,
};

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The user or wallet declined to sign.
    #[error("{0}")]
    Rejected(String),
    /// The signer can not serve the request as configured, e.g. it is
    /// connected to another chain.
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Transaction(String),
}

/// A transaction the signer should sign and broadcast.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Transaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
    /// The account that owns orders signed by this signer.
    fn address(&self) -> Address;

    /// The chain the signer is currently connected to.
    async fn chain_id(&self) -> Result<u64, SignerError>;

    /// Signs EIP-712 typed data. Externally owned accounts return a 65 byte
    /// ECDSA signature; smart contract wallets may return anything their
    /// `isValidSignature` accepts.
    async fn sign_typed_data(&self, data: &TypedData) -> Result<Bytes, SignerError>;

    /// Signs `message` with the EIP-191 personal message prefix.
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError>;

    /// Signs and broadcasts the transaction, returning its hash.
    async fn send_transaction(&self, transaction: Transaction) -> Result<B256, SignerError>;
}

/// A signer backed by a private key held in memory, optionally connected to a
/// node for broadcasting transactions.
pub struct LocalSigner {
    signer: PrivateKeySigner,
    chain_id: u64,
    provider: Option<DynProvider>,
}

impl LocalSigner {
    pub fn new(signer: PrivateKeySigner, chain_id: u64) -> Self {
        Self {
            signer: signer.with_chain_id(Some(chain_id)),
            chain_id,
            provider: None,
        }
    }

    pub fn from_private_key(private_key: &str, chain_id: u64) -> anyhow::Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key).context("invalid private key")?;
        Ok(Self::new(signer, chain_id))
    }

    /// Connects the signer to a node so it can broadcast transactions.
    pub fn with_rpc(mut self, url: Url) -> Self {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .connect_http(url);
        self.provider = Some(provider.erased());
        self
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.signer.address())
            .field("chain_id", &self.chain_id)
            .field("connected", &self.provider.is_some())
            .finish()
    }
}

#[async_trait::async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn chain_id(&self) -> Result<u64, SignerError> {
        Ok(self.chain_id)
    }

    async fn sign_typed_data(&self, data: &TypedData) -> Result<Bytes, SignerError> {
        let signature = self
            .signer
            .sign_dynamic_typed_data(data)
            .await
            .map_err(|err| SignerError::Rejected(err.to_string()))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError> {
        let signature = self
            .signer
            .sign_message(message)
            .await
            .map_err(|err| SignerError::Rejected(err.to_string()))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn send_transaction(&self, transaction: Transaction) -> Result<B256, SignerError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            SignerError::Configuration("signer is not connected to a node".to_string())
        })?;
        let request = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(transaction.to)
            .with_input(transaction.data)
            .with_value(transaction.value)
            .with_gas_limit(transaction.gas_limit)
            .with_chain_id(self.chain_id);
        let pending = provider
            .send_transaction(request)
            .await
            .map_err(|err| SignerError::Transaction(err.to_string()))?;
        tracing::debug!(tx_hash = ?pending.tx_hash(), "broadcast transaction");
        Ok(*pending.tx_hash())
    }
}
