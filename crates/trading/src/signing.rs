//! Producing order and cancellation signatures for every signing scheme.

use {
    crate::{
        error::Error,
        signer::{Signer, SignerError},
    },
    alloy::{
        dyn_abi::TypedData,
        primitives::{Address, B256, Bytes},
        sol_types::Eip712Domain,
    },
    model::{
        DomainSeparator,
        hashed_eip712_message,
        order::{OrderCancellations, OrderData, OrderUid},
        signature::{EcdsaSignature, EcdsaSigningScheme, Signature, SigningScheme},
    },
};

/// The settlement contract orders for `chain_id` are verified by.
pub fn settlement_contract(chain_id: u64) -> Result<Address, Error> {
    contracts::deployments::settlement(chain_id).ok_or(Error::UnsupportedChain(chain_id))
}

pub fn domain(chain_id: u64) -> Result<Eip712Domain, Error> {
    Ok(model::eip712_domain(chain_id, settlement_contract(chain_id)?))
}

pub fn domain_separator(chain_id: u64) -> Result<DomainSeparator, Error> {
    Ok(DomainSeparator::new(chain_id, settlement_contract(chain_id)?))
}

/// Computes the uid the order book will assign to `order` placed by `owner`,
/// together with the EIP-712 digest it is derived from.
pub fn generate_order_id(
    chain_id: u64,
    order: &OrderData,
    owner: Address,
) -> Result<(OrderUid, B256), Error> {
    let domain_separator = domain_separator(chain_id)?;
    let digest = hashed_eip712_message(&domain_separator, &order.hash_struct());
    Ok((order.uid(&domain_separator, &owner), digest))
}

/// Fails unless the signer is connected to `chain_id`, so signatures are never
/// produced for a domain the wallet does not display.
pub async fn ensure_signer_chain(signer: &dyn Signer, chain_id: u64) -> Result<(), Error> {
    let connected = signer.chain_id().await?;
    if connected != chain_id {
        return Err(Error::SignerConfiguration(format!(
            "signer is connected to chain {connected} but chain {chain_id} was requested"
        )));
    }
    Ok(())
}

fn ecdsa_signature(bytes: &Bytes) -> Result<EcdsaSignature, Error> {
    let bytes: &[u8; 65] = bytes.as_ref().try_into().map_err(|_| {
        Error::from(SignerError::Configuration(format!(
            "expected a 65 byte ECDSA signature but the signer returned {} bytes",
            bytes.len()
        )))
    })?;
    Ok(EcdsaSignature::from_bytes(bytes))
}

/// Signs an order with the requested scheme.
///
/// Pre-signed orders never reach the signer: their signature is the owner
/// address and authorization happens through a separate `setPreSignature`
/// transaction.
pub async fn sign_order(
    order: &OrderData,
    chain_id: u64,
    scheme: SigningScheme,
    signer: &dyn Signer,
) -> Result<Signature, Error> {
    let domain = domain(chain_id)?;
    if scheme == SigningScheme::PreSign {
        return Ok(Signature::PreSign(signer.address()));
    }
    ensure_signer_chain(signer, chain_id).await?;

    let signature = match scheme {
        SigningScheme::Eip712 => {
            let typed_data = TypedData::from_struct(&order.to_eip712(), Some(domain));
            Signature::Eip712(ecdsa_signature(&signer.sign_typed_data(&typed_data).await?)?)
        }
        SigningScheme::EthSign => {
            let digest = hashed_eip712_message(&domain_separator(chain_id)?, &order.hash_struct());
            Signature::EthSign(ecdsa_signature(
                &signer.sign_message(digest.as_slice()).await?,
            )?)
        }
        SigningScheme::Eip1271 => {
            let typed_data = TypedData::from_struct(&order.to_eip712(), Some(domain));
            Signature::Eip1271(signer.sign_typed_data(&typed_data).await?.to_vec())
        }
        SigningScheme::PreSign => Signature::PreSign(signer.address()),
    };
    tracing::debug!(scheme = %signature.scheme(), "signed order");
    Ok(signature)
}

/// Signs the cancellation of several orders at once. Only ECDSA schemes can
/// authorize cancellations off-chain.
pub async fn sign_cancellations(
    order_uids: &[OrderUid],
    chain_id: u64,
    scheme: EcdsaSigningScheme,
    signer: &dyn Signer,
) -> Result<EcdsaSignature, Error> {
    let cancellations = OrderCancellations {
        order_uids: order_uids.to_vec(),
    };
    let domain = domain(chain_id)?;
    ensure_signer_chain(signer, chain_id).await?;

    let bytes = match scheme {
        EcdsaSigningScheme::Eip712 => {
            let typed_data = TypedData::from_struct(&cancellations.to_eip712(), Some(domain));
            signer.sign_typed_data(&typed_data).await?
        }
        EcdsaSigningScheme::EthSign => {
            let digest =
                hashed_eip712_message(&domain_separator(chain_id)?, &cancellations.hash_struct());
            signer.sign_message(digest.as_slice()).await?
        }
    };
    ecdsa_signature(&bytes)
}

pub async fn sign_cancellation(
    order_uid: OrderUid,
    chain_id: u64,
    scheme: EcdsaSigningScheme,
    signer: &dyn Signer,
) -> Result<EcdsaSignature, Error> {
    sign_cancellations(&[order_uid], chain_id, scheme, signer).await
}
