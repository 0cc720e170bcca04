//! Cancelling orders, either by asking the order book (free, but a solver may
//! already be settling the order) or on chain.

use {
    crate::{
        error::Error,
        eth_flow,
        order_book::OrderBook,
        signer::Signer,
        signing,
        transactions,
    },
    alloy::primitives::B256,
    contracts::Env,
    model::{
        order::{OrderCancellations, OrderUid, SignedOrderCancellations},
        signature::EcdsaSigningScheme,
    },
};

/// Signs a cancellation for `order_uids` and sends it to the order book.
#[tracing::instrument(skip_all, fields(orders = order_uids.len()))]
pub async fn cancel_orders_off_chain(
    order_book: &dyn OrderBook,
    signer: &dyn Signer,
    order_uids: &[OrderUid],
    chain_id: u64,
    scheme: EcdsaSigningScheme,
) -> Result<(), Error> {
    let signature = signing::sign_cancellations(order_uids, chain_id, scheme, signer).await?;
    order_book
        .cancel_orders(&SignedOrderCancellations {
            data: OrderCancellations {
                order_uids: order_uids.to_vec(),
            },
            signature,
            signing_scheme: scheme,
        })
        .await?;
    Ok(())
}

/// Invalidates an order on chain and returns the transaction hash. Eth-flow
/// orders are invalidated through the eth-flow contract, which refunds the
/// user, all others through the settlement contract.
#[tracing::instrument(skip_all, fields(%order_uid))]
pub async fn cancel_order_on_chain(
    order_book: &dyn OrderBook,
    signer: &dyn Signer,
    order_uid: &OrderUid,
    chain_id: u64,
    env: Env,
) -> Result<B256, Error> {
    let order = order_book.get_order(order_uid).await?;
    let transaction = if order.metadata.ethflow_data.is_some() {
        eth_flow::invalidation_transaction(&order, chain_id, env, transactions::GAS_LIMIT_DEFAULT)?
    } else {
        transactions::invalidation_transaction(order_uid, chain_id)?
    };
    let tx_hash = signer.send_transaction(transaction).await?;
    tracing::info!(?tx_hash, "sent order invalidation");
    Ok(tx_hash)
}
