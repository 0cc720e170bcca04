//! Placing orders: signing and submitting regular orders, or sending the
//! eth-flow transaction for orders selling the native currency.

use {
    crate::{
        assembler::{self, LimitTradeParameters, QuoteResult, TradeParameters},
        error::Error,
        eth_flow,
        order_book::OrderBook,
        signer::Signer,
        signing,
    },
    alloy::primitives::B256,
    app_data::{AppDataDoc, AppDataInfo},
    model::{
        order::{OrderCreation, OrderCreationAppData, OrderData, OrderUid},
        signature::{Signature, SigningScheme},
    },
    tracing::instrument,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderPostingResult {
    pub order_id: OrderUid,
    pub signature: Signature,
    pub signing_scheme: SigningScheme,
    pub order_to_sign: OrderData,
    /// Hash of the eth-flow transaction that places the order.
    pub tx_hash: Option<B256>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PostTradeOptions {
    /// Ignored for eth-flow orders, which are always authorized by the
    /// contract.
    pub signing_scheme: SigningScheme,
    pub eth_flow_gas_limit: u64,
}

impl Default for PostTradeOptions {
    fn default() -> Self {
        Self {
            signing_scheme: SigningScheme::Eip712,
            eth_flow_gas_limit: eth_flow::GAS_LIMIT_DEFAULT,
        }
    }
}

/// Places the order described by `params`, going through the eth-flow
/// contract when it sells the native currency.
pub async fn post_trade(
    order_book: &dyn OrderBook,
    signer: &dyn Signer,
    app_data: &AppDataDoc,
    params: &TradeParameters,
    quote: &QuoteResult,
    chain_id: u64,
    options: &PostTradeOptions,
) -> Result<OrderPostingResult, Error> {
    if params.is_native_currency_sell() {
        post_sell_native_currency_order(order_book, signer, app_data, params, quote, chain_id, options)
            .await
    } else {
        post_cow_protocol_trade(order_book, signer, app_data, params, quote, chain_id, options).await
    }
}

/// Signs the order off-chain and submits it to the order book.
#[instrument(skip_all, fields(chain_id = chain_id, kind = ?params.kind))]
pub async fn post_cow_protocol_trade(
    order_book: &dyn OrderBook,
    signer: &dyn Signer,
    app_data: &AppDataDoc,
    params: &TradeParameters,
    quote: &QuoteResult,
    chain_id: u64,
    options: &PostTradeOptions,
) -> Result<OrderPostingResult, Error> {
    let info = app_data.info()?;
    let order = assembler::to_order(
        params,
        quote,
        info.app_data_hex,
        signer.address(),
        assembler::now_in_epoch_seconds(),
    )?;
    sign_and_send(order_book, signer, order, info, quote.id, chain_id, options).await
}

/// Signs a limit order with exactly the amounts in `params` and submits it
/// to the order book.
#[instrument(skip_all, fields(chain_id = chain_id, kind = ?params.kind))]
pub async fn post_limit_order(
    order_book: &dyn OrderBook,
    signer: &dyn Signer,
    app_data: &AppDataDoc,
    params: &LimitTradeParameters,
    chain_id: u64,
    options: &PostTradeOptions,
) -> Result<OrderPostingResult, Error> {
    let info = app_data.info()?;
    let order = assembler::to_limit_order(
        params,
        info.app_data_hex,
        signer.address(),
        assembler::now_in_epoch_seconds(),
    )?;
    sign_and_send(order_book, signer, order, info, params.quote_id, chain_id, options).await
}

async fn sign_and_send(
    order_book: &dyn OrderBook,
    signer: &dyn Signer,
    order: OrderData,
    app_data: AppDataInfo,
    quote_id: Option<i64>,
    chain_id: u64,
    options: &PostTradeOptions,
) -> Result<OrderPostingResult, Error> {
    let owner = signer.address();
    let signature = signing::sign_order(&order, chain_id, options.signing_scheme, signer).await?;

    let creation = OrderCreation::new(
        &order,
        OrderCreationAppData::Both {
            full: app_data.full_app_data,
            expected: app_data.app_data_hex,
        },
        Some(owner),
        signature.clone(),
        quote_id,
    );
    let order_id = order_book.send_order(&creation).await?;
    tracing::info!(%order_id, scheme = %signature.scheme(), "posted order");

    Ok(OrderPostingResult {
        order_id,
        signing_scheme: signature.scheme(),
        signature,
        order_to_sign: order,
        tx_hash: None,
    })
}

/// Uploads the app data and sends the transaction placing an eth-flow order.
///
/// The app data is uploaded first because the order book needs the document
/// as soon as it indexes the order. A failed broadcast does not undo the
/// upload; uploading the same document again is harmless.
#[instrument(skip_all, fields(chain_id = chain_id, env = %params.env))]
pub async fn post_sell_native_currency_order(
    order_book: &dyn OrderBook,
    signer: &dyn Signer,
    app_data: &AppDataDoc,
    params: &TradeParameters,
    quote: &QuoteResult,
    chain_id: u64,
    options: &PostTradeOptions,
) -> Result<OrderPostingResult, Error> {
    let quote_id = quote.id.ok_or(Error::MissingQuoteId)?;
    let AppDataInfo {
        full_app_data,
        app_data_hex,
        ..
    } = app_data.info()?;
    let owner = signer.address();
    let order = assembler::to_order(
        params,
        quote,
        app_data_hex,
        owner,
        assembler::now_in_epoch_seconds(),
    )?;
    signing::ensure_signer_chain(signer, chain_id).await?;

    let eth_flow::EthFlowTransaction {
        order_id,
        order_to_sign,
        transaction,
    } = eth_flow::get_eth_flow_transaction(
        &order,
        quote_id,
        chain_id,
        params.env,
        options.eth_flow_gas_limit,
        order_book,
    )
    .await?;

    order_book
        .upload_app_data(app_data_hex, &full_app_data)
        .await?;
    let tx_hash = signer.send_transaction(transaction).await?;
    tracing::info!(%order_id, ?tx_hash, "sent eth-flow order");

    Ok(OrderPostingResult {
        order_id,
        signature: Signature::Eip1271(Vec::new()),
        signing_scheme: SigningScheme::Eip1271,
        order_to_sign,
        tx_hash: Some(tx_hash),
    })
}
