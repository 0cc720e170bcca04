//! Turns a quoted trade into a signed order on the CoW Protocol order book,
//! either directly or, for native currency sells, through the eth-flow
//! contract.

pub mod assembler;
pub mod cancellation;
pub mod client;
pub mod config;
pub mod error;
pub mod eth_flow;
pub mod order_book;
pub mod post_trade;
pub mod registry;
pub mod signer;
pub mod signing;
pub mod transactions;

pub use {
    assembler::{LimitTradeParameters, QuoteResult, TradeParameters, Validity},
    client::{QuotedTrade, TradingClient},
    config::Configuration,
    error::{Error, ErrorKind},
    eth_flow::EthFlowTransaction,
    order_book::{OrderBook, OrderBookApi, OrderBookError},
    post_trade::{
        OrderPostingResult,
        PostTradeOptions,
        post_cow_protocol_trade,
        post_limit_order,
        post_sell_native_currency_order,
        post_trade,
    },
    registry::ClientRegistry,
    signer::{LocalSigner, Signer, SignerError, Transaction},
    signing::{generate_order_id, sign_cancellation, sign_cancellations, sign_order},
};
