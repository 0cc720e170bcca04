//! Entry point tying configuration, app data and the order book together.

use {
    crate::{
        assembler::{self, LimitTradeParameters, QuoteResult, TradeParameters},
        cancellation,
        config::Configuration,
        error::Error,
        order_book::OrderBook,
        post_trade::{self, OrderPostingResult, PostTradeOptions},
        registry::ClientRegistry,
        signer::Signer,
    },
    alloy::primitives::{Address, B256},
    app_data::{AppDataDoc, AppDataParams, OrderClassKind, build_app_data_doc},
    contracts::Env,
    model::{
        order::{Order, OrderUid},
        quote::OrderQuoteResponse,
        signature::{EcdsaSigningScheme, SigningScheme},
    },
    serde_json::Value,
    std::sync::Arc,
};

/// A quoted trade, ready to be posted with the app data it was quoted with.
#[derive(Clone, Debug)]
pub struct QuotedTrade {
    pub params: TradeParameters,
    pub app_data: AppDataDoc,
    pub quote: QuoteResult,
    pub response: OrderQuoteResponse,
}

/// Trades on one chain on behalf of one integrating application.
#[derive(Debug)]
pub struct TradingClient {
    registry: Arc<ClientRegistry>,
    env: Env,
    chain_id: u64,
    app_code: String,
    options: PostTradeOptions,
}

impl TradingClient {
    pub fn new(registry: Arc<ClientRegistry>, env: Env, chain_id: u64, app_code: String) -> Self {
        Self {
            registry,
            env,
            chain_id,
            app_code,
            options: PostTradeOptions::default(),
        }
    }

    pub fn from_config(config: &Configuration) -> anyhow::Result<Self> {
        let mut client = Self::new(
            Arc::new(config.registry()?),
            config.env,
            config.chain_id,
            config.app_code.clone(),
        );
        client.options.eth_flow_gas_limit = config.eth_flow.gas_limit_default;
        Ok(client)
    }

    pub fn with_signing_scheme(mut self, signing_scheme: SigningScheme) -> Self {
        self.options.signing_scheme = signing_scheme;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn order_book(&self, env: Env) -> Result<Arc<dyn OrderBook>, Error> {
        let order_book: Arc<dyn OrderBook> = self.registry.get_or_create(env, self.chain_id)?;
        Ok(order_book)
    }

    /// The app data document for a trade: the configured app code and the
    /// trade's slippage, merged with the caller's `overrides`.
    pub fn app_data_doc(
        &self,
        params: &TradeParameters,
        overrides: Option<Value>,
    ) -> Result<AppDataDoc, Error> {
        let params = AppDataParams {
            app_code: self.app_code.clone(),
            slippage_bps: params.slippage_bps,
            ..Default::default()
        };
        Ok(build_app_data_doc(&params, overrides)?)
    }

    /// The order book environment of the client applies to every call.
    /// Whatever `params.env` holds is replaced.
    fn pinned(&self, params: &TradeParameters) -> TradeParameters {
        TradeParameters {
            env: self.env,
            ..params.clone()
        }
    }

    /// Requests a quote for a trade placed by `owner`.
    pub async fn get_quote(
        &self,
        owner: Address,
        params: &TradeParameters,
        app_data_overrides: Option<Value>,
    ) -> Result<QuotedTrade, Error> {
        let params = self.pinned(params);
        let app_data = self.app_data_doc(&params, app_data_overrides)?;
        let request = assembler::quote_request(&params, owner, &app_data.info()?, self.chain_id)?;
        let response = self.order_book(self.env)?.get_quote(&request).await?;
        Ok(QuotedTrade {
            params,
            app_data,
            quote: QuoteResult::from(&response),
            response,
        })
    }

    /// Places an order for a quoted trade.
    pub async fn post_order(
        &self,
        signer: &dyn Signer,
        params: &TradeParameters,
        quote: &QuoteResult,
        app_data_overrides: Option<Value>,
    ) -> Result<OrderPostingResult, Error> {
        let params = self.pinned(params);
        let app_data = self.app_data_doc(&params, app_data_overrides)?;
        self.post_quoted(signer, &params, quote, &app_data).await
    }

    /// Quotes the trade and places the order at the quoted price.
    pub async fn post_swap_order(
        &self,
        signer: &dyn Signer,
        params: &TradeParameters,
        app_data_overrides: Option<Value>,
    ) -> Result<OrderPostingResult, Error> {
        let quoted = self
            .get_quote(signer.address(), params, app_data_overrides)
            .await?;
        self.post_quoted(signer, &quoted.params, &quoted.quote, &quoted.app_data)
            .await
    }

    async fn post_quoted(
        &self,
        signer: &dyn Signer,
        params: &TradeParameters,
        quote: &QuoteResult,
        app_data: &AppDataDoc,
    ) -> Result<OrderPostingResult, Error> {
        let order_book = self.order_book(self.env)?;
        post_trade::post_trade(
            order_book.as_ref(),
            signer,
            app_data,
            params,
            quote,
            self.chain_id,
            &self.options,
        )
        .await
    }

    /// Places a limit order at the amounts in `params`.
    pub async fn post_limit_order(
        &self,
        signer: &dyn Signer,
        params: &LimitTradeParameters,
        app_data_overrides: Option<Value>,
    ) -> Result<OrderPostingResult, Error> {
        let app_data = build_app_data_doc(
            &AppDataParams {
                app_code: self.app_code.clone(),
                order_class: OrderClassKind::Limit,
                ..Default::default()
            },
            app_data_overrides,
        )?;
        let order_book = self.order_book(self.env)?;
        post_trade::post_limit_order(
            order_book.as_ref(),
            signer,
            &app_data,
            params,
            self.chain_id,
            &self.options,
        )
        .await
    }

    pub async fn get_order(&self, uid: &OrderUid) -> Result<Order, Error> {
        Ok(self.order_book(self.env)?.get_order(uid).await?)
    }

    pub async fn cancel_orders_off_chain(
        &self,
        signer: &dyn Signer,
        order_uids: &[OrderUid],
        scheme: EcdsaSigningScheme,
    ) -> Result<(), Error> {
        let order_book = self.order_book(self.env)?;
        cancellation::cancel_orders_off_chain(
            order_book.as_ref(),
            signer,
            order_uids,
            self.chain_id,
            scheme,
        )
        .await
    }

    pub async fn cancel_order_on_chain(
        &self,
        signer: &dyn Signer,
        order_uid: &OrderUid,
    ) -> Result<B256, Error> {
        let order_book = self.order_book(self.env)?;
        cancellation::cancel_order_on_chain(
            order_book.as_ref(),
            signer,
            order_uid,
            self.chain_id,
            self.env,
        )
        .await
    }
}
