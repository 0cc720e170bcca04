//! Turning a trade intent and a quote into the order that gets signed.

use {
    crate::error::Error,
    alloy::primitives::{Address, U256},
    app_data::{AppDataHash, AppDataInfo},
    contracts::{Env, deployments},
    model::{
        order::{
            BUY_ETH_ADDRESS,
            BuyTokenDestination,
            OrderCreationAppData,
            OrderData,
            OrderKind,
            SellTokenSource,
        },
        quote::{self, OrderQuoteRequest, OrderQuoteResponse, OrderQuoteSide, PriceQuality, SellAmount},
        signature::SigningScheme,
    },
    number::u256_ext::{BPS_DENOMINATOR, U256Ext},
    std::time::{Duration, SystemTime},
};

/// Longest relative validity accepted for new orders.
pub const MAX_VALID_FOR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// What the caller wants to trade.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TradeParameters {
    pub kind: OrderKind,
    pub sell_token: Address,
    pub buy_token: Address,
    /// The amount the quote was requested for: the sell amount of sell orders
    /// and the buy amount of buy orders.
    pub amount: U256,
    pub slippage_bps: u32,
    /// Defaults to the owner of the order.
    pub receiver: Option<Address>,
    /// Absolute expiry as a unix timestamp. Mutually exclusive with
    /// `valid_for`.
    pub valid_to: Option<u32>,
    /// Expiry relative to the time the order is assembled.
    pub valid_for: Option<Duration>,
    pub partially_fillable: bool,
    pub env: Env,
}

impl TradeParameters {
    pub fn validate(&self) -> Result<(), Error> {
        if self.sell_token == self.buy_token {
            return Err(Error::InvalidTrade(
                "sell and buy token must differ".to_string(),
            ));
        }
        if self.amount.is_zero() {
            return Err(Error::InvalidTrade("amount must be positive".to_string()));
        }
        if u64::from(self.slippage_bps) > BPS_DENOMINATOR {
            return Err(Error::InvalidTrade(format!(
                "slippage of {} bps exceeds 100%",
                self.slippage_bps
            )));
        }
        Validity::resolve(self.valid_to, self.valid_for)?;
        Ok(())
    }

    /// Whether the trade sells the chain's native currency and therefore has
    /// to go through the eth-flow contract.
    pub fn is_native_currency_sell(&self) -> bool {
        is_native_currency(self.sell_token)
    }
}

/// The amounts the order book quoted for a trade. `sell_amount` excludes the
/// network costs in `fee_amount`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QuoteResult {
    pub sell_amount: U256,
    pub buy_amount: U256,
    pub fee_amount: U256,
    pub id: Option<i64>,
}

impl From<&OrderQuoteResponse> for QuoteResult {
    fn from(response: &OrderQuoteResponse) -> Self {
        Self {
            sell_amount: response.quote.sell_amount,
            buy_amount: response.quote.buy_amount,
            fee_amount: response.quote.fee_amount,
            id: response.id,
        }
    }
}

/// An order at a price the user picked: both amounts are signed as given.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LimitTradeParameters {
    pub kind: OrderKind,
    pub sell_token: Address,
    pub buy_token: Address,
    pub sell_amount: U256,
    pub buy_amount: U256,
    /// Defaults to the owner of the order.
    pub receiver: Option<Address>,
    pub valid_to: Option<u32>,
    pub valid_for: Option<Duration>,
    pub partially_fillable: bool,
    /// Links the order to the quote its price was derived from, if any.
    pub quote_id: Option<i64>,
}

impl LimitTradeParameters {
    pub fn validate(&self) -> Result<(), Error> {
        if self.sell_token == self.buy_token {
            return Err(Error::InvalidTrade(
                "sell and buy token must differ".to_string(),
            ));
        }
        if is_native_currency(self.sell_token) {
            return Err(Error::InvalidTrade(
                "limit orders can not sell the native currency".to_string(),
            ));
        }
        if self.sell_amount.is_zero() || self.buy_amount.is_zero() {
            return Err(Error::InvalidTrade("amounts must be positive".to_string()));
        }
        Validity::resolve(self.valid_to, self.valid_for)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Validity {
    Until(u32),
    For(Duration),
}

impl Validity {
    /// Exactly one of the two must be given.
    pub fn resolve(valid_to: Option<u32>, valid_for: Option<Duration>) -> Result<Self, Error> {
        match (valid_to, valid_for) {
            (Some(valid_to), None) => Ok(Self::Until(valid_to)),
            (None, Some(valid_for)) if valid_for.is_zero() || valid_for > MAX_VALID_FOR => Err(
                Error::InvalidValidity("validFor must be between one second and one year"),
            ),
            (None, Some(valid_for)) => Ok(Self::For(valid_for)),
            (Some(_), Some(_)) => Err(Error::InvalidValidity(
                "only one of validTo and validFor may be set",
            )),
            (None, None) => Err(Error::InvalidValidity(
                "one of validTo and validFor must be set",
            )),
        }
    }

    /// The absolute expiry for an order assembled at `now`.
    pub fn valid_to(self, now: u32) -> Result<u32, Error> {
        match self {
            Self::Until(valid_to) => Ok(valid_to),
            Self::For(valid_for) => u32::try_from(valid_for.as_secs())
                .ok()
                .and_then(|secs| now.checked_add(secs))
                .ok_or(Error::Arithmetic("validTo")),
        }
    }
}

pub fn is_native_currency(token: Address) -> bool {
    token == BUY_ETH_ADDRESS
}

/// Applies network costs and the slippage tolerance to the quoted amounts.
///
/// Orders are signed without a fee, so the network costs are added to the
/// sell amount. Sell orders then accept a lower buy amount (rounded down),
/// buy orders a higher sell amount (rounded up).
pub fn amounts_with_slippage(
    kind: OrderKind,
    quote: &QuoteResult,
    slippage_bps: u32,
) -> Result<(U256, U256), Error> {
    let slippage = u64::from(slippage_bps);
    let sell_amount = quote
        .sell_amount
        .checked_add(quote.fee_amount)
        .ok_or(Error::Arithmetic("sell amount after network costs"))?;
    match kind {
        OrderKind::Sell => {
            let factor = BPS_DENOMINATOR
                .checked_sub(slippage)
                .ok_or(Error::Arithmetic("slippage factor"))?;
            let buy_amount = quote
                .buy_amount
                .checked_mul_bps_floor(factor)
                .ok_or(Error::Arithmetic("buy amount"))?;
            Ok((sell_amount, buy_amount))
        }
        OrderKind::Buy => {
            let sell_amount = sell_amount
                .checked_mul_bps_ceil(BPS_DENOMINATOR + slippage)
                .ok_or(Error::Arithmetic("sell amount"))?;
            Ok((sell_amount, quote.buy_amount))
        }
    }
}

/// Assembles the order `from` will sign.
pub fn to_order(
    params: &TradeParameters,
    quote: &QuoteResult,
    app_data: AppDataHash,
    from: Address,
    now: u32,
) -> Result<OrderData, Error> {
    params.validate()?;
    let valid_to = Validity::resolve(params.valid_to, params.valid_for)?.valid_to(now)?;
    let (sell_amount, buy_amount) = amounts_with_slippage(params.kind, quote, params.slippage_bps)?;

    Ok(OrderData {
        sell_token: params.sell_token,
        buy_token: params.buy_token,
        receiver: Some(params.receiver.unwrap_or(from)),
        sell_amount,
        buy_amount,
        valid_to,
        app_data,
        fee_amount: U256::ZERO,
        kind: params.kind,
        partially_fillable: params.partially_fillable,
        sell_token_balance: SellTokenSource::Erc20,
        buy_token_balance: BuyTokenDestination::Erc20,
    })
}

/// Assembles a limit order. Neither slippage nor network costs are applied.
pub fn to_limit_order(
    params: &LimitTradeParameters,
    app_data: AppDataHash,
    from: Address,
    now: u32,
) -> Result<OrderData, Error> {
    params.validate()?;
    Ok(OrderData {
        sell_token: params.sell_token,
        buy_token: params.buy_token,
        receiver: Some(params.receiver.unwrap_or(from)),
        sell_amount: params.sell_amount,
        buy_amount: params.buy_amount,
        valid_to: Validity::resolve(params.valid_to, params.valid_for)?.valid_to(now)?,
        app_data,
        fee_amount: U256::ZERO,
        kind: params.kind,
        partially_fillable: params.partially_fillable,
        sell_token_balance: SellTokenSource::Erc20,
        buy_token_balance: BuyTokenDestination::Erc20,
    })
}

/// The quote request for a trade placed by `from`.
///
/// Native currency sells are quoted as sells of the wrapped token by an
/// on-chain order. Their verification gas is paid by the protocol.
pub fn quote_request(
    params: &TradeParameters,
    from: Address,
    app_data: &AppDataInfo,
    chain_id: u64,
) -> Result<OrderQuoteRequest, Error> {
    params.validate()?;
    let validity = match Validity::resolve(params.valid_to, params.valid_for)? {
        Validity::Until(valid_to) => quote::Validity::To(valid_to),
        Validity::For(valid_for) => quote::Validity::For(
            u32::try_from(valid_for.as_secs()).map_err(|_| Error::Arithmetic("validFor"))?,
        ),
    };
    let side = match params.kind {
        OrderKind::Sell => OrderQuoteSide::Sell {
            sell_amount: SellAmount::BeforeFee {
                value: params.amount,
            },
        },
        OrderKind::Buy => OrderQuoteSide::Buy {
            buy_amount_after_fee: params.amount,
        },
    };
    let mut request = OrderQuoteRequest {
        from,
        sell_token: params.sell_token,
        buy_token: params.buy_token,
        receiver: Some(params.receiver.unwrap_or(from)),
        side,
        validity,
        app_data: OrderCreationAppData::Both {
            full: app_data.full_app_data.clone(),
            expected: app_data.app_data_hex,
        },
        partially_fillable: params.partially_fillable,
        sell_token_balance: SellTokenSource::Erc20,
        buy_token_balance: BuyTokenDestination::Erc20,
        signing_scheme: SigningScheme::Eip712,
        price_quality: PriceQuality::Optimal,
        onchain_order: false,
        verification_gas_limit: None,
    };
    if params.is_native_currency_sell() {
        request.sell_token =
            deployments::wrapped_native_token(chain_id).ok_or(Error::UnsupportedChain(chain_id))?;
        request.signing_scheme = SigningScheme::Eip1271;
        request.onchain_order = true;
        request.verification_gas_limit = Some(0);
    }
    Ok(request)
}

pub fn now_in_epoch_seconds() -> u32 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| u32::try_from(elapsed.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::ErrorKind, rstest::rstest};

    const OWNER: Address = Address::repeat_byte(0xaa);

    fn params(kind: OrderKind) -> TradeParameters {
        TradeParameters {
            kind,
            sell_token: Address::repeat_byte(0x01),
            buy_token: Address::repeat_byte(0x02),
            amount: U256::from(1_000_000),
            slippage_bps: 100,
            valid_for: Some(Duration::from_secs(1800)),
            ..Default::default()
        }
    }

    fn quote() -> QuoteResult {
        QuoteResult {
            sell_amount: U256::from(1_000_000),
            buy_amount: U256::from(2_000_000),
            fee_amount: U256::ZERO,
            id: Some(42),
        }
    }

    #[rstest]
    #[case::sell(OrderKind::Sell, 1_000_000, 1_980_000)]
    #[case::buy(OrderKind::Buy, 1_010_000, 2_000_000)]
    fn slippage_rounding(#[case] kind: OrderKind, #[case] sell: u64, #[case] buy: u64) {
        let order = to_order(&params(kind), &quote(), AppDataHash::default(), OWNER, 1_000).unwrap();
        assert_eq!(order.sell_amount, U256::from(sell));
        assert_eq!(order.buy_amount, U256::from(buy));
        assert_eq!(order.kind, kind);
    }

    #[rstest]
    #[case::sell_rounds_down(OrderKind::Sell, 333, 50, 1_000, 331)]
    #[case::buy_rounds_up(OrderKind::Buy, 333, 50, 335, 1_000)]
    #[case::no_slippage(OrderKind::Sell, 333, 0, 1_000, 333)]
    fn slippage_uses_integer_rounding(
        #[case] kind: OrderKind,
        #[case] quoted: u64,
        #[case] slippage_bps: u32,
        #[case] sell: u64,
        #[case] buy: u64,
    ) {
        let quote = match kind {
            OrderKind::Sell => QuoteResult {
                sell_amount: U256::from(1_000),
                buy_amount: U256::from(quoted),
                ..Default::default()
            },
            OrderKind::Buy => QuoteResult {
                sell_amount: U256::from(quoted),
                buy_amount: U256::from(1_000),
                ..Default::default()
            },
        };
        assert_eq!(
            amounts_with_slippage(kind, &quote, slippage_bps).unwrap(),
            (U256::from(sell), U256::from(buy))
        );
    }

    #[test]
    fn large_amounts_do_not_lose_precision() {
        let amount = U256::from(10).pow(U256::from(30)) + U256::from(7);
        let quote = QuoteResult {
            sell_amount: amount,
            buy_amount: amount,
            ..Default::default()
        };
        let (_, buy) = amounts_with_slippage(OrderKind::Sell, &quote, 1).unwrap();
        assert_eq!(buy, amount * U256::from(9_999) / U256::from(10_000));

        let quote = QuoteResult {
            sell_amount: U256::MAX,
            ..Default::default()
        };
        let err = amounts_with_slippage(OrderKind::Buy, &quote, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arithmetic);
    }

    #[test]
    fn receiver_defaults_to_owner() {
        let order = to_order(&params(OrderKind::Sell), &quote(), AppDataHash::default(), OWNER, 0).unwrap();
        assert_eq!(order.receiver, Some(OWNER));

        let receiver = Address::repeat_byte(0xbb);
        let params = TradeParameters {
            receiver: Some(receiver),
            ..params(OrderKind::Sell)
        };
        let order = to_order(&params, &quote(), AppDataHash::default(), OWNER, 0).unwrap();
        assert_eq!(order.receiver, Some(receiver));
    }

    #[test]
    fn valid_to_is_relative_to_now() {
        let order = to_order(&params(OrderKind::Sell), &quote(), AppDataHash([1; 32]), OWNER, 1_000).unwrap();
        assert_eq!(order.valid_to, 2_800);
        assert_eq!(order.app_data, AppDataHash([1; 32]));

        let params = TradeParameters {
            valid_to: Some(1_234),
            valid_for: None,
            ..params(OrderKind::Sell)
        };
        let order = to_order(&params, &quote(), AppDataHash::default(), OWNER, 1_000).unwrap();
        assert_eq!(order.valid_to, 1_234);
    }

    #[rstest]
    #[case::both(Some(1_000), Some(Duration::from_secs(60)))]
    #[case::neither(None, None)]
    #[case::zero_duration(None, Some(Duration::ZERO))]
    #[case::too_long(None, Some(MAX_VALID_FOR + Duration::from_secs(1)))]
    fn invalid_validity(#[case] valid_to: Option<u32>, #[case] valid_for: Option<Duration>) {
        let params = TradeParameters {
            valid_to,
            valid_for,
            ..params(OrderKind::Sell)
        };
        let err = to_order(&params, &quote(), AppDataHash::default(), OWNER, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValidity);
    }

    #[test]
    fn valid_for_overflowing_timestamp() {
        let err = Validity::For(Duration::from_secs(10)).valid_to(u32::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arithmetic);
    }

    #[rstest]
    #[case::same_tokens(TradeParameters { buy_token: Address::repeat_byte(0x01), ..params(OrderKind::Sell) })]
    #[case::zero_amount(TradeParameters { amount: U256::ZERO, ..params(OrderKind::Sell) })]
    #[case::excessive_slippage(TradeParameters { slippage_bps: 10_001, ..params(OrderKind::Buy) })]
    fn invalid_trades(#[case] params: TradeParameters) {
        assert_eq!(params.validate().unwrap_err().kind(), ErrorKind::InvalidTrade);
    }

    #[test]
    fn detects_native_currency() {
        let native: Address = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE".parse().unwrap();
        let lowercase: Address = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee".parse().unwrap();
        assert!(is_native_currency(native));
        assert!(is_native_currency(lowercase));
        assert!(!params(OrderKind::Sell).is_native_currency_sell());
        assert!(
            TradeParameters {
                sell_token: native,
                ..params(OrderKind::Sell)
            }
            .is_native_currency_sell()
        );
    }

    #[rstest]
    #[case::sell(OrderKind::Sell, 1_010_000, 1_980_000)]
    #[case::buy(OrderKind::Buy, 1_020_100, 2_000_000)]
    fn network_costs_are_paid_from_sell_amount(
        #[case] kind: OrderKind,
        #[case] sell: u64,
        #[case] buy: u64,
    ) {
        let quote = QuoteResult {
            fee_amount: U256::from(10_000),
            ..quote()
        };
        let order = to_order(&params(kind), &quote, AppDataHash::default(), OWNER, 0).unwrap();
        assert_eq!(order.fee_amount, U256::ZERO);
        assert_eq!(order.sell_amount, U256::from(sell));
        assert_eq!(order.buy_amount, U256::from(buy));
    }

    fn limit_params() -> LimitTradeParameters {
        LimitTradeParameters {
            kind: OrderKind::Sell,
            sell_token: Address::repeat_byte(0x01),
            buy_token: Address::repeat_byte(0x02),
            sell_amount: U256::from(1_000_000),
            buy_amount: U256::from(1_999_999),
            valid_to: Some(1_800_000_000),
            partially_fillable: true,
            quote_id: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn limit_order_keeps_user_amounts() {
        let order = to_limit_order(&limit_params(), AppDataHash([2; 32]), OWNER, 0).unwrap();
        assert_eq!(order.sell_amount, U256::from(1_000_000));
        assert_eq!(order.buy_amount, U256::from(1_999_999));
        assert_eq!(order.fee_amount, U256::ZERO);
        assert_eq!(order.valid_to, 1_800_000_000);
        assert_eq!(order.receiver, Some(OWNER));
        assert_eq!(order.app_data, AppDataHash([2; 32]));
        assert!(order.partially_fillable);
    }

    #[rstest]
    #[case::same_tokens(LimitTradeParameters { buy_token: Address::repeat_byte(0x01), ..limit_params() }, ErrorKind::InvalidTrade)]
    #[case::native_sell(LimitTradeParameters { sell_token: BUY_ETH_ADDRESS, ..limit_params() }, ErrorKind::InvalidTrade)]
    #[case::zero_buy_amount(LimitTradeParameters { buy_amount: U256::ZERO, ..limit_params() }, ErrorKind::InvalidTrade)]
    #[case::no_validity(LimitTradeParameters { valid_to: None, ..limit_params() }, ErrorKind::InvalidValidity)]
    fn invalid_limit_orders(#[case] params: LimitTradeParameters, #[case] kind: ErrorKind) {
        let err = to_limit_order(&params, AppDataHash::default(), OWNER, 0).unwrap_err();
        assert_eq!(err.kind(), kind);
    }

    fn app_data_info() -> AppDataInfo {
        app_data::build_app_data_doc(
            &app_data::AppDataParams {
                app_code: "CoW Swap".to_string(),
                ..Default::default()
            },
            None,
        )
        .unwrap()
        .info()
        .unwrap()
    }

    #[test]
    fn quote_request_for_erc20_trade() {
        let info = app_data_info();
        let request =
            quote_request(&params(OrderKind::Buy), OWNER, &info, contracts::alloy::networks::MAINNET)
                .unwrap();
        assert_eq!(request.from, OWNER);
        assert_eq!(request.receiver, Some(OWNER));
        assert_eq!(request.sell_token, Address::repeat_byte(0x01));
        assert_eq!(
            request.side,
            OrderQuoteSide::Buy {
                buy_amount_after_fee: U256::from(1_000_000)
            }
        );
        assert_eq!(request.validity, quote::Validity::For(1800));
        assert_eq!(request.app_data.hash(), info.app_data_hex);
        assert_eq!(request.app_data.full(), Some(info.full_app_data.as_str()));
        assert_eq!(request.signing_scheme, SigningScheme::Eip712);
        assert!(!request.onchain_order);
    }

    #[test]
    fn quote_request_for_native_currency_sell() {
        let chain_id = contracts::alloy::networks::MAINNET;
        let params = TradeParameters {
            sell_token: BUY_ETH_ADDRESS,
            valid_to: Some(1_800_000_000),
            valid_for: None,
            ..params(OrderKind::Sell)
        };
        let request = quote_request(&params, OWNER, &app_data_info(), chain_id).unwrap();
        assert_eq!(
            Some(request.sell_token),
            deployments::wrapped_native_token(chain_id)
        );
        assert_eq!(
            request.side,
            OrderQuoteSide::Sell {
                sell_amount: SellAmount::BeforeFee {
                    value: U256::from(1_000_000)
                }
            }
        );
        assert_eq!(request.validity, quote::Validity::To(1_800_000_000));
        assert_eq!(request.signing_scheme, SigningScheme::Eip1271);
        assert!(request.onchain_order);
        assert_eq!(request.verification_gas_limit, Some(0));
    }

    #[test]
    fn quote_result_from_response() {
        let response = OrderQuoteResponse {
            quote: quote::OrderQuote {
                sell_amount: U256::from(990),
                buy_amount: U256::from(2_000),
                fee_amount: U256::from(10),
                ..Default::default()
            },
            from: OWNER,
            expiration: time::OffsetDateTime::UNIX_EPOCH,
            id: Some(5),
            verified: false,
        };
        assert_eq!(
            QuoteResult::from(&response),
            QuoteResult {
                sell_amount: U256::from(990),
                buy_amount: U256::from(2_000),
                fee_amount: U256::from(10),
                id: Some(5),
            }
        );
    }

    #[test]
    fn now_is_after_2023() {
        assert!(now_in_epoch_seconds() > 1_672_531_200);
    }
}
