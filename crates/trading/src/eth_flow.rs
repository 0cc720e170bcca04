//! Orders selling the chain's native currency. These are placed by the user
//! sending the native currency to the eth-flow contract, which then owns an
//! order selling the wrapped token and authorizes it through EIP-1271.

use {
    crate::{
        error::Error,
        order_book::{OrderBook, OrderBookError},
        signer::Transaction,
        signing,
    },
    alloy::{
        primitives::{Address, B256, U256},
        sol_types::SolCall,
    },
    contracts::{
        Env,
        alloy::{CoWSwapEthFlow, EthFlowOrder},
        deployments,
    },
    model::order::{Order, OrderData, OrderUid},
};

/// Gas limit used for eth-flow transactions before the safety margin.
pub const GAS_LIMIT_DEFAULT: u64 = 150_000;

/// Pads a gas amount by 20% for variable execution costs.
pub fn gas_with_margin(gas: u64) -> u64 {
    gas.saturating_add(gas / 5)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EthFlowTransaction {
    /// Uid of the order the contract will own once the transaction is mined.
    pub order_id: OrderUid,
    /// The order as the user sees it, after collision adjustments.
    pub order_to_sign: OrderData,
    pub transaction: Transaction,
}

pub fn eth_flow_contract(chain_id: u64, env: Env) -> Result<Address, Error> {
    deployments::eth_flow(chain_id, env).ok_or(Error::UnsupportedChain(chain_id))
}

/// The order the eth-flow contract places on behalf of the user: it sells
/// the wrapped native token and never expires on its own, the user's expiry
/// is enforced by the contract.
pub fn contract_order(order: &OrderData, chain_id: u64) -> Result<OrderData, Error> {
    let wrapped = deployments::wrapped_native_token(chain_id).ok_or(Error::UnsupportedChain(chain_id))?;
    Ok(OrderData {
        sell_token: wrapped,
        valid_to: u32::MAX,
        ..order.clone()
    })
}

/// Finds a uid for `order` that does not exist in the order book yet.
///
/// Identical eth-flow orders share one uid because the contract is their
/// owner. On a collision the buy amount is lowered by one atom until the uid
/// is unique; the sell amount stays untouched so the user never pays more.
/// Returns the uid together with the adjusted order.
pub async fn calculate_unique_order_id(
    chain_id: u64,
    env: Env,
    order: &OrderData,
    order_book: &dyn OrderBook,
) -> Result<(OrderUid, OrderData), Error> {
    let owner = eth_flow_contract(chain_id, env)?;
    let mut order = order.clone();
    loop {
        let (order_id, _) =
            signing::generate_order_id(chain_id, &contract_order(&order, chain_id)?, owner)?;
        match order_book.get_order(&order_id).await {
            Err(OrderBookError::NotFound) => return Ok((order_id, order)),
            Err(err) => return Err(err.into()),
            Ok(_) => {
                tracing::warn!(%order_id, buy_amount = %order.buy_amount, "eth-flow order id collision");
                order.buy_amount = order
                    .buy_amount
                    .checked_sub(U256::from(1))
                    .ok_or(Error::Arithmetic("eth-flow buy amount"))?;
            }
        }
    }
}

fn eth_flow_order_data(order: &OrderData, quote_id: i64) -> EthFlowOrder::Data {
    EthFlowOrder::Data {
        buyToken: order.buy_token,
        receiver: order.receiver.unwrap_or_default(),
        sellAmount: order.sell_amount,
        buyAmount: order.buy_amount,
        appData: B256::from(order.app_data),
        feeAmount: order.fee_amount,
        validTo: order.valid_to,
        partiallyFillable: order.partially_fillable,
        quoteId: quote_id,
    }
}

/// Builds the `createOrder` transaction for `order_to_sign`. The value sent
/// is the sell amount.
pub async fn get_eth_flow_transaction(
    order_to_sign: &OrderData,
    quote_id: i64,
    chain_id: u64,
    env: Env,
    gas_limit: u64,
    order_book: &dyn OrderBook,
) -> Result<EthFlowTransaction, Error> {
    let contract = eth_flow_contract(chain_id, env)?;
    let (order_id, order_to_sign) =
        calculate_unique_order_id(chain_id, env, order_to_sign, order_book).await?;

    let call = CoWSwapEthFlow::createOrderCall {
        order: eth_flow_order_data(&order_to_sign, quote_id),
    };
    let transaction = Transaction {
        to: contract,
        data: call.abi_encode().into(),
        value: order_to_sign.sell_amount,
        gas_limit: gas_with_margin(gas_limit),
    };
    Ok(EthFlowTransaction {
        order_id,
        order_to_sign,
        transaction,
    })
}

/// Builds the `invalidateOrder` transaction that cancels an eth-flow order
/// and refunds the user.
pub fn invalidation_transaction(
    order: &Order,
    chain_id: u64,
    env: Env,
    gas_limit: u64,
) -> Result<Transaction, Error> {
    let ethflow_data = order
        .metadata
        .ethflow_data
        .as_ref()
        .ok_or_else(|| Error::InvalidTrade(format!("{} is not an eth-flow order", order.metadata.uid)))?;
    let valid_to = u32::try_from(ethflow_data.user_valid_to)
        .map_err(|_| Error::InvalidTrade("eth-flow validTo out of range".to_string()))?;
    let mut data = OrderData {
        valid_to,
        receiver: Some(order.data.receiver.unwrap_or(order.metadata.owner)),
        ..order.data.clone()
    };
    data.partially_fillable = false;

    // The contract does not hash the quote id, zero is cheapest.
    let call = CoWSwapEthFlow::invalidateOrderCall {
        order: eth_flow_order_data(&data, 0),
    };
    Ok(Transaction {
        to: eth_flow_contract(chain_id, env)?,
        data: call.abi_encode().into(),
        value: U256::ZERO,
        gas_limit,
    })
}
