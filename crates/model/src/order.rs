//! Contains the order type as described by the settlement contract with
//! serialization as described by the order book API.

use {
    crate::{
        DomainSeparator,
        hashed_eip712_message,
        signature::{EcdsaSignature, EcdsaSigningScheme, Signature},
    },
    alloy::primitives::{Address, B256, Bytes, U256, keccak256},
    anyhow::{Result, anyhow},
    app_data::AppDataHash,
    hex_literal::hex,
    number::serialization::HexOrDecimalU256,
    serde::{Deserialize, Deserializer, Serialize, Serializer},
    serde_with::serde_as,
    strum::{AsRefStr, EnumString},
    time::OffsetDateTime,
};
pub use app_data::OrderUid;

/// The flag denoting that an order is buying ETH (or the chain's native token).
/// It is used in place of an actual buy token address in an order.
pub const BUY_ETH_ADDRESS: Address = Address::new([0xee; 20]);

/// Solidity shapes of the signed structs, used to hand orders to typed-data
/// signers.
pub mod eip712 {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq, serde::Serialize)]
        struct Order {
            address sellToken;
            address buyToken;
            address receiver;
            uint256 sellAmount;
            uint256 buyAmount;
            uint32 validTo;
            bytes32 appData;
            uint256 feeAmount;
            string kind;
            bool partiallyFillable;
            string sellTokenBalance;
            string buyTokenBalance;
        }

        #[derive(Debug, PartialEq, Eq, serde::Serialize)]
        struct OrderCancellations {
            bytes[] orderUids;
        }
    }
}

/// The complete order data.
///
/// These are the exact fields that get signed and verified by the settlement
/// contract.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub sell_token: Address,
    pub buy_token: Address,
    #[serde(default)]
    pub receiver: Option<Address>,
    #[serde_as(as = "HexOrDecimalU256")]
    pub sell_amount: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub buy_amount: U256,
    pub valid_to: u32,
    pub app_data: AppDataHash,
    #[serde_as(as = "HexOrDecimalU256")]
    pub fee_amount: U256,
    pub kind: OrderKind,
    pub partially_fillable: bool,
    #[serde(default)]
    pub sell_token_balance: SellTokenSource,
    #[serde(default)]
    pub buy_token_balance: BuyTokenDestination,
}

impl OrderData {
    // See <https://github.com/cowprotocol/contracts/blob/v1.1.2/src/contracts/libraries/GPv2Order.sol#L47>
    pub const TYPE_HASH: [u8; 32] =
        hex!("d5a25ba2e97094ad7d83dc28a6572da797d6b3e7fc6663bd93efb789fc17e489");

    // keccak256("erc20")
    pub const BALANCE_ERC20: [u8; 32] =
        hex!("5a28e9363bb942b639270062aa6bb295f434bcdfc42c97267bf003f272060dc9");
    // keccak256("external")
    pub const BALANCE_EXTERNAL: [u8; 32] =
        hex!("abee3b73373acd583a130924aad6dc38cfdc44ba0555ba94ce2ff63980ea0632");
    // keccak256("internal")
    pub const BALANCE_INTERNAL: [u8; 32] =
        hex!("4ac99ace14ee0a5ef932dc609df0943ab7ac16b7583634612f8dc35a4289a6ce");

    /// Returns the value of hashStruct() over the order data as defined by
    /// EIP-712.
    ///
    /// https://eips.ethereum.org/EIPS/eip-712#definition-of-hashstruct
    pub fn hash_struct(&self) -> [u8; 32] {
        let mut hash_data = [0u8; 416];
        hash_data[0..32].copy_from_slice(&Self::TYPE_HASH);
        // Some slots are not assigned (stay 0) because all values are extended to 256
        // bits.
        hash_data[44..64].copy_from_slice(self.sell_token.as_slice());
        hash_data[76..96].copy_from_slice(self.buy_token.as_slice());
        hash_data[108..128].copy_from_slice(self.receiver.unwrap_or_default().as_slice());
        hash_data[128..160].copy_from_slice(&self.sell_amount.to_be_bytes::<32>());
        hash_data[160..192].copy_from_slice(&self.buy_amount.to_be_bytes::<32>());
        hash_data[220..224].copy_from_slice(&self.valid_to.to_be_bytes());
        hash_data[224..256].copy_from_slice(&self.app_data.0);
        hash_data[256..288].copy_from_slice(&self.fee_amount.to_be_bytes::<32>());
        hash_data[288..320].copy_from_slice(match self.kind {
            OrderKind::Sell => &OrderKind::SELL,
            OrderKind::Buy => &OrderKind::BUY,
        });
        hash_data[351] = u8::from(self.partially_fillable);
        hash_data[352..384].copy_from_slice(match self.sell_token_balance {
            SellTokenSource::Erc20 => &Self::BALANCE_ERC20,
            SellTokenSource::External => &Self::BALANCE_EXTERNAL,
            SellTokenSource::Internal => &Self::BALANCE_INTERNAL,
        });
        hash_data[384..416].copy_from_slice(match self.buy_token_balance {
            BuyTokenDestination::Erc20 => &Self::BALANCE_ERC20,
            BuyTokenDestination::Internal => &Self::BALANCE_INTERNAL,
        });
        keccak256(hash_data).0
    }

    pub fn uid(&self, domain: &DomainSeparator, owner: &Address) -> OrderUid {
        OrderUid::from_parts(
            hashed_eip712_message(domain, &self.hash_struct()),
            *owner,
            self.valid_to,
        )
    }

    /// The order as a typed-data struct.
    pub fn to_eip712(&self) -> eip712::Order {
        eip712::Order {
            sellToken: self.sell_token,
            buyToken: self.buy_token,
            receiver: self.receiver.unwrap_or_default(),
            sellAmount: self.sell_amount,
            buyAmount: self.buy_amount,
            validTo: self.valid_to,
            appData: B256::from(self.app_data),
            feeAmount: self.fee_amount,
            kind: self.kind.as_ref().to_owned(),
            partiallyFillable: self.partially_fillable,
            sellTokenBalance: self.sell_token_balance.as_ref().to_owned(),
            buyTokenBalance: self.buy_token_balance.as_ref().to_owned(),
        }
    }
}

/// How the app data of a new order is communicated to the order book.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OrderCreationAppData {
    /// The full document together with the hash the order commits to. The
    /// order book rejects the order if they do not match.
    Both {
        full: String,
        expected: AppDataHash,
    },
    /// Only the hash; the document has to be known to the order book already.
    Hash { hash: AppDataHash },
    /// Only the full document; the hash is derived from it.
    Full { full: String },
}

impl Default for OrderCreationAppData {
    fn default() -> Self {
        Self::Hash {
            hash: Default::default(),
        }
    }
}

impl OrderCreationAppData {
    /// The hash the order commits to.
    pub fn hash(&self) -> AppDataHash {
        match self {
            Self::Both { expected, .. } => *expected,
            Self::Hash { hash } => *hash,
            Self::Full { full } => AppDataHash::of_full_app_data(full),
        }
    }

    pub fn full(&self) -> Option<&str> {
        match self {
            Self::Both { full, .. } | Self::Full { full } => Some(full),
            Self::Hash { .. } => None,
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppDataFields {
    app_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    app_data_hash: Option<AppDataHash>,
}

impl Serialize for OrderCreationAppData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let fields = match self {
            Self::Both { full, expected } => AppDataFields {
                app_data: full.clone(),
                app_data_hash: Some(*expected),
            },
            Self::Hash { hash } => AppDataFields {
                app_data: hash.to_string(),
                app_data_hash: None,
            },
            Self::Full { full } => AppDataFields {
                app_data: full.clone(),
                app_data_hash: None,
            },
        };
        fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OrderCreationAppData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = AppDataFields::deserialize(deserializer)?;
        Ok(match fields.app_data_hash {
            Some(expected) => Self::Both {
                full: fields.app_data,
                expected,
            },
            None => match fields.app_data.parse::<AppDataHash>() {
                Ok(hash) if fields.app_data.starts_with("0x") => Self::Hash { hash },
                _ => Self::Full {
                    full: fields.app_data,
                },
            },
        })
    }
}

/// An order as provided to the order book by a trader.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreation {
    pub sell_token: Address,
    pub buy_token: Address,
    #[serde(default)]
    pub receiver: Option<Address>,
    #[serde_as(as = "HexOrDecimalU256")]
    pub sell_amount: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub buy_amount: U256,
    pub valid_to: u32,
    #[serde_as(as = "HexOrDecimalU256")]
    pub fee_amount: U256,
    pub kind: OrderKind,
    pub partially_fillable: bool,
    #[serde(default)]
    pub sell_token_balance: SellTokenSource,
    #[serde(default)]
    pub buy_token_balance: BuyTokenDestination,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(flatten)]
    pub signature: Signature,
    #[serde(default)]
    pub quote_id: Option<i64>,
    #[serde(flatten)]
    pub app_data: OrderCreationAppData,
}

impl OrderCreation {
    pub fn new(
        data: &OrderData,
        app_data: OrderCreationAppData,
        from: Option<Address>,
        signature: Signature,
        quote_id: Option<i64>,
    ) -> Self {
        Self {
            sell_token: data.sell_token,
            buy_token: data.buy_token,
            receiver: data.receiver,
            sell_amount: data.sell_amount,
            buy_amount: data.buy_amount,
            valid_to: data.valid_to,
            fee_amount: data.fee_amount,
            kind: data.kind,
            partially_fillable: data.partially_fillable,
            sell_token_balance: data.sell_token_balance,
            buy_token_balance: data.buy_token_balance,
            from,
            signature,
            quote_id,
            app_data,
        }
    }

    /// The signed order data.
    pub fn data(&self) -> OrderData {
        OrderData {
            sell_token: self.sell_token,
            buy_token: self.buy_token,
            receiver: self.receiver,
            sell_amount: self.sell_amount,
            buy_amount: self.buy_amount,
            valid_to: self.valid_to,
            app_data: self.app_data.hash(),
            fee_amount: self.fee_amount,
            kind: self.kind,
            partially_fillable: self.partially_fillable,
            sell_token_balance: self.sell_token_balance,
            buy_token_balance: self.buy_token_balance,
        }
    }
}

/// Cancellation of multiple orders.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancellations {
    pub order_uids: Vec<OrderUid>,
}

impl OrderCancellations {
    /// The EIP-712 type hash for order cancellations. Computed with:
    /// `keccak256("OrderCancellations(bytes[] orderUids)")`.
    pub const TYPE_HASH: [u8; 32] =
        hex!("4c89efb91ae246f78d2fe68b47db2fa1444a121a4f2dc3fda7a5a408c2e3588e");

    pub fn hash_struct(&self) -> [u8; 32] {
        let mut encoded_uids = Vec::with_capacity(32 * self.order_uids.len());
        for order_uid in &self.order_uids {
            encoded_uids.extend_from_slice(keccak256(order_uid.0).as_slice());
        }

        let array_hash = keccak256(&encoded_uids);

        let mut hash_data = [0u8; 64];
        hash_data[0..32].copy_from_slice(&Self::TYPE_HASH);
        hash_data[32..64].copy_from_slice(array_hash.as_slice());
        keccak256(hash_data).0
    }

    pub fn to_eip712(&self) -> eip712::OrderCancellations {
        eip712::OrderCancellations {
            orderUids: self
                .order_uids
                .iter()
                .map(|uid| Bytes::copy_from_slice(&uid.0))
                .collect(),
        }
    }
}

/// Signed order cancellations, as sent to the order book.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrderCancellations {
    #[serde(flatten)]
    pub data: OrderCancellations,
    pub signature: EcdsaSignature,
    pub signing_scheme: EcdsaSigningScheme,
}

impl SignedOrderCancellations {
    pub fn validate(&self, domain_separator: &DomainSeparator) -> Result<Address> {
        self.signature.recover(
            self.signing_scheme,
            domain_separator,
            &self.data.hash_struct(),
        )
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    PresignaturePending,
    #[default]
    Open,
    Fulfilled,
    Cancelled,
    Expired,
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderClass {
    #[default]
    Market,
    Limit,
    Liquidity,
}

/// Extra information about orders placed through the eth-flow contract.
#[derive(Debug, PartialEq, Eq, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EthflowData {
    /// The validity the user asked for. The signed order itself is valid
    /// forever.
    pub user_valid_to: i64,
    #[serde(default)]
    pub refund_tx_hash: Option<B256>,
}

/// Order information populated by the order book.
#[serde_as]
#[derive(Eq, PartialEq, Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMetadata {
    #[serde(with = "time::serde::rfc3339")]
    pub creation_date: OffsetDateTime,
    pub owner: Address,
    pub uid: OrderUid,
    #[serde_as(as = "Option<HexOrDecimalU256>")]
    pub available_balance: Option<U256>,
    #[serde_as(as = "HexOrDecimalU256")]
    #[serde(default)]
    pub executed_buy_amount: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    #[serde(default)]
    pub executed_sell_amount: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    #[serde(default)]
    pub executed_sell_amount_before_fees: U256,
    /// Fee charged through the legacy signed fee amount.
    #[serde_as(as = "HexOrDecimalU256")]
    #[serde(default)]
    pub executed_fee_amount: U256,
    /// Fee charged by the protocol on top of `executed_fee_amount`. Older order
    /// book versions do not report it.
    #[serde_as(as = "Option<HexOrDecimalU256>")]
    pub executed_fee: Option<U256>,
    #[serde(default)]
    pub invalidated: bool,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub class: OrderClass,
    #[serde(default)]
    pub settlement_contract: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethflow_data: Option<EthflowData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onchain_user: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_app_data: Option<String>,
}

impl Default for OrderMetadata {
    fn default() -> Self {
        Self {
            creation_date: OffsetDateTime::UNIX_EPOCH,
            owner: Default::default(),
            uid: Default::default(),
            available_balance: None,
            executed_buy_amount: Default::default(),
            executed_sell_amount: Default::default(),
            executed_sell_amount_before_fees: Default::default(),
            executed_fee_amount: Default::default(),
            executed_fee: None,
            invalidated: false,
            status: Default::default(),
            class: Default::default(),
            settlement_contract: Default::default(),
            ethflow_data: None,
            onchain_user: None,
            full_app_data: None,
        }
    }
}

/// An order that is returned when querying the order book.
#[derive(Eq, PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(flatten)]
    pub metadata: OrderMetadata,
    #[serde(flatten)]
    pub data: OrderData,
    #[serde(flatten)]
    pub signature: Signature,
}

impl Order {
    /// Total fee charged so far. Fee fields the order book did not report
    /// count as zero.
    pub fn total_fee(&self) -> U256 {
        self.metadata
            .executed_fee_amount
            .saturating_add(self.metadata.executed_fee.unwrap_or_default())
    }

    /// Eth-flow orders are placed by the eth-flow contract on behalf of the
    /// user. This rewrites them to how the user sees them: selling the native
    /// token, owned by the user and expiring at the user's validity.
    pub fn with_eth_flow_normalized(mut self) -> Self {
        if let Some(ethflow) = &self.metadata.ethflow_data {
            self.data.sell_token = BUY_ETH_ADDRESS;
            self.data.valid_to = u32::try_from(ethflow.user_valid_to.max(0)).unwrap_or(u32::MAX);
            if let Some(user) = self.metadata.onchain_user {
                self.metadata.owner = user;
            }
        }
        self
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    #[default]
    Buy,
    Sell,
}

impl OrderKind {
    // keccak256("sell")
    pub const SELL: [u8; 32] =
        hex!("f3b277728b3fee749481eb3e0b3b48980dbbab78658fc419025cb16eee346775");
    // keccak256("buy")
    pub const BUY: [u8; 32] =
        hex!("6ed88e868af0a1983e3886d5f3e95a2fafbd6c3450bc229e27342283dc429ccc");

    pub fn from_contract_bytes(kind: [u8; 32]) -> Result<Self> {
        match kind {
            Self::SELL => Ok(OrderKind::Sell),
            Self::BUY => Ok(OrderKind::Buy),
            _ => Err(anyhow!("Order kind is not well defined")),
        }
    }
}

/// Source from which the sellAmount should be drawn upon order fulfillment
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SellTokenSource {
    /// Direct ERC20 allowances to the Vault relayer contract
    #[default]
    Erc20,
    /// ERC20 allowances to the Vault with GPv2 relayer approval
    Internal,
    /// Internal balances to the Vault with GPv2 relayer approval
    External,
}

/// Destination for which the buyAmount should be transferred to order's
/// receiver to upon fulfillment
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BuyTokenDestination {
    /// Pay trade proceeds as an ERC20 token transfer
    #[default]
    Erc20,
    /// Pay trade proceeds as a Vault internal balance transfer
    Internal,
}
