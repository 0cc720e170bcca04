//! Bindings for the contracts the trading flow talks to directly.

pub mod networks {
    pub const MAINNET: u64 = 1;
    pub const BNB: u64 = 56;
    pub const GNOSIS: u64 = 100;
    pub const POLYGON: u64 = 137;
    pub const LENS: u64 = 232;
    pub const BASE: u64 = 8453;
    pub const PLASMA: u64 = 9745;
    pub const ARBITRUM_ONE: u64 = 42161;
    pub const AVALANCHE: u64 = 43114;
    pub const LINEA: u64 = 59144;
    pub const SEPOLIA: u64 = 11155111;
}

alloy::sol! {
    #[allow(missing_docs)]
    library EthFlowOrder {
        #[derive(Debug, PartialEq, Eq)]
        struct Data {
            address buyToken;
            address receiver;
            uint256 sellAmount;
            uint256 buyAmount;
            bytes32 appData;
            uint256 feeAmount;
            uint32 validTo;
            bool partiallyFillable;
            int64 quoteId;
        }
    }

    #[allow(missing_docs)]
    interface CoWSwapEthFlow {
        function createOrder(EthFlowOrder.Data calldata order) external payable returns (bytes32 orderHash);
        function invalidateOrder(EthFlowOrder.Data calldata order) external;
    }

    #[allow(missing_docs)]
    interface GPv2Settlement {
        function setPreSignature(bytes calldata orderUid, bool signed) external;
        function invalidateOrder(bytes calldata orderUid) external;
    }

    #[allow(missing_docs)]
    interface ERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
