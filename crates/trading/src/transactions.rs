//! Transactions traders send to the settlement contract and to tokens.

use {
    crate::{error::Error, signer::Transaction, signing},
    alloy::{
        primitives::{Address, Bytes, U256},
        sol_types::SolCall,
    },
    contracts::{
        alloy::{ERC20, GPv2Settlement},
        deployments,
    },
    model::order::OrderUid,
};

/// Gas limit for settlement contract calls.
pub const GAS_LIMIT_DEFAULT: u64 = 150_000;

/// Approves the pre-signed order `order_uid`. Must be sent by the order
/// owner.
pub fn pre_sign_transaction(order_uid: &OrderUid, chain_id: u64) -> Result<Transaction, Error> {
    let call = GPv2Settlement::setPreSignatureCall {
        orderUid: Bytes::copy_from_slice(&order_uid.0),
        signed: true,
    };
    Ok(Transaction {
        to: signing::settlement_contract(chain_id)?,
        data: call.abi_encode().into(),
        value: U256::ZERO,
        gas_limit: GAS_LIMIT_DEFAULT,
    })
}

/// Cancels `order_uid` on chain. Unlike an off-chain cancellation this can
/// not be front-run by a settlement that already includes the order.
pub fn invalidation_transaction(order_uid: &OrderUid, chain_id: u64) -> Result<Transaction, Error> {
    let call = GPv2Settlement::invalidateOrderCall {
        orderUid: Bytes::copy_from_slice(&order_uid.0),
    };
    Ok(Transaction {
        to: signing::settlement_contract(chain_id)?,
        data: call.abi_encode().into(),
        value: U256::ZERO,
        gas_limit: GAS_LIMIT_DEFAULT,
    })
}

/// Allows the vault relayer to spend `amount` of `token` for the sender.
pub fn approve_transaction(token: Address, amount: U256, chain_id: u64) -> Result<Transaction, Error> {
    let spender = deployments::vault_relayer(chain_id).ok_or(Error::UnsupportedChain(chain_id))?;
    let call = ERC20::approveCall { spender, amount };
    Ok(Transaction {
        to: token,
        data: call.abi_encode().into(),
        value: U256::ZERO,
        gas_limit: GAS_LIMIT_DEFAULT,
    })
}

#[cfg(test)]
mod tests {
    use {super::*, contracts::alloy::networks::MAINNET};

    #[test]
    fn pre_sign() {
        let uid = OrderUid([0x11; 56]);
        let tx = pre_sign_transaction(&uid, MAINNET).unwrap();
        assert_eq!(tx.to, deployments::SETTLEMENT);
        assert_eq!(tx.value, U256::ZERO);
        let call = GPv2Settlement::setPreSignatureCall::abi_decode(&tx.data).unwrap();
        assert_eq!(call.orderUid.as_ref(), uid.0.as_slice());
        assert!(call.signed);
        assert!(pre_sign_transaction(&uid, 5).is_err());
    }

    #[test]
    fn invalidation() {
        let uid = OrderUid([0x22; 56]);
        let tx = invalidation_transaction(&uid, MAINNET).unwrap();
        assert_eq!(tx.to, deployments::SETTLEMENT);
        let call = GPv2Settlement::invalidateOrderCall::abi_decode(&tx.data).unwrap();
        assert_eq!(call.orderUid.as_ref(), uid.0.as_slice());
    }

    #[test]
    fn approve() {
        let token = Address::repeat_byte(0x01);
        let tx = approve_transaction(token, U256::MAX, MAINNET).unwrap();
        assert_eq!(tx.to, token);
        let call = ERC20::approveCall::abi_decode(&tx.data).unwrap();
        assert_eq!(call.spender, deployments::VAULT_RELAYER);
        assert_eq!(call.amount, U256::MAX);
    }
}
