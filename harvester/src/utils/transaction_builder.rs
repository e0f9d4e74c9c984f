//! Transaction builder that assembles unsigned envelopes for the harvester's actions

use alloy::consensus::TxLegacy;
use alloy_primitives::{Address, Bytes, TxKind, U256};
use tracing::debug;

use crate::{constants::DEFAULT_GAS_LIMIT, gateway::LedgerGateway, types::Action};

use super::{error::HarvesterResult, gas::GasPricePolicy};

/// Unsigned transaction, built fresh for every action and never reused
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionEnvelope {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_limit: u64,
    /// Legacy gas price in wei
    pub gas_price: u128,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
    /// Human readable description of the call, for the logs
    pub label: String,
}

impl TransactionEnvelope {
    /// The EIP-155 legacy transaction to be signed
    pub fn unsigned(&self) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit.into(),
            to: TxKind::Call(self.to),
            value: self.value,
            input: self.input.clone(),
        }
    }
}

/// Transaction builder struct
pub struct TransactionBuilder {
    to: Address,
    data: Vec<u8>,
    nonce: u64,
    gas_limit: u64,
    gas_price: u128,
    chain_id: u64,
    label: String,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self {
            to: Address::ZERO,
            data: vec![],
            nonce: 0,
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: 0,
            chain_id: 0,
            label: String::new(),
        }
    }
}

impl TransactionBuilder {
    /// Starts a builder for `action`, with the farm as the target of farm-level calls
    pub fn for_action(action: &Action, farm: Address) -> Self {
        Self::default()
            .to(action.target(farm))
            .data(action.payload())
            .label(action.to_string())
    }

    /// Sets the `to` field
    pub fn to(mut self, to: Address) -> Self {
        self.to = to;
        self
    }

    /// Sets the `data` field
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Sets the `nonce` field
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the `gas_limit` field
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Sets the `gas_price` field
    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Sets the `chain_id` field
    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Sets the `label` field
    pub fn label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    /// Fills the nonce of `from` and the gas price from the ledger.
    /// The nonce is read right before the envelope is built so that sequential submissions never collide.
    pub async fn prepare<G: LedgerGateway + ?Sized>(
        self,
        gateway: &G,
        from: Address,
        gas_price: &GasPricePolicy,
    ) -> HarvesterResult<Self> {
        let nonce = gateway.nonce(from).await?;
        let price = gas_price.resolve(gateway).await?;
        debug!(nonce, gas_price = price, label = %self.label, "prepared envelope");
        Ok(self.nonce(nonce).gas_price(price))
    }

    pub fn build(self) -> TransactionEnvelope {
        TransactionEnvelope {
            chain_id: self.chain_id,
            nonce: self.nonce,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
            to: self.to,
            value: U256::ZERO,
            input: Bytes::from(self.data),
            label: self.label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::MockLedgerGateway,
        types::IMasterChef,
        utils::error::HarvesterError,
    };
    use alloy_sol_types::SolCall;
    use mockall::predicate::eq;

    #[test]
    fn builds_the_envelope_for_a_harvest() {
        let farm = Address::repeat_byte(0x10);
        let envelope = TransactionBuilder::for_action(&Action::HarvestPool { pid: 4 }, farm)
            .nonce(9)
            .gas_price(5)
            .chain_id(56)
            .build();

        assert_eq!(envelope.to, farm);
        assert_eq!(envelope.nonce, 9);
        assert_eq!(envelope.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(envelope.value, U256::ZERO);
        assert_eq!(envelope.label, "deposit(4, 0)");
        let call = IMasterChef::depositCall::abi_decode(&envelope.input, true).unwrap();
        assert_eq!(call._pid, U256::from(4));

        let unsigned = envelope.unsigned();
        assert_eq!(unsigned.chain_id, Some(56));
        assert_eq!(unsigned.nonce, 9);
        assert_eq!(unsigned.to, TxKind::Call(farm));
    }

    #[tokio::test]
    async fn prepare_reads_nonce_and_gas_price() {
        let from = Address::repeat_byte(0x20);
        let mut gateway = MockLedgerGateway::new();
        gateway
            .expect_nonce()
            .with(eq(from))
            .times(1)
            .returning(|_| Ok(12));
        gateway
            .expect_gas_price()
            .times(1)
            .returning(|| Ok(3_000_000_000));

        let envelope = TransactionBuilder::for_action(&Action::LeaveStaking, Address::ZERO)
            .prepare(&gateway, from, &GasPricePolicy::Network)
            .await
            .unwrap()
            .build();

        assert_eq!(envelope.nonce, 12);
        assert_eq!(envelope.gas_price, 3_000_000_000);
    }

    #[tokio::test]
    async fn prepare_fails_when_the_nonce_is_unavailable() {
        let mut gateway = MockLedgerGateway::new();
        gateway
            .expect_nonce()
            .returning(|_| Err(HarvesterError::Transport("timeout".to_string())));
        gateway.expect_gas_price().never();

        let result = TransactionBuilder::for_action(&Action::LeaveStaking, Address::ZERO)
            .prepare(&gateway, Address::ZERO, &GasPricePolicy::Network)
            .await;

        assert!(matches!(result, Err(HarvesterError::Transport(_))));
    }
}
