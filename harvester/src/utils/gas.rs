//! Gas price selection for submitted transactions

use crate::{constants::GWEI, gateway::LedgerGateway};

use super::error::{arithmetic_err, HarvesterResult};

/// Where the gas price of an envelope comes from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GasPricePolicy {
    /// Always pay this many wei per gas
    Fixed(u128),
    /// Ask the node for its current estimate right before building each envelope
    #[default]
    Network,
}

impl GasPricePolicy {
    /// Builds the policy from an optional gwei setting. `None` means the network estimate.
    pub fn from_gwei(gwei: Option<u64>) -> Self {
        match gwei {
            Some(gwei) => GasPricePolicy::Fixed(u128::from(gwei) * GWEI),
            None => GasPricePolicy::Network,
        }
    }

    /// Returns the gas price in wei
    pub async fn resolve<G: LedgerGateway + ?Sized>(&self, gateway: &G) -> HarvesterResult<u128> {
        match self {
            GasPricePolicy::Fixed(price) => Ok(*price),
            GasPricePolicy::Network => gateway.gas_price().await,
        }
    }
}

/// Fee paid by a transaction, in wei
pub fn transaction_fee(gas_used: u128, gas_price: u128) -> HarvesterResult<u128> {
    gas_used
        .checked_mul(gas_price)
        .ok_or_else(|| arithmetic_err("The transaction fee calculation overflowed."))
}
