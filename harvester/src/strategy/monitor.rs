//! Read-only queries against the farm and its tokens

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;

use crate::{
    gateway::LedgerGateway,
    types::{PendingRewardQuery, IERC20, IMasterChef},
    utils::{common::decode_abi_response, error::HarvesterResult},
};

/// Reads the account's positions. Never submits anything.
pub struct PositionMonitor<'a, G: ?Sized> {
    gateway: &'a G,
    farm: Address,
    account: Address,
    pending_reward: &'a PendingRewardQuery,
}

impl<'a, G: LedgerGateway + ?Sized> PositionMonitor<'a, G> {
    pub fn new(
        gateway: &'a G,
        farm: Address,
        account: Address,
        pending_reward: &'a PendingRewardQuery,
    ) -> Self {
        Self {
            gateway,
            farm,
            account,
            pending_reward,
        }
    }

    /// Number of pools registered in the farm
    pub async fn pool_count(&self) -> HarvesterResult<u64> {
        let data = IMasterChef::poolLengthCall {}.abi_encode();
        let response = self.gateway.call(self.farm, data).await?;
        let length = decode_abi_response::<_, IMasterChef::poolLengthCall>(&response)?;
        Ok(length._0.saturating_to::<u64>())
    }

    /// Reward accrued by the account in pool `pid`, in smallest units
    pub async fn pending_reward(&self, pid: u64) -> HarvesterResult<U256> {
        let data = self.pending_reward.encode(pid, self.account);
        let response = self.gateway.call(self.farm, data).await?;
        PendingRewardQuery::decode(&response)
    }

    /// The account's balance of `token`
    pub async fn token_balance(&self, token: Address) -> HarvesterResult<U256> {
        let data = IERC20::balanceOfCall {
            account: self.account,
        }
        .abi_encode();
        let response = self.gateway.call(token, data).await?;
        let balance = decode_abi_response::<_, IERC20::balanceOfCall>(&response)?;
        Ok(balance._0)
    }

    /// What `spender` may still pull from the account's `token`
    pub async fn allowance(&self, token: Address, spender: Address) -> HarvesterResult<U256> {
        let data = IERC20::allowanceCall {
            owner: self.account,
            spender,
        }
        .abi_encode();
        let response = self.gateway.call(token, data).await?;
        let allowance = decode_abi_response::<_, IERC20::allowanceCall>(&response)?;
        Ok(allowance._0)
    }
}
