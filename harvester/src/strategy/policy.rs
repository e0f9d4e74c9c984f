//! Harvest thresholds and the pool to action mapping

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::U256;

use crate::{constants::AUTO_COMPOUNDING_POOL, types::Action};

/// Decides which pools are worth a transaction and how each one is harvested
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThresholdPolicy {
    /// Pending reward a pool must strictly exceed to be harvested
    pub min_pool_harvest: U256,
    /// Per-pool overrides of `min_pool_harvest`
    pub pool_thresholds: BTreeMap<u64, U256>,
    /// Pools never harvested
    pub skip_pools: BTreeSet<u64>,
    /// Staking pools harvested through `leaveStaking(0)` instead of `deposit(pid, 0)`.
    /// Settings only accept the auto-compounding pool here.
    pub distinguished_pools: BTreeSet<u64>,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            min_pool_harvest: U256::ZERO,
            pool_thresholds: BTreeMap::new(),
            skip_pools: BTreeSet::new(),
            distinguished_pools: BTreeSet::from([AUTO_COMPOUNDING_POOL]),
        }
    }
}

impl ThresholdPolicy {
    pub fn new(min_pool_harvest: U256) -> Self {
        Self {
            min_pool_harvest,
            ..Default::default()
        }
    }

    pub fn threshold_for(&self, pid: u64) -> U256 {
        self.pool_thresholds
            .get(&pid)
            .copied()
            .unwrap_or(self.min_pool_harvest)
    }

    pub fn is_skipped(&self, pid: u64) -> bool {
        self.skip_pools.contains(&pid)
    }

    /// Returns `true` if the pending reward is strictly above the pool's threshold
    pub fn is_harvestable(&self, pid: u64, pending: U256) -> bool {
        !self.is_skipped(pid) && pending > self.threshold_for(pid)
    }

    /// The call that claims the pool's pending reward
    pub fn harvest_action(&self, pid: u64) -> Action {
        if self.distinguished_pools.contains(&pid) {
            Action::LeaveStaking
        } else {
            Action::HarvestPool { pid }
        }
    }
}
