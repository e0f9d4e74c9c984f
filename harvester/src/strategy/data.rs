//! Outcome of a harvesting cycle

use std::fmt;

use alloy_primitives::{B256, U256};

use crate::{types::Action, utils::error::HarvesterError};

/// Step of the cycle a failure happened in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    PoolCount,
    PendingReward { pid: u64 },
    Harvest { pid: u64 },
    BalanceRead,
    Stake,
    VaultDeposit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::PoolCount => write!(f, "pool count"),
            Stage::PendingReward { pid } => write!(f, "pending reward of pool {}", pid),
            Stage::Harvest { pid } => write!(f, "harvest of pool {}", pid),
            Stage::BalanceRead => write!(f, "balance read"),
            Stage::Stake => write!(f, "stake"),
            Stage::VaultDeposit => write!(f, "vault deposit"),
        }
    }
}

/// A confirmed state-changing call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmedAction {
    pub action: Action,
    pub transaction_hash: B256,
    pub block_number: u64,
}

/// Everything a cycle did, reported to the scheduler
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Number of pools the farm reported
    pub pool_count: u64,
    /// Harvest transactions, in pool order
    pub harvested: Vec<ConfirmedAction>,
    /// Pools left alone together with their pending reward
    pub skipped: Vec<(u64, U256)>,
    /// Staking or vault deposit of this cycle, if any
    pub staked: Option<ConfirmedAction>,
    pub failures: Vec<(Stage, HarvesterError)>,
}

impl CycleReport {
    /// Records a harvest.
    pub fn harvested(&mut self, confirmed: ConfirmedAction) -> &mut Self {
        self.harvested.push(confirmed);
        self
    }

    /// Records a pool under its threshold.
    pub fn skipped(&mut self, pid: u64, pending: U256) -> &mut Self {
        self.skipped.push((pid, pending));
        self
    }

    /// Records the staking transaction.
    pub fn staked(&mut self, confirmed: ConfirmedAction) -> &mut Self {
        self.staked = Some(confirmed);
        self
    }

    /// Records a failure.
    pub fn failed(&mut self, stage: Stage, error: HarvesterError) -> &mut Self {
        self.failures.push((stage, error));
        self
    }

    /// Returns `true` when any step of the cycle failed
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Number of transactions confirmed during the cycle
    pub fn transaction_count(&self) -> usize {
        self.harvested.len() + usize::from(self.staked.is_some())
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pools, {} harvested, {} below threshold, {}, {} failures",
            self.pool_count,
            self.harvested.len(),
            self.skipped.len(),
            match &self.staked {
                Some(confirmed) => confirmed.action.to_string(),
                None => "nothing staked".to_string(),
            },
            self.failures.len()
        )
    }
}
