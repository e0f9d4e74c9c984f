//! Harvest settings, read once at startup and immutable for the rest of the run

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    time::Duration,
};

use alloy_primitives::{Address, U256};
use serde::Deserialize;

use crate::{
    constants::*,
    types::PendingRewardQuery,
    utils::{
        common::{parse_amount, string_to_address},
        error::{HarvesterError, HarvesterResult},
        gas::GasPricePolicy,
    },
};

use super::policy::ThresholdPolicy;

/// A token quantity as written in the settings document: a YAML number or a decimal string
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl Default for AmountInput {
    fn default() -> Self {
        AmountInput::Number(0.0)
    }
}

impl AmountInput {
    /// Smallest-unit value of the quantity
    pub fn to_wei(&self) -> HarvesterResult<U256> {
        match self {
            AmountInput::Number(value) if !value.is_finite() => Err(HarvesterError::Config(
                format!("`{}` is not a valid token amount", value),
            )),
            AmountInput::Number(value) => parse_amount(&value.to_string()),
            AmountInput::Text(text) => parse_amount(text),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StakingInput {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub min_stake: AmountInput,
}

/// Staking runs every cycle unless the document turns it off
impl Default for StakingInput {
    fn default() -> Self {
        Self {
            enabled: enabled_by_default(),
            min_stake: AmountInput::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompoundingVaultInput {
    pub address: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecondaryVaultInput {
    pub address: String,
    /// Token pulled by the vault. Defaults to the reward token.
    pub want_token: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub min_stake: AmountInput,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionInput {
    pub gas_limit: Option<u64>,
    /// Fixed gas price. The network estimate is used when absent.
    pub gas_price_gwei: Option<u64>,
    pub receipt_timeout_seconds: Option<u64>,
    pub receipt_poll_interval_seconds: Option<u64>,
    pub rpc_timeout_seconds: Option<u64>,
}

/// The settings document as written by the operator
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarvesterConfig {
    pub web3_endpoint: String,
    pub chain_id: Option<u64>,
    pub farm_address: String,
    pub reward_token_address: String,
    pub pending_reward_method: Option<String>,
    pub sleep_time_seconds: Option<u64>,
    pub settle_delay_seconds: Option<u64>,
    pub min_pool_harvest: AmountInput,
    #[serde(default)]
    pub pool_thresholds: BTreeMap<u64, AmountInput>,
    #[serde(default)]
    pub skip_pools: BTreeSet<u64>,
    /// Only the auto-compounding pool may be listed, `leaveStaking` claims nothing else
    pub distinguished_pools: Option<BTreeSet<u64>>,
    #[serde(default)]
    pub staking: StakingInput,
    pub compounding_vault: Option<CompoundingVaultInput>,
    pub secondary_vault: Option<SecondaryVaultInput>,
    #[serde(default)]
    pub transactions: TransactionInput,
    pub max_consecutive_failures: Option<u32>,
}

fn enabled_by_default() -> bool {
    true
}

/// Staking of the reward token into the farm (or the compounding vault)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakingSettings {
    pub enabled: bool,
    pub min_stake: U256,
}

impl Default for StakingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_stake: U256::ZERO,
        }
    }
}

/// Vault taking the whole reward-token balance with `depositAll()`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompoundingVaultSettings {
    pub address: Address,
    pub enabled: bool,
}

/// Vault fed with an exact want-token amount through `deposit(amount)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecondaryVaultSettings {
    pub address: Address,
    pub want_token: Address,
    pub enabled: bool,
    pub min_stake: U256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionSettings {
    pub gas_limit: u64,
    pub gas_price: GasPricePolicy,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub rpc_timeout: Duration,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: GasPricePolicy::Network,
            receipt_timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECONDS),
            receipt_poll_interval: Duration::from_secs(DEFAULT_RECEIPT_POLL_INTERVAL_SECONDS),
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECONDS),
        }
    }
}

/// Validated settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarvestSettings {
    /// JSON-RPC endpoint of the ledger
    pub rpc_url: String,
    /// Fetched from the ledger when not configured
    pub chain_id: Option<u64>,
    /// Farm contract address
    pub farm: Address,
    /// Token paid out as reward and staked back
    pub reward_token: Address,
    /// Encoder of the farm's pending reward view
    pub pending_reward: PendingRewardQuery,
    /// Harvest thresholds and pool roles
    pub policy: ThresholdPolicy,
    pub staking: StakingSettings,
    pub compounding_vault: Option<CompoundingVaultSettings>,
    pub secondary_vault: Option<SecondaryVaultSettings>,
    pub transactions: TransactionSettings,
    /// Pause between two cycles
    pub sleep_time: Duration,
    /// Wait between the harvest phase and the staking balance read when a vault is in use
    pub settle_delay: Duration,
    /// Consecutive failing cycles before the scheduler halts. `0` never halts.
    pub max_consecutive_failures: u32,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            chain_id: None,
            farm: Address::ZERO,
            reward_token: Address::ZERO,
            pending_reward: PendingRewardQuery::default(),
            policy: ThresholdPolicy::default(),
            staking: StakingSettings::default(),
            compounding_vault: None,
            secondary_vault: None,
            transactions: TransactionSettings::default(),
            sleep_time: Duration::from_secs(DEFAULT_SLEEP_TIME_SECONDS),
            settle_delay: Duration::from_secs(DEFAULT_SETTLE_DELAY_SECONDS),
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl HarvestSettings {
    /// Reads and validates the YAML settings document at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> HarvesterResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            HarvesterError::Config(format!("Could not read {}: {}", path.display(), err))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> HarvesterResult<Self> {
        let config: HarvesterConfig = serde_yaml::from_str(content)
            .map_err(|err| HarvesterError::Config(err.to_string()))?;
        config.try_into()
    }

    /// Sets the farm contract address.
    pub fn farm(&mut self, farm: Address) -> &mut Self {
        self.farm = farm;
        self
    }

    /// Sets the reward token address.
    pub fn reward_token(&mut self, reward_token: Address) -> &mut Self {
        self.reward_token = reward_token;
        self
    }

    /// Sets the threshold policy.
    pub fn policy(&mut self, policy: ThresholdPolicy) -> &mut Self {
        self.policy = policy;
        self
    }

    /// Sets the primary staking settings.
    pub fn staking(&mut self, enabled: bool, min_stake: U256) -> &mut Self {
        self.staking = StakingSettings { enabled, min_stake };
        self
    }

    /// Sets the compounding vault.
    pub fn compounding_vault(&mut self, vault: Option<CompoundingVaultSettings>) -> &mut Self {
        self.compounding_vault = vault;
        self
    }

    /// Sets the secondary vault.
    pub fn secondary_vault(&mut self, vault: Option<SecondaryVaultSettings>) -> &mut Self {
        self.secondary_vault = vault;
        self
    }

    /// Sets the settling delay.
    pub fn settle_delay(&mut self, settle_delay: Duration) -> &mut Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Sets the pause between cycles.
    pub fn sleep_time(&mut self, sleep_time: Duration) -> &mut Self {
        self.sleep_time = sleep_time;
        self
    }

    /// Sets the failure escalation bound.
    pub fn max_consecutive_failures(&mut self, max: u32) -> &mut Self {
        self.max_consecutive_failures = max;
        self
    }

    /// The compounding vault, if it takes part in this run
    pub fn active_compounding_vault(&self) -> Option<&CompoundingVaultSettings> {
        self.compounding_vault.as_ref().filter(|vault| vault.enabled)
    }

    /// The secondary vault, if it takes part in this run
    pub fn active_secondary_vault(&self) -> Option<&SecondaryVaultSettings> {
        self.secondary_vault.as_ref().filter(|vault| vault.enabled)
    }

    /// Returns `true` when a vault will read balances right after the harvest phase
    pub fn vault_integration_enabled(&self) -> bool {
        self.active_compounding_vault().is_some() || self.active_secondary_vault().is_some()
    }

    /// (token, spender) pairs that need a non-zero allowance before the loop starts
    pub fn required_allowances(&self) -> Vec<(Address, Address)> {
        let mut allowances = vec![];
        if self.staking.enabled {
            let spender = match self.active_compounding_vault() {
                Some(vault) => vault.address,
                None => self.farm,
            };
            allowances.push((self.reward_token, spender));
        }
        if let Some(vault) = self.active_secondary_vault() {
            allowances.push((vault.want_token, vault.address));
        }
        allowances
    }
}

impl TryFrom<HarvesterConfig> for HarvestSettings {
    type Error = HarvesterError;

    fn try_from(value: HarvesterConfig) -> Result<Self, Self::Error> {
        let address = |field: &str, input: &str| {
            string_to_address(input).map_err(|_| {
                HarvesterError::Config(format!("`{}` is not a valid address for {}", input, field))
            })
        };

        if value.web3_endpoint.trim().is_empty() {
            return Err(HarvesterError::Config(
                "web3_endpoint must not be empty".to_string(),
            ));
        }

        let farm = address("farm_address", &value.farm_address)?;
        let reward_token = address("reward_token_address", &value.reward_token_address)?;
        let pending_reward = PendingRewardQuery::new(
            value
                .pending_reward_method
                .as_deref()
                .unwrap_or(DEFAULT_PENDING_REWARD_METHOD),
        )?;

        let distinguished_pools = value
            .distinguished_pools
            .unwrap_or_else(|| BTreeSet::from([AUTO_COMPOUNDING_POOL]));
        if let Some(pid) = distinguished_pools
            .iter()
            .find(|pid| **pid != AUTO_COMPOUNDING_POOL)
        {
            return Err(HarvesterError::Config(format!(
                "pool {} cannot be distinguished, leaveStaking only claims pool {}",
                pid, AUTO_COMPOUNDING_POOL
            )));
        }

        let pool_thresholds = value
            .pool_thresholds
            .iter()
            .map(|(pid, amount)| Ok((*pid, amount.to_wei()?)))
            .collect::<HarvesterResult<BTreeMap<_, _>>>()?;
        let policy = ThresholdPolicy {
            min_pool_harvest: value.min_pool_harvest.to_wei()?,
            pool_thresholds,
            skip_pools: value.skip_pools,
            distinguished_pools,
        };

        let compounding_vault = value
            .compounding_vault
            .map(|vault| {
                Ok::<_, HarvesterError>(CompoundingVaultSettings {
                    address: address("compounding_vault.address", &vault.address)?,
                    enabled: vault.enabled,
                })
            })
            .transpose()?;

        let secondary_vault = value
            .secondary_vault
            .map(|vault| {
                let want_token = match vault.want_token.as_deref() {
                    Some(token) => address("secondary_vault.want_token", token)?,
                    None => reward_token,
                };
                Ok::<_, HarvesterError>(SecondaryVaultSettings {
                    address: address("secondary_vault.address", &vault.address)?,
                    want_token,
                    enabled: vault.enabled,
                    min_stake: vault.min_stake.to_wei()?,
                })
            })
            .transpose()?;

        let tx = value.transactions;
        let gas_limit = tx.gas_limit.unwrap_or(DEFAULT_GAS_LIMIT);
        if gas_limit == 0 {
            return Err(HarvesterError::Config(
                "transactions.gas_limit must be positive".to_string(),
            ));
        }
        let transactions = TransactionSettings {
            gas_limit,
            gas_price: GasPricePolicy::from_gwei(tx.gas_price_gwei),
            receipt_timeout: Duration::from_secs(
                tx.receipt_timeout_seconds
                    .unwrap_or(DEFAULT_RECEIPT_TIMEOUT_SECONDS),
            ),
            receipt_poll_interval: Duration::from_secs(
                tx.receipt_poll_interval_seconds
                    .unwrap_or(DEFAULT_RECEIPT_POLL_INTERVAL_SECONDS)
                    .max(1),
            ),
            rpc_timeout: Duration::from_secs(
                tx.rpc_timeout_seconds.unwrap_or(DEFAULT_RPC_TIMEOUT_SECONDS),
            ),
        };

        Ok(Self {
            rpc_url: value.web3_endpoint,
            chain_id: value.chain_id,
            farm,
            reward_token,
            pending_reward,
            policy,
            staking: StakingSettings {
                enabled: value.staking.enabled,
                min_stake: value.staking.min_stake.to_wei()?,
            },
            compounding_vault,
            secondary_vault,
            transactions,
            sleep_time: Duration::from_secs(
                value.sleep_time_seconds.unwrap_or(DEFAULT_SLEEP_TIME_SECONDS),
            ),
            settle_delay: Duration::from_secs(
                value
                    .settle_delay_seconds
                    .unwrap_or(DEFAULT_SETTLE_DELAY_SECONDS),
            ),
            max_consecutive_failures: value
                .max_consecutive_failures
                .unwrap_or(DEFAULT_MAX_CONSECUTIVE_FAILURES),
        })
    }
}
