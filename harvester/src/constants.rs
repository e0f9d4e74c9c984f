//! Harvester's Constants

use alloy_primitives::U256;

/// Scale used for fixed point token quantities
pub const SCALE: u128 = 1_000_000_000_000_000_000; // e18
pub fn scale() -> U256 {
    U256::from(SCALE)
}

/// Wei per gwei
pub const GWEI: u128 = 1_000_000_000;

/// Gas limit attached to every action. Real estimation is not performed, so it is sized generously.
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

/// Pause between two harvesting cycles
pub const DEFAULT_SLEEP_TIME_SECONDS: u64 = 3_600;

/// Wait between the harvest phase and the staking balance read when a vault is in use
pub const DEFAULT_SETTLE_DELAY_SECONDS: u64 = 7;

/// Upper bound on the wait for a transaction receipt
pub const DEFAULT_RECEIPT_TIMEOUT_SECONDS: u64 = 180;

/// Interval between two receipt lookups
pub const DEFAULT_RECEIPT_POLL_INTERVAL_SECONDS: u64 = 2;

/// Consecutive lookups a submitted hash must be unknown to the node before it counts as dropped
pub const DROPPED_AFTER_UNKNOWN_LOOKUPS: u32 = 3;

/// HTTP timeout of a single JSON-RPC request
pub const DEFAULT_RPC_TIMEOUT_SECONDS: u64 = 30;

/// Consecutive failing cycles tolerated before the scheduler halts
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Name of the farm's pending reward view. Its signature is `(uint256,address)`.
pub const DEFAULT_PENDING_REWARD_METHOD: &str = "pendingDrugs";

/// The farm's own staking pool, harvested by leaving the stake with a zero amount
pub const AUTO_COMPOUNDING_POOL: u64 = 0;

/// Default location of the settings document
pub const DEFAULT_CONFIG_PATH: &str = "./harvester.yaml";

/// Environment variable holding the hex encoded private key
pub const ACCOUNT_PRIVATE_KEY_ENV: &str = "ACCOUNT_PRIVATE_KEY";

/// Optional environment variable that must match the key's address when set
pub const ACCOUNT_ADDRESS_ENV: &str = "ACCOUNT_ADDRESS";
