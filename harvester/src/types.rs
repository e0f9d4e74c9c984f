use std::fmt;

use alloy_primitives::{keccak256, utils::format_ether, Address, B256, U256};
use alloy_sol_types::{sol, SolCall, SolValue};

use crate::{
    constants::DEFAULT_PENDING_REWARD_METHOD,
    utils::error::{decoding_err, HarvesterError, HarvesterResult},
};

// Farm (MasterChef style) contract
sol!(
    interface IMasterChef {
        function poolLength() external view returns (uint256);
        function leaveStaking(uint256 _amount) external;
        function deposit(uint256 _pid, uint256 _amount) external;
        function enterStaking(uint256 _amount) external;
    }
);

// Reward and want tokens
sol!(
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
    }
);

// Yield vaults
sol!(
    interface IVault {
        function deposit(uint256 _amount) external;
        function depositAll() external;
    }
);

/// A state changing contract call the harvester knows how to submit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Harvests the auto-compounding staking pool by leaving it with a zero amount
    LeaveStaking,
    /// Harvests a regular pool by depositing nothing into it
    HarvestPool { pid: u64 },
    /// Stakes the reward token into the farm's staking pool
    EnterStaking { amount: U256 },
    /// Deposits an exact amount into a vault
    VaultDeposit { vault: Address, amount: U256 },
    /// Deposits the whole want-token balance into a vault
    VaultDepositAll { vault: Address },
}

impl Action {
    /// Contract the call is addressed to
    pub fn target(&self, farm: Address) -> Address {
        match self {
            Action::LeaveStaking | Action::HarvestPool { .. } | Action::EnterStaking { .. } => {
                farm
            }
            Action::VaultDeposit { vault, .. } | Action::VaultDepositAll { vault } => *vault,
        }
    }

    /// ABI encoded call data
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Action::LeaveStaking => IMasterChef::leaveStakingCall {
                _amount: U256::ZERO,
            }
            .abi_encode(),
            Action::HarvestPool { pid } => IMasterChef::depositCall {
                _pid: U256::from(*pid),
                _amount: U256::ZERO,
            }
            .abi_encode(),
            Action::EnterStaking { amount } => {
                IMasterChef::enterStakingCall { _amount: *amount }.abi_encode()
            }
            Action::VaultDeposit { amount, .. } => {
                IVault::depositCall { _amount: *amount }.abi_encode()
            }
            Action::VaultDepositAll { .. } => IVault::depositAllCall {}.abi_encode(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::LeaveStaking => write!(f, "leaveStaking(0)"),
            Action::HarvestPool { pid } => write!(f, "deposit({}, 0)", pid),
            Action::EnterStaking { amount } => {
                write!(f, "enterStaking({})", format_ether(*amount))
            }
            Action::VaultDeposit { vault, amount } => {
                write!(f, "vault {} deposit({})", vault, format_ether(*amount))
            }
            Action::VaultDepositAll { vault } => write!(f, "vault {} depositAll()", vault),
        }
    }
}

/// Encoder for the farm's pending reward view.
/// Farms name it after their token (`pendingCake`, `pendingDrugs`, ...), the arguments never change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRewardQuery {
    signature: String,
    selector: [u8; 4],
}

impl PendingRewardQuery {
    pub fn new(method: &str) -> HarvesterResult<Self> {
        let valid = method
            .chars()
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
            && method.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(HarvesterError::Config(format!(
                "`{}` is not a valid contract method name",
                method
            )));
        }

        Ok(Self::from_method(method))
    }

    fn from_method(method: &str) -> Self {
        let signature = format!("{}(uint256,address)", method);
        let hash = keccak256(signature.as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash[..4]);

        Self {
            signature,
            selector,
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    /// Call data asking for `account`'s pending reward in pool `pid`
    pub fn encode(&self, pid: u64, account: Address) -> Vec<u8> {
        let mut data = self.selector.to_vec();
        data.extend((U256::from(pid), account).abi_encode_params());
        data
    }

    pub fn decode(data: &[u8]) -> HarvesterResult<U256> {
        <U256 as SolValue>::abi_decode(data, false).map_err(decoding_err)
    }
}

impl Default for PendingRewardQuery {
    fn default() -> Self {
        Self::from_method(DEFAULT_PENDING_REWARD_METHOD)
    }
}

/// Ledger confirmed outcome of a submitted transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    /// `true` when the transaction executed successfully
    pub status: bool,
    pub block_number: u64,
    pub block_hash: B256,
    pub gas_used: u128,
}
