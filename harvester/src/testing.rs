//! In-memory ledger used by the unit tests.
//!
//! It decodes every submitted transaction, enforces nonce ordering and applies the
//! effect of the farm/vault calls to its balances, so cycles can be observed end to end.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Mutex,
};

use alloy::{
    consensus::TxEnvelope,
    eips::eip2718::Decodable2718,
};
use alloy_primitives::{keccak256, Address, TxKind, B256, U256};
use alloy_sol_types::{sol, SolCall, SolValue};
use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    gateway::LedgerGateway,
    types::{Action, IMasterChef, IVault, TransactionReceipt, IERC20},
    utils::{
        common::parse_amount,
        error::{HarvesterError, HarvesterResult},
    },
};

sol!(
    function pendingDrugs(uint256 _pid, address _user) external view returns (uint256);
);

fn selector_of(data: &[u8]) -> [u8; 4] {
    data.get(..4)
        .and_then(|selector| selector.try_into().ok())
        .unwrap_or_default()
}

/// A transaction accepted by the fake ledger
#[derive(Clone, Debug)]
pub struct SubmittedTx {
    pub hash: B256,
    pub nonce: u64,
    pub to: Address,
    pub action: Action,
    pub at: Instant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    BalanceRead(Address),
    Submitted(Action),
}

#[derive(Default)]
struct LedgerState {
    pending: Vec<U256>,
    failing_pools: BTreeSet<u64>,
    pool_count_fails: bool,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    vault_tokens: HashMap<Address, Address>,
    nonce: u64,
    inclusion_delay: u32,
    lookups: HashMap<B256, u32>,
    unknown_lookups: u32,
    known_lookups: HashMap<B256, u32>,
    reverts: bool,
    drops: bool,
    rejects: bool,
    submitted: Vec<SubmittedTx>,
    events: Vec<(Instant, LedgerEvent)>,
}

pub struct FakeLedger {
    state: Mutex<LedgerState>,
}

impl FakeLedger {
    pub const CHAIN_ID: u64 = 56;
    pub const GAS_PRICE: u128 = 5_000_000_000;

    pub fn farm() -> Address {
        Address::repeat_byte(0xfa)
    }

    pub fn reward_token() -> Address {
        Address::repeat_byte(0xdd)
    }

    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Pending rewards per pool, as decimal token quantities
    pub fn with_pending(self, rewards: &[&str]) -> Self {
        self.state.lock().unwrap().pending =
            rewards.iter().map(|r| parse_amount(r).unwrap()).collect();
        self
    }

    pub fn with_balance(self, token: Address, amount: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(token, parse_amount(amount).unwrap());
        self
    }

    pub fn with_allowance(self, token: Address, spender: Address, amount: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((token, spender), parse_amount(amount).unwrap());
        self
    }

    /// Registers the token a vault pulls on deposit
    pub fn with_vault(self, vault: Address, token: Address) -> Self {
        self.state.lock().unwrap().vault_tokens.insert(vault, token);
        self
    }

    pub fn with_failing_pool(self, pid: u64) -> Self {
        self.state.lock().unwrap().failing_pools.insert(pid);
        self
    }

    pub fn with_failing_pool_count(self) -> Self {
        self.state.lock().unwrap().pool_count_fails = true;
        self
    }

    /// Number of receipt lookups answered with "pending" before inclusion
    pub fn with_inclusion_delay(self, lookups: u32) -> Self {
        self.state.lock().unwrap().inclusion_delay = lookups;
        self
    }

    /// Number of `transaction_known` lookups answered with "unknown" for a fresh hash
    pub fn with_unknown_lookups(self, lookups: u32) -> Self {
        self.state.lock().unwrap().unknown_lookups = lookups;
        self
    }

    pub fn with_reverts(self) -> Self {
        self.state.lock().unwrap().reverts = true;
        self
    }

    pub fn with_dropped_transactions(self) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.drops = true;
            state.inclusion_delay = u32::MAX;
        }
        self
    }

    pub fn with_rejected_submissions(self) -> Self {
        self.state.lock().unwrap().rejects = true;
        self
    }

    pub fn submitted(&self) -> Vec<SubmittedTx> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn submitted_actions(&self) -> Vec<Action> {
        self.submitted().into_iter().map(|tx| tx.action).collect()
    }

    pub fn events(&self) -> Vec<(Instant, LedgerEvent)> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn balance(&self, token: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&token)
            .copied()
            .unwrap_or_default()
    }

    fn decode_action(to: Address, input: &[u8]) -> HarvesterResult<Action> {
        let unknown = |_| HarvesterError::Submission("unknown call".to_string());
        let selector = selector_of(input);

        if selector == IMasterChef::leaveStakingCall::SELECTOR {
            Ok(Action::LeaveStaking)
        } else if selector == IMasterChef::depositCall::SELECTOR {
            let call = IMasterChef::depositCall::abi_decode(input, true).map_err(unknown)?;
            Ok(Action::HarvestPool {
                pid: call._pid.to::<u64>(),
            })
        } else if selector == IMasterChef::enterStakingCall::SELECTOR {
            let call = IMasterChef::enterStakingCall::abi_decode(input, true).map_err(unknown)?;
            Ok(Action::EnterStaking {
                amount: call._amount,
            })
        } else if selector == IVault::depositCall::SELECTOR {
            let call = IVault::depositCall::abi_decode(input, true).map_err(unknown)?;
            Ok(Action::VaultDeposit {
                vault: to,
                amount: call._amount,
            })
        } else if selector == IVault::depositAllCall::SELECTOR {
            Ok(Action::VaultDepositAll { vault: to })
        } else {
            Err(HarvesterError::Submission("unknown call".to_string()))
        }
    }

    fn apply(state: &mut LedgerState, action: &Action) {
        let reward_token = Self::reward_token();
        match action {
            Action::LeaveStaking | Action::HarvestPool { .. } => {
                let pid = match action {
                    Action::HarvestPool { pid } => *pid as usize,
                    _ => 0,
                };
                if let Some(pending) = state.pending.get_mut(pid) {
                    let harvested = std::mem::take(pending);
                    *state.balances.entry(reward_token).or_default() += harvested;
                }
            }
            Action::EnterStaking { amount } => {
                let balance = state.balances.entry(reward_token).or_default();
                *balance = balance.saturating_sub(*amount);
            }
            Action::VaultDeposit { vault, amount } => {
                let token = state.vault_tokens.get(vault).copied().unwrap_or(reward_token);
                let balance = state.balances.entry(token).or_default();
                *balance = balance.saturating_sub(*amount);
            }
            Action::VaultDepositAll { vault } => {
                let token = state.vault_tokens.get(vault).copied().unwrap_or(reward_token);
                state.balances.insert(token, U256::ZERO);
            }
        }
    }
}

#[async_trait]
impl LedgerGateway for FakeLedger {
    async fn call(&self, to: Address, data: Vec<u8>) -> HarvesterResult<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        let selector = selector_of(&data);

        if selector == IMasterChef::poolLengthCall::SELECTOR {
            if state.pool_count_fails {
                return Err(HarvesterError::Transport("poolLength unavailable".to_string()));
            }
            return Ok(U256::from(state.pending.len()).abi_encode());
        }
        if selector == pendingDrugsCall::SELECTOR {
            let call = pendingDrugsCall::abi_decode(&data, true)
                .map_err(|err| HarvesterError::DecodingError(err.to_string()))?;
            let pid = call._pid.to::<u64>();
            if state.failing_pools.contains(&pid) {
                return Err(HarvesterError::RpcResponse {
                    code: -32000,
                    message: "execution reverted".to_string(),
                });
            }
            let pending = state.pending.get(pid as usize).copied().unwrap_or_default();
            return Ok(pending.abi_encode());
        }
        if selector == IERC20::balanceOfCall::SELECTOR {
            state
                .events
                .push((Instant::now(), LedgerEvent::BalanceRead(to)));
            let balance = state.balances.get(&to).copied().unwrap_or_default();
            return Ok(balance.abi_encode());
        }
        if selector == IERC20::allowanceCall::SELECTOR {
            let call = IERC20::allowanceCall::abi_decode(&data, true)
                .map_err(|err| HarvesterError::DecodingError(err.to_string()))?;
            let allowance = state
                .allowances
                .get(&(to, call.spender))
                .copied()
                .unwrap_or_default();
            return Ok(allowance.abi_encode());
        }
        Err(HarvesterError::RpcResponse {
            code: -32000,
            message: "execution reverted".to_string(),
        })
    }

    async fn nonce(&self, _address: Address) -> HarvesterResult<u64> {
        Ok(self.state.lock().unwrap().nonce)
    }

    async fn gas_price(&self) -> HarvesterResult<u128> {
        Ok(Self::GAS_PRICE)
    }

    async fn chain_id(&self) -> HarvesterResult<u64> {
        Ok(Self::CHAIN_ID)
    }

    async fn send_raw_transaction(&self, raw: Vec<u8>) -> HarvesterResult<B256> {
        let mut state = self.state.lock().unwrap();
        if state.rejects {
            return Err(HarvesterError::Submission("insufficient funds".to_string()));
        }

        let envelope = TxEnvelope::decode_2718(&mut raw.as_slice())
            .map_err(|err| HarvesterError::Submission(err.to_string()))?;
        let TxEnvelope::Legacy(signed) = envelope else {
            return Err(HarvesterError::Submission("unexpected transaction type".to_string()));
        };
        let tx = signed.tx();
        if tx.nonce != state.nonce {
            return Err(HarvesterError::Submission(format!(
                "nonce mismatch: expected {}, got {}",
                state.nonce, tx.nonce
            )));
        }
        let TxKind::Call(to) = tx.to else {
            return Err(HarvesterError::Submission("contract creation".to_string()));
        };

        let action = Self::decode_action(to, &tx.input)?;
        let hash = keccak256(&raw);
        state.nonce += 1;
        if !state.reverts {
            Self::apply(&mut state, &action);
        }
        let now = Instant::now();
        state
            .events
            .push((now, LedgerEvent::Submitted(action.clone())));
        state.submitted.push(SubmittedTx {
            hash,
            nonce: tx.nonce,
            to,
            action,
            at: now,
        });
        Ok(hash)
    }

    async fn receipt(&self, hash: B256) -> HarvesterResult<Option<TransactionReceipt>> {
        let mut state = self.state.lock().unwrap();
        let Some(index) = state.submitted.iter().position(|tx| tx.hash == hash) else {
            return Ok(None);
        };
        let inclusion_delay = state.inclusion_delay;
        let lookups = state.lookups.entry(hash).or_default();
        *lookups += 1;
        if *lookups <= inclusion_delay {
            return Ok(None);
        }

        Ok(Some(TransactionReceipt {
            transaction_hash: hash,
            status: !state.reverts,
            block_number: 100 + index as u64,
            block_hash: keccak256(hash),
            gas_used: 50_000,
        }))
    }

    async fn transaction_known(&self, hash: B256) -> HarvesterResult<bool> {
        let mut state = self.state.lock().unwrap();
        let unknown_lookups = state.unknown_lookups;
        let lookups = state.known_lookups.entry(hash).or_default();
        *lookups += 1;
        if *lookups <= unknown_lookups {
            return Ok(false);
        }
        Ok(!state.drops && state.submitted.iter().any(|tx| tx.hash == hash))
    }
}
