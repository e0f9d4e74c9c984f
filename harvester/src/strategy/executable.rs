//! The harvest/stake cycle.
//!
//! Harvest every matured pool in ascending order, let the ledger settle when a vault reads
//! the balance next, then stake what was realized. One request is in flight at a time and
//! a failure only costs the step it happened in.

use tokio::time::sleep;

use crate::{
    gateway::LedgerGateway,
    journal::{JournalCollection, LogType},
    state::HarvesterContext,
    types::Action,
    utils::{
        common::format_amount, error::HarvesterResult,
        transaction_builder::TransactionBuilder,
    },
};

use super::data::{ConfirmedAction, CycleReport, Stage};

pub struct HarvestStrategy<'a, G> {
    context: &'a HarvesterContext<G>,
}

impl<'a, G: LedgerGateway> HarvestStrategy<'a, G> {
    pub fn new(context: &'a HarvesterContext<G>) -> Self {
        Self { context }
    }

    /// Runs one full cycle. Step failures are journaled and collected in the report.
    pub async fn execute(&self, journal: &mut JournalCollection) -> CycleReport {
        let mut report = CycleReport::default();

        self.harvest(journal, &mut report).await;

        let settings = &self.context.settings;
        if settings.vault_integration_enabled() {
            journal.append_note(
                Ok(()),
                LogType::Info,
                format!(
                    "Waiting {}s for the harvested balance to settle.",
                    settings.settle_delay.as_secs()
                ),
            );
            sleep(settings.settle_delay).await;
        }

        self.stake(journal, &mut report).await;

        report
    }

    /// Harvest phase
    async fn harvest(&self, journal: &mut JournalCollection, report: &mut CycleReport) {
        let monitor = self.context.monitor();
        let policy = &self.context.settings.policy;

        let pool_count = match monitor.pool_count().await {
            Ok(count) => count,
            Err(err) => {
                report.failed(Stage::PoolCount, err.clone());
                journal.append_note(
                    Err(err),
                    LogType::Info,
                    "Could not read the pool count. Skipping the harvest phase.",
                );
                return;
            }
        };
        report.pool_count = pool_count;
        journal.append_note(
            Ok(()),
            LogType::Info,
            format!("The farm has {} pools.", pool_count),
        );

        for pid in 0..pool_count {
            if policy.is_skipped(pid) {
                journal.append_note(Ok(()), LogType::Decision, format!("Pool {} is skipped.", pid));
                continue;
            }

            let pending = match monitor.pending_reward(pid).await {
                Ok(pending) => pending,
                Err(err) => {
                    report.failed(Stage::PendingReward { pid }, err.clone());
                    journal.append_note(
                        Err(err),
                        LogType::Decision,
                        format!("Could not read the pending reward of pool {}.", pid),
                    );
                    continue;
                }
            };

            if !policy.is_harvestable(pid, pending) {
                report.skipped(pid, pending);
                journal.append_note(
                    Ok(()),
                    LogType::Decision,
                    format!(
                        "Pool {} has {} pending, not above {}.",
                        pid,
                        format_amount(pending),
                        format_amount(policy.threshold_for(pid))
                    ),
                );
                continue;
            }

            journal.append_note(
                Ok(()),
                LogType::Decision,
                format!("Pool {} has {} pending, harvesting.", pid, format_amount(pending)),
            );
            match self.dispatch(journal, policy.harvest_action(pid)).await {
                Ok(confirmed) => {
                    report.harvested(confirmed);
                }
                Err(err) => {
                    report.failed(Stage::Harvest { pid }, err);
                }
            }
        }
    }

    /// Staking phase
    async fn stake(&self, journal: &mut JournalCollection, report: &mut CycleReport) {
        let settings = &self.context.settings;
        let monitor = self.context.monitor();
        let mut primary_submitted = false;

        if settings.staking.enabled {
            match monitor.token_balance(settings.reward_token).await {
                Ok(balance) if balance > settings.staking.min_stake => {
                    let action = match settings.active_compounding_vault() {
                        Some(vault) => Action::VaultDepositAll {
                            vault: vault.address,
                        },
                        None => Action::EnterStaking { amount: balance },
                    };
                    journal.append_note(
                        Ok(()),
                        LogType::Decision,
                        format!("Reward balance is {}, staking.", format_amount(balance)),
                    );
                    primary_submitted = true;
                    match self.dispatch(journal, action).await {
                        Ok(confirmed) => {
                            report.staked(confirmed);
                        }
                        Err(err) => {
                            report.failed(Stage::Stake, err);
                        }
                    }
                }
                Ok(balance) => journal.append_note(
                    Ok(()),
                    LogType::Decision,
                    format!(
                        "Reward balance is {}, not above {}.",
                        format_amount(balance),
                        format_amount(settings.staking.min_stake)
                    ),
                ),
                Err(err) => {
                    report.failed(Stage::BalanceRead, err.clone());
                    journal.append_note(
                        Err(err),
                        LogType::Decision,
                        "Could not read the reward token balance.",
                    );
                }
            }
        }

        let Some(vault) = settings.active_secondary_vault() else {
            return;
        };
        if primary_submitted {
            journal.append_note(
                Ok(()),
                LogType::Decision,
                "The primary staking path ran this cycle. Leaving the secondary vault alone.",
            );
            return;
        }

        match monitor.token_balance(vault.want_token).await {
            Ok(balance) if balance > vault.min_stake => {
                journal.append_note(
                    Ok(()),
                    LogType::Decision,
                    format!(
                        "Want token balance is {}, depositing into vault {}.",
                        format_amount(balance),
                        vault.address
                    ),
                );
                let action = Action::VaultDeposit {
                    vault: vault.address,
                    amount: balance,
                };
                match self.dispatch(journal, action).await {
                    Ok(confirmed) => {
                        report.staked(confirmed);
                    }
                    Err(err) => {
                        report.failed(Stage::VaultDeposit, err);
                    }
                }
            }
            Ok(balance) => journal.append_note(
                Ok(()),
                LogType::Decision,
                format!(
                    "Want token balance is {}, not above {}.",
                    format_amount(balance),
                    format_amount(vault.min_stake)
                ),
            ),
            Err(err) => {
                report.failed(Stage::BalanceRead, err.clone());
                journal.append_note(
                    Err(err),
                    LogType::Decision,
                    "Could not read the want token balance.",
                );
            }
        }
    }

    /// Builds a fresh envelope for `action` and executes it
    async fn dispatch(
        &self,
        journal: &mut JournalCollection,
        action: Action,
    ) -> HarvesterResult<ConfirmedAction> {
        let result = self.submit(&action).await;
        match &result {
            Ok(confirmed) => journal.append_note(
                Ok(()),
                LogType::Transaction,
                format!(
                    "{} confirmed in block {} ({}).",
                    action, confirmed.block_number, confirmed.transaction_hash
                ),
            ),
            Err(err) => journal.append_note(
                Err(err.clone()),
                LogType::Transaction,
                format!("{} failed.", action),
            ),
        }
        result
    }

    async fn submit(&self, action: &Action) -> HarvesterResult<ConfirmedAction> {
        let context = self.context;
        let transactions = &context.settings.transactions;

        let envelope = TransactionBuilder::for_action(action, context.settings.farm)
            .gas_limit(transactions.gas_limit)
            .chain_id(context.chain_id)
            .prepare(
                &context.gateway,
                context.credential.address(),
                &transactions.gas_price,
            )
            .await?
            .build();
        let receipt = context.executor().execute(envelope).await?;

        Ok(ConfirmedAction {
            action: action.clone(),
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        })
    }
}
