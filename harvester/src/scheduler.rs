//! Startup checks and the polling loop

use std::future::Future;

use alloy_primitives::U256;
use tokio::time::sleep;
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    gateway::LedgerGateway,
    halt::{Halt, HaltStatus},
    journal::{JournalCollection, LogType},
    state::HarvesterContext,
    strategy::{data::CycleReport, executable::HarvestStrategy},
    utils::{
        common::format_amount,
        error::{HarvesterError, HarvesterResult},
    },
};

/// Fails with `Precondition` when a staking target may not pull the tokens it will be handed
pub async fn ensure_allowances<G: LedgerGateway>(
    context: &HarvesterContext<G>,
) -> HarvesterResult<()> {
    let monitor = context.monitor();
    let mut journal = JournalCollection::open(None);

    for (token, spender) in context.settings.required_allowances() {
        let allowance = monitor.allowance(token, spender).await?;
        if allowance == U256::ZERO {
            let err = HarvesterError::Precondition(format!(
                "{} has no allowance on token {}",
                spender, token
            ));
            journal.append_note(Err(err.clone()), LogType::Info, "Allowance check failed.");
            return Err(err);
        }
        journal.append_note(
            Ok(()),
            LogType::Info,
            format!(
                "{} may spend {} of token {}.",
                spender,
                format_amount(allowance),
                token
            ),
        );
    }
    Ok(())
}

/// Runs cycle number `cycle` and logs its summary
pub async fn run_once<G: LedgerGateway>(context: &HarvesterContext<G>, cycle: u64) -> CycleReport {
    let mut journal = JournalCollection::open(Some(cycle));
    let report = HarvestStrategy::new(context)
        .execute(&mut journal)
        .instrument(info_span!("cycle", cycle))
        .await;

    let elapsed_ms = journal.elapsed().as_millis() as u64;
    let transactions = report.transaction_count();
    if report.has_failures() {
        warn!(
            cycle,
            elapsed_ms,
            transactions,
            errors = journal.error_count(),
            "cycle finished with failures: {}",
            report
        );
    } else {
        info!(cycle, elapsed_ms, transactions, "cycle finished: {}", report);
    }
    report
}

/// Checks the allowances, then runs a cycle every `sleep_time` until `shutdown` resolves or
/// too many cycles fail in a row. Returns the number of cycles run.
pub async fn run<G, F>(context: &HarvesterContext<G>, shutdown: F) -> HarvesterResult<u64>
where
    G: LedgerGateway,
    F: Future<Output = ()>,
{
    ensure_allowances(context).await?;

    let mut halt = Halt::new(context.settings.max_consecutive_failures);
    let mut cycle = 0;
    tokio::pin!(shutdown);

    loop {
        cycle += 1;
        let report = run_once(context, cycle).await;

        if let HaltStatus::Halted { failing_cycles } = *halt.record(&report) {
            let message = halt.message.clone().unwrap_or_default();
            error!(failing_cycles, "halting: {}", message);
            return Err(HarvesterError::Halted(message));
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!(cycles = cycle, "shutdown requested, leaving the loop");
                return Ok(cycle);
            }
            _ = sleep(context.settings.sleep_time) => {}
        }
    }
}
