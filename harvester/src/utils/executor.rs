//! Signs, submits and confirms transaction envelopes

use std::time::Duration;

use alloy_primitives::{B256, U256};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::{
    constants::DROPPED_AFTER_UNKNOWN_LOOKUPS, gateway::LedgerGateway, types::TransactionReceipt,
};

use super::{
    common::format_amount,
    error::{HarvesterError, HarvesterResult},
    gas::transaction_fee,
    signer::Credential,
    transaction_builder::TransactionEnvelope,
};

/// Executes envelopes one at a time for a single credential
pub struct TransactionExecutor<'a, G: ?Sized> {
    gateway: &'a G,
    credential: &'a Credential,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl<'a, G: LedgerGateway + ?Sized> TransactionExecutor<'a, G> {
    pub fn new(
        gateway: &'a G,
        credential: &'a Credential,
        receipt_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            gateway,
            credential,
            receipt_timeout,
            poll_interval,
        }
    }

    /// Signs and submits the envelope, then waits for its receipt.
    /// A receipt with a failed status is returned as `HarvesterError::Reverted`.
    pub async fn execute(&self, envelope: TransactionEnvelope) -> HarvesterResult<TransactionReceipt> {
        info!(
            label = %envelope.label,
            to = %envelope.to,
            nonce = envelope.nonce,
            gas_limit = envelope.gas_limit,
            gas_price = envelope.gas_price,
            "signing and sending transaction"
        );

        let signed = self.credential.sign(&envelope)?;
        let tx_hash = self.gateway.send_raw_transaction(signed.raw).await?;
        if tx_hash != signed.hash {
            warn!(expected = %signed.hash, reported = %tx_hash, "the node reported an unexpected transaction hash");
        }
        info!(%tx_hash, "transaction submitted");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        let fee = transaction_fee(receipt.gas_used, envelope.gas_price)?;
        info!(
            %tx_hash,
            status = receipt.status,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            fee = %format_amount(U256::from(fee)),
            block_hash = %receipt.block_hash,
            "transaction confirmed"
        );

        if !receipt.status {
            return Err(HarvesterError::Reverted(tx_hash));
        }
        Ok(receipt)
    }

    /// Polls for the receipt until it shows up, the ledger forgets the transaction, or the bound elapses.
    /// Nodes behind a load balancer may not have seen the hash yet, so it is only
    /// reported dropped after several unknown lookups in a row.
    async fn wait_for_receipt(&self, tx_hash: B256) -> HarvesterResult<TransactionReceipt> {
        let started = Instant::now();
        let mut unknown_lookups = 0;
        loop {
            if let Some(receipt) = self.gateway.receipt(tx_hash).await? {
                return Ok(receipt);
            }
            if self.gateway.transaction_known(tx_hash).await? {
                unknown_lookups = 0;
            } else {
                unknown_lookups += 1;
                warn!(%tx_hash, unknown_lookups, "the node does not know the transaction");
                if unknown_lookups >= DROPPED_AFTER_UNKNOWN_LOOKUPS {
                    return Err(HarvesterError::Dropped(tx_hash));
                }
            }
            if started.elapsed() >= self.receipt_timeout {
                return Err(HarvesterError::ConfirmationTimeout {
                    hash: tx_hash,
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::FakeLedger,
        types::Action,
        utils::{signer::tests::test_credential, transaction_builder::TransactionBuilder},
    };

    fn envelope(nonce: u64) -> TransactionEnvelope {
        TransactionBuilder::for_action(&Action::HarvestPool { pid: 1 }, FakeLedger::farm())
            .nonce(nonce)
            .gas_price(1_000_000_000)
            .chain_id(FakeLedger::CHAIN_ID)
            .build()
    }

    fn executor<'a>(ledger: &'a FakeLedger, credential: &'a Credential) -> TransactionExecutor<'a, FakeLedger> {
        TransactionExecutor::new(
            ledger,
            credential,
            Duration::from_secs(60),
            Duration::from_secs(2),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn returns_the_success_receipt() {
        let ledger = FakeLedger::new();
        let credential = test_credential();

        let receipt = executor(&ledger, &credential).execute(envelope(0)).await.unwrap();

        assert!(receipt.status);
        let submitted = ledger.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].hash, receipt.transaction_hash);
        assert_eq!(submitted[0].action, Action::HarvestPool { pid: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_late_inclusion() {
        let ledger = FakeLedger::new().with_inclusion_delay(3);
        let credential = test_credential();
        let started = Instant::now();

        let receipt = executor(&ledger, &credential).execute(envelope(0)).await.unwrap();

        assert!(receipt.status);
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_receipts_are_errors() {
        let ledger = FakeLedger::new().with_reverts();
        let credential = test_credential();

        let result = executor(&ledger, &credential).execute(envelope(0)).await;

        assert!(matches!(result, Err(HarvesterError::Reverted(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_transactions_time_out() {
        let ledger = FakeLedger::new().with_inclusion_delay(u32::MAX);
        let credential = test_credential();

        let result = executor(&ledger, &credential).execute(envelope(0)).await;

        match result {
            Err(HarvesterError::ConfirmationTimeout { waited_secs, .. }) => {
                assert!(waited_secs >= 60)
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_transactions_are_reported() {
        let ledger = FakeLedger::new().with_dropped_transactions();
        let credential = test_credential();
        let started = Instant::now();

        let result = executor(&ledger, &credential).execute(envelope(0)).await;

        assert!(matches!(result, Err(HarvesterError::Dropped(_))));
        let polls = u64::from(DROPPED_AFTER_UNKNOWN_LOOKUPS - 1);
        assert!(started.elapsed() >= Duration::from_secs(2 * polls));
    }

    #[tokio::test(start_paused = true)]
    async fn briefly_unknown_transactions_are_still_confirmed() {
        let ledger = FakeLedger::new()
            .with_inclusion_delay(DROPPED_AFTER_UNKNOWN_LOOKUPS)
            .with_unknown_lookups(DROPPED_AFTER_UNKNOWN_LOOKUPS - 1);
        let credential = test_credential();

        let receipt = executor(&ledger, &credential).execute(envelope(0)).await.unwrap();

        assert!(receipt.status);
        assert_eq!(ledger.submitted()[0].hash, receipt.transaction_hash);
    }

    #[tokio::test(start_paused = true)]
    async fn submission_errors_propagate() {
        let ledger = FakeLedger::new().with_rejected_submissions();
        let credential = test_credential();

        let result = executor(&ledger, &credential).execute(envelope(0)).await;

        assert!(matches!(result, Err(HarvesterError::Submission(_))));
        assert!(ledger.submitted().is_empty());
    }
}
