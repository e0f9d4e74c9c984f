//! Run-wide context, built once at startup and shared by reference

use tracing::info;

use crate::{
    gateway::LedgerGateway,
    strategy::{monitor::PositionMonitor, settings::HarvestSettings},
    utils::{
        error::HarvesterResult, evm_rpc::RpcGateway, executor::TransactionExecutor,
        signer::Credential,
    },
};

/// Settings, credential and ledger access of the running harvester
pub struct HarvesterContext<G = RpcGateway> {
    pub settings: HarvestSettings,
    pub credential: Credential,
    pub gateway: G,
    /// Chain id signed into every transaction
    pub chain_id: u64,
}

impl HarvesterContext<RpcGateway> {
    /// Opens the JSON-RPC gateway described by the settings
    pub async fn connect(settings: HarvestSettings, credential: Credential) -> HarvesterResult<Self> {
        let gateway = RpcGateway::new(settings.rpc_url.clone(), settings.transactions.rpc_timeout)?;
        Self::new(settings, credential, gateway).await
    }
}

impl<G: LedgerGateway> HarvesterContext<G> {
    /// Builds the context, asking the ledger for its chain id unless the settings pin one
    pub async fn new(
        settings: HarvestSettings,
        credential: Credential,
        gateway: G,
    ) -> HarvesterResult<Self> {
        let chain_id = match settings.chain_id {
            Some(chain_id) => chain_id,
            None => gateway.chain_id().await?,
        };
        info!(
            chain_id,
            account = %credential.address(),
            farm = %settings.farm,
            "harvester context ready"
        );

        Ok(Self {
            settings,
            credential,
            gateway,
            chain_id,
        })
    }

    pub fn monitor(&self) -> PositionMonitor<'_, G> {
        PositionMonitor::new(
            &self.gateway,
            self.settings.farm,
            self.credential.address(),
            &self.settings.pending_reward,
        )
    }

    pub fn executor(&self) -> TransactionExecutor<'_, G> {
        TransactionExecutor::new(
            &self.gateway,
            &self.credential,
            self.settings.transactions.receipt_timeout,
            self.settings.transactions.receipt_poll_interval,
        )
    }
}
