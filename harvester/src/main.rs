//! Entry point of the `farm-harvester` binary.
//!
//! Loads the settings and the credential, checks the allowances, then harvests and stakes
//! every `sleep_time_seconds` until Ctrl-C or too many failing cycles.

mod logging;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;

use farm_harvester::{
    constants::DEFAULT_CONFIG_PATH,
    scheduler,
    state::HarvesterContext,
    strategy::settings::HarvestSettings,
    utils::signer::Credential,
};

use logging::LogFormat;

/// Harvests matured farm pools and re-stakes the rewards
#[derive(Debug, Parser)]
#[command(name = "farm-harvester", version, about)]
struct Cli {
    /// Settings document
    #[arg(long, env = "HARVESTER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging("farm_harvester=info,info", cli.log_format);

    let settings = HarvestSettings::load(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;
    let credential = Credential::from_env().context("failed to load the account credential")?;

    tracing::info!(
        config = %cli.config.display(),
        account = %credential.address(),
        once = cli.once,
        "starting farm-harvester"
    );

    let context = HarvesterContext::connect(settings, credential)
        .await
        .context("failed to reach the ledger")?;

    if cli.once {
        scheduler::ensure_allowances(&context)
            .await
            .context("allowance check failed")?;
        let report = scheduler::run_once(&context, 1).await;
        if report.has_failures() {
            bail!("the cycle finished with {} failures", report.failures.len());
        }
        return Ok(());
    }

    let shutdown = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let cycles = scheduler::run(&context, shutdown)
        .await
        .context("the harvesting loop stopped")?;

    tracing::info!(cycles, "farm-harvester stopped");
    Ok(())
}
