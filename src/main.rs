use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::Instrument;

use slotrush::{
    api::SessionClient,
    cli::config_path_from_args,
    config::Config,
    logging::init_tracing,
    workflow::{AcquisitionOutcome, AcquisitionWorkflow, Notifier, TracingNotifier},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let logging = init_tracing(&config.logging)?;

    let mode = config
        .new_mode()
        .context("invalid cadence or boost window configuration")?;
    let client = SessionClient::connect(&config.api).context("failed to build session client")?;
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let workflow = AcquisitionWorkflow::new(client, mode, &config.workflow, notifier)
        .context("invalid workflow configuration")?;

    eprintln!("slotrush started: run_id={}", logging.run_id());
    match workflow.run().instrument(logging.run_span()).await {
        AcquisitionOutcome::Acquired {
            order_number,
            slot_start,
            slot_end,
            attempts,
        } => {
            eprintln!(
                "slot acquired after {attempts} attempt(s): order={order_number} window={slot_start}-{slot_end}"
            );
            Ok(())
        }
        AcquisitionOutcome::WindowMissed { attempts, reason } => Err(anyhow!(
            "window missed after {attempts} attempt(s): {reason}"
        )),
        AcquisitionOutcome::Fatal { attempts, error } => Err(anyhow::Error::new(error)
            .context(format!("acquisition aborted after {attempts} attempt(s)"))),
    }
}
