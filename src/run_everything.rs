use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::get_config;
use crate::dispatcher::series_dispatcher_loop;
use crate::error::HandleLoopError;
use crate::sender::series_summary_sender;
use crate::settings::SericollectEnvOptions;
use crate::store_client::SeriesStoreClient;
use crate::types::DicomInstance;

/// Calls [run_everything] using configuration from environment variables.
pub async fn run_everything_from_env(
    receiver: UnboundedReceiver<DicomInstance>,
) -> anyhow::Result<()> {
    let config = get_config();
    let settings = config.extract()?;
    run_everything(settings, receiver).await
}

/// Runs everything in parallel:
///
/// 1. The series dispatcher loop, which partitions incoming instances by
///    series and detects completed series by inbound silence
/// 2. A delivery loop which registers one summary per completed series with
///    the series store
///
/// Returns once `receiver` closes and every pending dispatch has been
/// delivered (or has failed and been logged).
pub async fn run_everything(
    SericollectEnvOptions {
        series_endpoint,
        idle_threshold,
        sweep_interval,
        http_retries,
        max_inflight_sends,
    }: SericollectEnvOptions,
    receiver: UnboundedReceiver<DicomInstance>,
) -> anyhow::Result<()> {
    let client = SeriesStoreClient::new(series_endpoint, http_retries);
    let (tx_summary, rx_summary) = mpsc::unbounded_channel();
    tokio::try_join!(
        series_dispatcher_loop(receiver, tx_summary, idle_threshold, sweep_interval).map(|r| {
            r.map_err(|_| HandleLoopError("The summary channel closed before the dispatcher finished."))
        }),
        series_summary_sender(rx_summary, client, max_inflight_sends.get()),
    )?;
    Ok(())
}
