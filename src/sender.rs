use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::error::{HandleLoopError, SeriesStoreError};
use crate::store_client::SeriesStoreClient;
use crate::types::SeriesSummary;

/// Deliver series summaries from `receiver` to the series store.
///
/// We have two loops:
/// 1. The receiver loop spawns one delivery task per summary. In-flight
///    deliveries are bounded by a semaphore, so a slow store backs up this
///    loop instead of piling up requests.
/// 2. The joiner loop blocks until every task is complete and takes note of
///    any errors.
///
/// A failed delivery is logged and its summary dropped; it never stops the
/// loop or the deliveries of other series.
pub(crate) async fn series_summary_sender(
    mut receiver: UnboundedReceiver<SeriesSummary>,
    client: SeriesStoreClient,
    max_inflight: usize,
) -> Result<(), HandleLoopError> {
    let client = Arc::new(client);
    let semaphore = Arc::new(Semaphore::new(max_inflight));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let receiver_loop = async {
        while let Some(summary) = receiver.recv().await {
            let permit = Arc::clone(&semaphore).acquire_owned().await.unwrap();
            tx.send(store_task(&client, summary, permit)).unwrap();
        }
        drop(tx);
    };
    let mut everything_ok = true;
    let joiner_loop = async {
        while let Some(task) = rx.recv().await {
            if task.await.unwrap().is_err() {
                everything_ok = false;
            }
        }
    };
    tokio::join!(receiver_loop, joiner_loop);
    if everything_ok {
        Ok(())
    } else {
        Err(HandleLoopError(
            "There was an error registering series summaries with the series store.",
        ))
    }
}

type DeliveryTask = JoinHandle<Result<(), SeriesStoreError>>;

/// Wraps [SeriesStoreClient::store] with [tokio::spawn] and [tracing].
/// The permit is held for the lifetime of the task.
fn store_task(
    client: &Arc<SeriesStoreClient>,
    summary: SeriesSummary,
    permit: OwnedSemaphorePermit,
) -> DeliveryTask {
    let client = Arc::clone(client);
    tokio::spawn(async move {
        let _permit = permit;
        let series_instance_uid = summary.SeriesInstanceUID.clone();
        let result = client.store(&summary).await;
        match &result {
            Ok(res) => {
                tracing::info!(
                    task = "store",
                    SeriesInstanceUID = series_instance_uid.as_str(),
                    ndicom = summary.InstanceInSeries,
                    message = res.message.as_str()
                );
            }
            Err(e) => {
                tracing::error!(
                    task = "store",
                    SeriesInstanceUID = series_instance_uid.as_str(),
                    error = e.to_string()
                );
            }
        }
        result.map(|_| ())
    })
}
