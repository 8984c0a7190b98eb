use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

use crate::collector::SeriesCollector;
use crate::extractor::extract_summary;
use crate::types::{DicomInstance, SeriesInstanceUID, SeriesSummary};

/// All collectors of series whose instances are still arriving, keyed by
/// `SeriesInstanceUID`. Exclusively owned by [series_dispatcher_loop]:
/// entries are added by routing and removed by the sweep, nothing else.
type CollectorRegistry = HashMap<SeriesInstanceUID, SeriesCollector>;

/// Collect incoming DICOM instances into series and dispatch each series
/// exactly once.
///
/// The inbound protocol carries no series-length or completion marker, so
/// completion is inferred from silence: a sweep runs every `sweep_interval`
/// and dispatches every collector which has received nothing for longer than
/// `idle_threshold`. One [SeriesSummary] per dispatched series is sent to
/// `sender`.
///
/// Returns once `receiver` closes, after dispatching whatever is still being
/// collected, or with an error if `sender`'s receiving half is gone.
pub(crate) async fn series_dispatcher_loop(
    mut receiver: UnboundedReceiver<DicomInstance>,
    sender: UnboundedSender<SeriesSummary>,
    idle_threshold: Duration,
    sweep_interval: Duration,
) -> Result<(), SendError<SeriesSummary>> {
    let mut registry = CollectorRegistry::default();
    let mut sweep = tokio::time::interval(sweep_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            maybe_instance = receiver.recv() => match maybe_instance {
                Some(instance) => route_instance(&mut registry, instance, Instant::now()),
                None => break,
            },
            _ = sweep.tick() => {
                for summary in sweep_quiescent(&mut registry, Instant::now(), idle_threshold) {
                    sender.send(summary)?;
                }
            }
        }
    }
    // Inbound channel closed: whatever is still collecting will never see
    // another instance, so dispatch it now instead of waiting out the idle
    // threshold.
    for summary in drain_remaining(registry) {
        sender.send(summary)?;
    }
    Ok(())
}

/// Route `instance` to the collector for its series, creating the collector
/// if this is the first instance of a new series.
///
/// Never blocks on I/O. A series UID mismatch is structurally impossible
/// here (the lookup is by that same UID); should one occur anyway, the
/// instance is discarded and logged, not treated as fatal.
fn route_instance(registry: &mut CollectorRegistry, instance: DicomInstance, now: Instant) {
    if let Some(collector) = registry.get_mut(&instance.SeriesInstanceUID) {
        let series_instance_uid = instance.SeriesInstanceUID.clone();
        let sop_instance_uid = instance.SOPInstanceUID.clone();
        if collector.add_instance(instance, now) {
            tracing::debug!(
                SeriesInstanceUID = series_instance_uid.as_str(),
                SOPInstanceUID = sop_instance_uid,
                ndicom = collector.ndicom(),
                "instance added to series"
            );
        } else {
            tracing::warn!(
                SeriesInstanceUID = series_instance_uid.as_str(),
                SOPInstanceUID = sop_instance_uid,
                "series UID mismatch, instance discarded"
            );
        }
    } else {
        tracing::info!(
            SeriesInstanceUID = instance.SeriesInstanceUID.as_str(),
            SOPInstanceUID = instance.SOPInstanceUID,
            "new series started"
        );
        registry.insert(
            instance.SeriesInstanceUID.clone(),
            SeriesCollector::new(instance, now),
        );
    }
}

/// One sweep over the registry: mark every quiescent collector for dispatch,
/// then retire each and extract its summary.
///
/// This function is deliberately not async. The idle check, the
/// `dispatch_started` flip, the removal, and the extraction all happen in
/// one uninterrupted step of the loop which also routes instances, so no
/// instance can land in a collector after it has been marked for dispatch,
/// and no collector can be dispatched twice.
fn sweep_quiescent(
    registry: &mut CollectorRegistry,
    now: Instant,
    idle_threshold: Duration,
) -> Vec<SeriesSummary> {
    let marked: Vec<SeriesInstanceUID> = registry
        .iter_mut()
        .filter(|(_, collector)| collector.is_quiescent(now, idle_threshold))
        .map(|(series_instance_uid, collector)| {
            collector.mark_dispatch_started();
            series_instance_uid.clone()
        })
        .collect();
    marked
        .into_iter()
        .map(|series_instance_uid| {
            let collector = registry
                .remove(&series_instance_uid)
                .expect("marked collector is in the registry");
            tracing::info!(
                SeriesInstanceUID = series_instance_uid.as_str(),
                ndicom = collector.ndicom(),
                "dispatching series"
            );
            extract_summary(collector)
        })
        .collect()
}

/// Dispatch every collector left in the registry, idle or not.
fn drain_remaining(registry: CollectorRegistry) -> Vec<SeriesSummary> {
    registry
        .into_values()
        .map(|mut collector| {
            collector.mark_dispatch_started();
            tracing::info!(
                SeriesInstanceUID = collector.series_instance_uid().as_str(),
                ndicom = collector.ndicom(),
                "dispatching series on shutdown"
            );
            extract_summary(collector)
        })
        .collect()
}
