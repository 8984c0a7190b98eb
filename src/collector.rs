use std::time::{Duration, Instant};

use crate::types::{DicomInstance, SeriesInstanceUID};

/// Accumulator for one DICOM series while its instances are still arriving.
///
/// Holds the instances received so far (in arrival order), the time of the
/// most recent append, and whether dispatch of the series has started.
/// Creation and [SeriesCollector::add_instance] are the only mutation paths
/// for the instance sequence. Callers pass in `Instant`s instead of the
/// collector sampling the clock itself, so the timing logic can be tested
/// without sleeping.
pub(crate) struct SeriesCollector {
    series_instance_uid: SeriesInstanceUID,
    instances: Vec<DicomInstance>,
    last_update: Instant,
    dispatch_started: bool,
}

impl SeriesCollector {
    /// Create a collector seeded with the first instance of a new series.
    pub fn new(first_instance: DicomInstance, now: Instant) -> Self {
        Self {
            series_instance_uid: first_instance.SeriesInstanceUID.clone(),
            instances: vec![first_instance],
            last_update: now,
            dispatch_started: false,
        }
    }

    /// Append `instance` to the series if it has the right `SeriesInstanceUID`.
    ///
    /// Returns `true` and refreshes the last-update time if the UID matched
    /// and the instance was therefore added, `false` (without mutating
    /// anything) otherwise.
    pub fn add_instance(&mut self, instance: DicomInstance, now: Instant) -> bool {
        if instance.SeriesInstanceUID != self.series_instance_uid {
            return false;
        }
        self.instances.push(instance);
        self.last_update = now;
        true
    }

    pub fn series_instance_uid(&self) -> &SeriesInstanceUID {
        &self.series_instance_uid
    }

    /// Number of instances received for the series so far.
    pub fn ndicom(&self) -> u32 {
        self.instances.len() as u32
    }

    /// Whether the series has received nothing for longer than
    /// `idle_threshold` and has not already been marked for dispatch.
    pub fn is_quiescent(&self, now: Instant, idle_threshold: Duration) -> bool {
        !self.dispatch_started && now.duration_since(self.last_update) > idle_threshold
    }

    /// Mark the start of dispatch. Transitions false to true at most once.
    pub fn mark_dispatch_started(&mut self) {
        debug_assert!(
            !self.dispatch_started,
            "dispatch started twice for series {}",
            self.series_instance_uid
        );
        self.dispatch_started = true;
    }

    /// Consume the collector, yielding its key and instances in arrival order.
    pub fn into_parts(self) -> (SeriesInstanceUID, Vec<DicomInstance>) {
        (self.series_instance_uid, self.instances)
    }
}
