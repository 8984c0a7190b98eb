#![allow(non_snake_case)]

use aliri_braid::braid;
use serde::{Deserialize, Serialize};

/// UID identifying the series a DICOM instance belongs to.
///
/// Used as the partition key of the collector registry.
#[braid(serde)]
pub struct SeriesInstanceUID;

/// Metadata of a single DICOM instance, decoded by the inbound listener.
///
/// Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DicomInstance {
    pub PatientID: String,
    pub PatientName: String,
    pub StudyInstanceUID: String,
    pub SeriesInstanceUID: SeriesInstanceUID,
    pub SOPInstanceUID: String,
}

/// The metadata registered with the series store for one completed series.
///
/// Patient and study fields are those of the first-arrived instance of the
/// series. Created once per collector, immediately before the collector is
/// retired from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSummary {
    pub PatientID: String,
    pub PatientName: String,
    pub StudyInstanceUID: String,
    pub SeriesInstanceUID: SeriesInstanceUID,
    pub InstanceInSeries: u32,
}

/// Acknowledgement body returned by the series store.
#[derive(Debug, Deserialize)]
pub struct SeriesStoreResponse {
    pub status: String,
    pub message: String,
}
