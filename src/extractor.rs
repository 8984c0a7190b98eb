use crate::collector::SeriesCollector;
use crate::types::SeriesSummary;

/// Derive the [SeriesSummary] of a completed series.
///
/// Patient and study fields are read from the first-arrived instance; later
/// instances of a series are assumed to agree on them. The collector
/// lifecycle guarantees the instance sequence is non-empty.
pub(crate) fn extract_summary(collector: SeriesCollector) -> SeriesSummary {
    let ndicom = collector.ndicom();
    let (series_instance_uid, instances) = collector.into_parts();
    let first = instances
        .into_iter()
        .next()
        .expect("a series collector always holds at least one instance");
    SeriesSummary {
        PatientID: first.PatientID,
        PatientName: first.PatientName,
        StudyInstanceUID: first.StudyInstanceUID,
        SeriesInstanceUID: series_instance_uid,
        InstanceInSeries: ndicom,
    }
}
