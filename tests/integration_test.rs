use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use sericollect::{run_everything, DicomInstance, SericollectEnvOptions, SeriesInstanceUID};
use tokio::sync::mpsc::unbounded_channel;

/// Summaries received by the mock series store, in arrival order.
type Received = Arc<Mutex<Vec<Value>>>;

/// Runs the full pipeline and pushes 2 series to it: instances arriving with
/// gaps below the idle threshold are collected into one dispatch per series,
/// and each series is registered with the store exactly once.
#[tokio::test(flavor = "multi_thread")]
async fn test_pipeline_registers_each_series_once() {
    let (addr, received) = spawn_mock_series_store().await;
    let (tx_instance, rx_instance) = unbounded_channel();
    let pipeline = tokio::spawn(run_everything(create_test_options(addr), rx_instance));

    for sop_instance_uid in ["1.1.1", "1.1.2", "1.1.3"] {
        tx_instance
            .send(instance("12345", "Hanwool Park", "1.2.3", "4.5.6", sop_instance_uid))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    tx_instance
        .send(instance("67890", "Other Patient", "1.2.4", "7.8.9", "2.2.1"))
        .unwrap();

    // Both series go quiescent and are dispatched by the sweep; closing the
    // channel afterwards must not produce any further dispatch.
    tokio::time::sleep(Duration::from_millis(700)).await;
    drop(tx_instance);
    pipeline.await.unwrap().unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 2);

    let series_a = find_series(&received, "4.5.6");
    assert_eq!(series_a["InstanceInSeries"], 3);
    assert_eq!(series_a["PatientID"], "12345");
    assert_eq!(series_a["PatientName"], "Hanwool Park");
    assert_eq!(series_a["StudyInstanceUID"], "1.2.3");

    let series_b = find_series(&received, "7.8.9");
    assert_eq!(series_b["InstanceInSeries"], 1);
    assert_eq!(series_b["PatientID"], "67890");
}

/// A series the store refuses does not keep other series from being
/// registered, but the pipeline reports the failure on exit.
#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_series_does_not_affect_others() {
    let (addr, received) = spawn_mock_series_store().await;
    let (tx_instance, rx_instance) = unbounded_channel();
    let pipeline = tokio::spawn(run_everything(create_test_options(addr), rx_instance));

    tx_instance
        .send(instance("12345", "Hanwool Park", "1.2.3", "fail.1", "1.1.1"))
        .unwrap();
    tx_instance
        .send(instance("12345", "Hanwool Park", "1.2.3", "4.5.6", "1.1.2"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    drop(tx_instance);

    let result = pipeline.await.unwrap();
    assert!(result.is_err(), "a failed delivery must be reported on exit");

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1, "only the accepted series is stored");
    assert_eq!(received[0]["SeriesInstanceUID"], "4.5.6");
}

fn create_test_options(addr: SocketAddr) -> SericollectEnvOptions {
    SericollectEnvOptions {
        series_endpoint: format!("http://{addr}/series"),
        idle_threshold: Duration::from_millis(300),
        sweep_interval: Duration::from_millis(50),
        http_retries: 0,
        max_inflight_sends: NonZeroUsize::new(2).unwrap(),
    }
}

fn instance(
    patient_id: &str,
    patient_name: &str,
    study_instance_uid: &str,
    series_instance_uid: &str,
    sop_instance_uid: &str,
) -> DicomInstance {
    DicomInstance {
        PatientID: patient_id.to_string(),
        PatientName: patient_name.to_string(),
        StudyInstanceUID: study_instance_uid.to_string(),
        SeriesInstanceUID: SeriesInstanceUID::from(series_instance_uid),
        SOPInstanceUID: sop_instance_uid.to_string(),
    }
}

fn find_series<'a>(received: &'a [Value], series_instance_uid: &str) -> &'a Value {
    received
        .iter()
        .find(|summary| summary["SeriesInstanceUID"] == series_instance_uid)
        .unwrap_or_else(|| panic!("no summary received for series {series_instance_uid}"))
}

/// An in-process stand-in for the series store: acknowledges summaries like
/// the real upsert endpoint, and refuses series whose UID starts with "fail".
async fn spawn_mock_series_store() -> (SocketAddr, Received) {
    let received = Received::default();
    let app = Router::new()
        .route("/series", post(receive_series))
        .with_state(Arc::clone(&received));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (addr, received)
}

async fn receive_series(
    State(received): State<Received>,
    Json(summary): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let series_instance_uid = summary["SeriesInstanceUID"].as_str().unwrap().to_string();
    if series_instance_uid.starts_with("fail") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "Failed to store data" })),
        );
    }
    received.lock().unwrap().push(summary);
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": format!("Inserted new series {series_instance_uid}."),
        })),
    )
}
