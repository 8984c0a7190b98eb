use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;

use crate::types::DicomInstance;

/// Listen for incoming DICOM instances on stdin, one JSON record per line,
/// and enqueue them for the dispatcher.
///
/// This is the stand-in for a wire-level listener: a real C-STORE SCP would
/// decode instances off the network and feed the same channel. Malformed
/// records are discarded and logged, never fatal. Returns at end of input.
pub async fn instance_listener_stdin_loop(
    sender: UnboundedSender<DicomInstance>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DicomInstance>(&line) {
            Ok(instance) => {
                if instance.SeriesInstanceUID.as_str().is_empty() {
                    tracing::warn!(
                        SOPInstanceUID = instance.SOPInstanceUID,
                        "instance without a SeriesInstanceUID discarded"
                    );
                    continue;
                }
                sender.send(instance)?;
            }
            Err(e) => {
                tracing::warn!(error = e.to_string(), "malformed instance record discarded");
            }
        }
    }
    Ok(())
}
