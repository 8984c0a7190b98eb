use reqwest::Response;

/// Error delivering a series summary to the series store.
#[derive(thiserror::Error, Debug)]
pub enum SeriesStoreError {
    #[error("({status:?} {reason:?}): {text:?}")]
    Store {
        status: reqwest::StatusCode,
        reason: &'static str,
        text: Result<String, reqwest::Error>,
        source: reqwest::Error,
    },

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Error from one of the long-running pipeline loops.
///
/// Per-series failures are logged and isolated while the loop keeps running;
/// this error reports, at loop exit, that some of them happened.
#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct HandleLoopError(pub &'static str);

pub(crate) async fn check(res: Response) -> Result<Response, SeriesStoreError> {
    match res.error_for_status_ref() {
        Ok(_) => Ok(res),
        Err(source) => {
            let status = res.status();
            let reason = status.canonical_reason().unwrap_or("unknown reason");
            let text = res.text().await;
            Err(SeriesStoreError::Store {
                status,
                reason,
                text,
                source,
            })
        }
    }
}
