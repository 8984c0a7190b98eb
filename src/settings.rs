//! Sericollect settings, which are configurable using environment variables.
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct SericollectEnvOptions {
    /// URL of the series store endpoint summaries are registered with.
    pub series_endpoint: String,
    /// Silence after which a series is inferred complete. Too short risks
    /// splitting one series into two dispatches; too long delays dispatch
    /// and ties up memory.
    #[serde(with = "humantime_serde", default = "default_idle_threshold")]
    pub idle_threshold: Duration,
    /// How often the dispatcher sweeps for quiescent series.
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    pub sweep_interval: Duration,
    #[serde(default = "default_http_retries")]
    pub http_retries: u16,
    #[serde(default = "default_max_inflight_sends")]
    pub max_inflight_sends: NonZeroUsize,
}

fn default_idle_threshold() -> Duration {
    Duration::from_secs(1)
}

fn default_sweep_interval() -> Duration {
    Duration::from_millis(200)
}

fn default_http_retries() -> u16 {
    3
}

fn default_max_inflight_sends() -> NonZeroUsize {
    NonZeroUsize::new(4).unwrap()
}
