use sericollect::{instance_listener_stdin_loop, run_everything_from_env};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (tx_instance, rx_instance) = tokio::sync::mpsc::unbounded_channel();
    let listener = tokio::spawn(instance_listener_stdin_loop(tx_instance));
    run_everything_from_env(rx_instance).await?;
    listener.await?
}
