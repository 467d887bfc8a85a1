use tracing_subscriber::EnvFilter;

mod app;
mod arena;
mod game;
mod protocol;
mod runtime;
mod shared;
mod store;
mod transport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    runtime::run().await
}
