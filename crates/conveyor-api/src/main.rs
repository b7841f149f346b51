mod api_doc;
mod error;
mod handlers;
mod services;
mod setup;
mod staging;
mod state;
mod task_dispatch;
mod task_handlers;
mod telemetry;

use conveyor_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router, transfer_queue) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    // The queue handle must outlive the server; dropping it earlier would
    // stop transfer processing while uploads are still being admitted.
    transfer_queue.shutdown().await;

    Ok(())
}
