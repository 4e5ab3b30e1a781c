use market_server::{Config, Server, ServerState, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (.env is optional)
    dotenv::dotenv().ok();

    // 2. Configuration and logging
    let config = Config::from_env();
    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref());
    config.validate().map_err(anyhow::Error::msg)?;

    tracing::info!(
        work_dir = %config.work_dir,
        port = config.http_port,
        timezone = %config.timezone,
        "Market server starting..."
    );

    // 3. State (database, services)
    let state = ServerState::initialize(&config)?;

    // 4. HTTP server; background tasks start with it
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    Ok(())
}
