use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use multibet_client::{
    client,
    config::AppConfig,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

/// The terminal belongs to the UI, so logs go to a daily file.
fn init_tracing(config: &AppConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)
        .wrap_err_with(|| format!("Failed to create log dir {}", config.log_dir.display()))?;
    let appender = rolling::daily(&config.log_dir, "multibet.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .wrap_err("Invalid log filter")?;
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {e}"))?;
    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // a missing .env is fine
    let _ = dotenvy::dotenv();
    let config = AppConfig::parse();
    let _guard = init_tracing(&config)?;
    tracing::info!(
        contract = %config.contract_address,
        rpc = %config.rpc_url,
        "starting multibet client"
    );
    client::run_app(config).await
}
