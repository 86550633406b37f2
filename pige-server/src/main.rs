use anyhow::Result;
use pige_server::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,pige=debug")),
        )
        .init();

    let settings = Settings::from_env()?;
    let ax = pige_server::build(&settings)?;

    tracing::info!(
        store = ?settings.store_backend,
        backend = %settings.backend_url,
        "starting pige control panel"
    );

    ax.listen_with_shutdown(settings.addr(), shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
