use anyhow::Context;
use pushparse::config::Config;
use pushparse::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let server = Server::bind(&cfg)
        .await
        .with_context(|| format!("failed to start on {}:{}", cfg.host, cfg.service))?;

    tracing::info!(
        address = %server.local_addr()?,
        max_connections = cfg.max_connections,
        policy = ?cfg.parse_policy,
        "pushparse ready"
    );

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await;

    Ok(())
}
