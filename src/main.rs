use anyhow::Context;
use clap::Parser;
use kaltura_broker::utils::logger;
use kaltura_broker::{
    router, AppState, BasicCredentials, BrokerSettings, CatalogDescriptor, CliConfig,
    InstanceRegistry, KalturaClient, LifecycleEngine,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    if let Err(e) = run(cli).await {
        tracing::error!("❌ Broker terminated: {:#}", e);
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: CliConfig) -> anyhow::Result<()> {
    tracing::info!("Starting kaltura-broker");

    // 驗證配置
    let settings = BrokerSettings::resolve(&cli).context("invalid configuration")?;
    tracing::debug!(
        provider_url = %settings.provider_url,
        timeout = ?settings.provider_timeout,
        dashboard_url = %settings.dashboard_url,
        "Configuration resolved"
    );

    let provider = KalturaClient::new(&settings.provider_url, settings.provider_timeout)?;
    let engine = LifecycleEngine::new(
        provider,
        Arc::new(InstanceRegistry::new()),
        CatalogDescriptor::new(&settings.catalog),
        settings.dashboard_url.clone(),
    );
    let state = AppState::new(
        engine,
        BasicCredentials::new(settings.username.clone(), settings.password.clone()),
    );
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("🌐 Broker listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("👋 Broker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
