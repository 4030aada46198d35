use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidconv_core::impls::FfmpegTranscoder;
use vidconv_core::{LifecycleBuilder, LifecycleConfig, StoragePaths};
use vidconv_server::api::ApiServer;
use vidconv_server::{DEFAULT_LOG_FILTER, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before logging, so RUST_LOG may come from .env.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server_config = ServerConfig::from_env_or_default();
    let lifecycle_config = LifecycleConfig::from_env().context("invalid lifecycle configuration")?;

    let paths = StoragePaths::ensure(&lifecycle_config.intake_dir, &lifecycle_config.results_dir)
        .await
        .context("storage directories are unavailable; refusing to accept uploads")?;

    let lifecycle = Arc::new(
        LifecycleBuilder::new(lifecycle_config)
            .with_transcoder(Arc::new(FfmpegTranscoder::new(&server_config.ffmpeg_path)))
            .build(paths)?,
    );
    lifecycle.start().await?;

    let server = ApiServer::new(server_config, Arc::clone(&lifecycle));
    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel_token.cancel();
    });

    let served = server.run().await;
    lifecycle.shutdown().await;
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
