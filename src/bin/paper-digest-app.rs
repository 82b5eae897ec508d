use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

use paper_digest::app::{AppState, router};
use paper_digest::cli::{FetchOptionArgs, PersistArgs, SummarizeArgs};
use paper_digest::pipeline::{DigestConfig, DigestPipeline};

#[derive(Debug, Parser)]
#[command(author, version, about = "Local web UI for paper digests")]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8501")]
    addr: SocketAddr,

    #[command(flatten)]
    summarize: SummarizeArgs,

    #[command(flatten)]
    fetch: FetchOptionArgs,

    #[command(flatten)]
    persist: PersistArgs,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    paper_digest::logging::init()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting paper-digest-app");

    let config = DigestConfig::from_args(&args.summarize, &args.fetch, &args.persist);
    let pipeline = DigestPipeline::from_config(config).context("build digest pipeline")?;
    let app = router(AppState::new(Arc::new(pipeline)));

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
