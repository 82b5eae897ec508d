use anyhow::Context as _;

/// Our own spans at `info`, dependencies (HTML/PDF parsers, hyper) only when they warn.
const DEFAULT_FILTER: &str = "warn,paper_digest=info,paper_digest_app=info,tower_http=info";

pub fn init() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(DEFAULT_FILTER))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
