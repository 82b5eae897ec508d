use std::io::Read as _;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use paper_digest::cli::{Cli, Command, DigestArgs, FetchArgs, ListArgs};
use paper_digest::fetch::ContentFetcher;
use paper_digest::formats::SourceInput;
use paper_digest::openai::ApiKey;
use paper_digest::pipeline::{DigestConfig, DigestPipeline, validate_source};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    paper_digest::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Fetch(args) => fetch(args).await.context("fetch")?,
        Command::Digest(args) => digest(args).await.context("digest")?,
        Command::List(args) => list(args).context("list")?,
    }

    Ok(())
}

async fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    let fetcher = ContentFetcher::new(args.fetch.to_options())?;
    let fetched = fetcher.fetch(&args.url).await?;
    println!("{}", fetched.text);
    Ok(())
}

async fn digest(args: DigestArgs) -> anyhow::Result<()> {
    let source = read_source(&args)?;
    validate_source(&source)?;
    let api_key = ApiKey::resolve(args.api_key.as_ref().map(ApiKey::expose))?;

    let config = DigestConfig::from_args(&args.summarize, &args.fetch, &args.persist);
    let pipeline = DigestPipeline::from_config(config).context("build digest pipeline")?;

    let outcome = pipeline.run(source, &api_key).await?;
    for warning in &outcome.warnings {
        tracing::warn!("{warning}");
    }
    if let Some(path) = &outcome.saved.log_path {
        tracing::info!(path = %path.display(), "appended digest log");
    }
    if let Some(path) = &outcome.saved.document_path {
        tracing::info!(path = %path.display(), "wrote digest document");
    }

    print!("{}", paper_digest::digest::render_markdown(&outcome.record));
    Ok(())
}

fn read_source(args: &DigestArgs) -> anyhow::Result<SourceInput> {
    if let Some(url) = &args.url {
        return Ok(SourceInput::Url(url.clone()));
    }
    if let Some(text) = &args.text {
        return Ok(SourceInput::RawText(text.clone()));
    }
    let Some(path) = args.text_file.as_deref() else {
        anyhow::bail!("one of --url, --text-file or --text is required");
    };
    let text = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read paper text from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("read paper text: {path}"))?
    };
    Ok(SourceInput::RawText(text))
}

fn list(args: ListArgs) -> anyhow::Result<()> {
    let records = paper_digest::store::read_log(std::path::Path::new(&args.log))?;
    if args.json {
        for record in &records {
            println!("{}", serde_json::to_string(record).context("serialize digest record")?);
        }
        return Ok(());
    }

    if records.is_empty() {
        println!("No digests saved yet in {}.", args.log);
        return Ok(());
    }
    for record in &records {
        let title = if record.title().is_empty() {
            "(untitled)"
        } else {
            record.title()
        };
        let source = record
            .source_url
            .as_deref()
            .unwrap_or(record.source_type.as_str());
        println!(
            "{}\t{title}\t{source}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("Total digests saved: {}", records.len());
    Ok(())
}
