use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::fetch::{DEFAULT_MAX_PDF_PAGES, DEFAULT_MIN_TEXT_CHARS, DEFAULT_TIMEOUT_SECS, FetchOptions};
use crate::openai::{ApiKey, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::prompt::{DEFAULT_MAX_INPUT_CHARS, DEFAULT_TAKEAWAY_FOCUS};
use crate::store::{DEFAULT_DOCUMENTS_DIR, DEFAULT_LOG_PATH};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the text extracted from a paper URL.
    Fetch(FetchArgs),
    /// Summarize a paper into a reading note and save it.
    Digest(DigestArgs),
    /// List saved digests, newest first.
    List(ListArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Append one JSON line per digest.
    Log,
    /// Write one `.docx` file per digest.
    Document,
    Both,
}

impl PersistMode {
    pub fn writes_log(self) -> bool {
        matches!(self, Self::Log | Self::Both)
    }

    pub fn writes_document(self) -> bool {
        matches!(self, Self::Document | Self::Both)
    }
}

#[derive(Debug, Clone, Args)]
pub struct FetchOptionArgs {
    /// HTTP timeout for downloading the paper, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Pages read from the start of a PDF.
    #[arg(long, default_value_t = DEFAULT_MAX_PDF_PAGES)]
    pub max_pdf_pages: usize,

    /// Extracted text shorter than this is rejected.
    #[arg(long, default_value_t = DEFAULT_MIN_TEXT_CHARS)]
    pub min_text_chars: usize,
}

impl FetchOptionArgs {
    pub fn to_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: std::time::Duration::from_secs(self.fetch_timeout_secs),
            max_pdf_pages: self.max_pdf_pages,
            min_text_chars: self.min_text_chars,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SummarizeArgs {
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub openai_model: String,

    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub openai_temperature: f32,

    /// Characters of paper text sent to the model.
    #[arg(long, default_value_t = DEFAULT_MAX_INPUT_CHARS)]
    pub max_input_chars: usize,

    /// Reader profile used for the "Personal Takeaway" section.
    #[arg(long, default_value = DEFAULT_TAKEAWAY_FOCUS)]
    pub takeaway_focus: String,
}

#[derive(Debug, Clone, Args)]
pub struct PersistArgs {
    /// JSON Lines log of saved digests.
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    pub log: String,

    /// Directory for generated `.docx` documents.
    #[arg(long, default_value = DEFAULT_DOCUMENTS_DIR)]
    pub documents_dir: String,

    #[arg(long, value_enum, default_value_t = PersistMode::Both)]
    pub persist: PersistMode,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Paper URL (http/https; PDF or HTML).
    #[arg(long)]
    pub url: String,

    #[command(flatten)]
    pub fetch: FetchOptionArgs,
}

#[derive(Debug, Args)]
#[command(group(
    clap::ArgGroup::new("source")
        .required(true)
        .args(["url", "text_file", "text"]),
))]
pub struct DigestArgs {
    /// Paper URL (http/https; PDF or HTML).
    #[arg(long)]
    pub url: Option<String>,

    /// File containing the paper text (`-` for stdin).
    #[arg(long)]
    pub text_file: Option<String>,

    /// Paper text given inline.
    #[arg(long)]
    pub text: Option<String>,

    /// API key (default: `OPENAI_API_KEY`).
    #[arg(long, value_parser = parse_api_key)]
    pub api_key: Option<ApiKey>,

    #[command(flatten)]
    pub summarize: SummarizeArgs,

    #[command(flatten)]
    pub fetch: FetchOptionArgs,

    #[command(flatten)]
    pub persist: PersistArgs,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// JSON Lines log of saved digests.
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    pub log: String,

    /// Print records as JSON Lines instead of a table.
    #[arg(long)]
    pub json: bool,
}

fn parse_api_key(raw: &str) -> Result<ApiKey, String> {
    ApiKey::new(raw).ok_or_else(|| "API key must not be blank".to_owned())
}
