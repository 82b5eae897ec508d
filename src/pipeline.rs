use std::sync::Arc;

use serde::Serialize;

use crate::cli::{FetchOptionArgs, PersistArgs, PersistMode, SummarizeArgs};
use crate::digest::{Section, parse_completion};
use crate::error::{DigestError, Result};
use crate::fetch::{ContentFetcher, ContentKind, FetchOptions};
use crate::formats::{DigestRecord, SourceInput};
use crate::openai::{ApiKey, OpenAiConfig, OpenAiSummarizer, Summarizer};
use crate::prompt::{PromptTemplate, build_prompt};
use crate::store::{DigestStore, SavedDigest};

/// Everything a digest run needs besides the credential.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub fetch: FetchOptions,
    pub openai: OpenAiConfig,
    pub template: PromptTemplate,
    pub max_input_chars: usize,
    pub log_path: String,
    pub documents_dir: String,
    pub persist: PersistMode,
}

impl DigestConfig {
    pub fn from_args(
        summarize: &SummarizeArgs,
        fetch: &FetchOptionArgs,
        persist: &PersistArgs,
    ) -> Self {
        Self {
            fetch: fetch.to_options(),
            openai: OpenAiConfig {
                base_url: summarize.openai_base_url.clone(),
                model: summarize.openai_model.clone(),
                temperature: summarize.openai_temperature,
                ..OpenAiConfig::default()
            },
            template: PromptTemplate {
                takeaway_focus: summarize.takeaway_focus.clone(),
            },
            max_input_chars: summarize.max_input_chars,
            log_path: persist.log.clone(),
            documents_dir: persist.documents_dir.clone(),
            persist: persist.persist,
        }
    }
}

/// Paper text ready for the prompt, plus where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct SourceText {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DigestOutcome {
    pub record: DigestRecord,
    pub truncated: bool,
    pub original_chars: usize,
    pub kept_chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_kind: Option<ContentKind>,
    /// Non-fatal problems, e.g. sections the model left out.
    pub warnings: Vec<String>,
    pub saved: SavedDigest,
}

pub struct DigestPipeline {
    fetcher: ContentFetcher,
    summarizer: Arc<dyn Summarizer>,
    template: PromptTemplate,
    max_input_chars: usize,
    store: DigestStore,
}

impl DigestPipeline {
    pub fn from_config(config: DigestConfig) -> anyhow::Result<Self> {
        let summarizer = Arc::new(OpenAiSummarizer::new(config.openai.clone())?);
        Self::with_summarizer(config, summarizer)
    }

    pub fn with_summarizer(
        config: DigestConfig,
        summarizer: Arc<dyn Summarizer>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: ContentFetcher::new(config.fetch)?,
            summarizer,
            template: config.template,
            max_input_chars: config.max_input_chars,
            store: DigestStore::new(config.log_path, config.documents_dir, config.persist),
        })
    }

    pub fn fetcher(&self) -> &ContentFetcher {
        &self.fetcher
    }

    pub fn store(&self) -> &DigestStore {
        &self.store
    }

    /// Text for `source`: downloaded and extracted for a URL, taken as-is otherwise.
    pub async fn source_text(&self, source: &SourceInput) -> Result<SourceText> {
        validate_source(source)?;
        match source {
            SourceInput::Url(url) => {
                let fetched = self.fetcher.fetch(url).await?;
                Ok(SourceText {
                    text: fetched.text,
                    kind: Some(fetched.kind),
                    pages: fetched.pages,
                })
            }
            SourceInput::RawText(text) => Ok(SourceText {
                text: text.trim().to_owned(),
                kind: None,
                pages: None,
            }),
        }
    }

    /// One linear pass: source text, prompt, completion, digest, persistence.
    pub async fn run(&self, source: SourceInput, api_key: &ApiKey) -> Result<DigestOutcome> {
        let source_text = self.source_text(&source).await?;

        let prompt = build_prompt(&source_text.text, &self.template, self.max_input_chars);
        if prompt.truncated {
            tracing::info!(
                original_chars = prompt.original_chars,
                kept_chars = prompt.kept_chars,
                "paper text truncated for prompt"
            );
        }

        let completion = self.summarizer.complete(&prompt, api_key).await?;

        let parsed = parse_completion(&completion);
        let mut warnings = Vec::new();
        if parsed.is_unrecognized() {
            tracing::warn!("completion contained no recognized sections");
            warnings.push("the model response contained no recognized sections".to_owned());
        } else if !parsed.missing.is_empty() {
            let missing = parsed
                .missing
                .iter()
                .map(|section: &Section| section.heading())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(%missing, "completion is missing sections");
            warnings.push(format!("missing sections: {missing}"));
        }
        if prompt.truncated {
            warnings.push(format!(
                "paper text truncated to {} of {} characters",
                prompt.kept_chars, prompt.original_chars
            ));
        }

        let record = DigestRecord::new(parsed.fields, &source);
        let saved = self.store.save(&record).map_err(DigestError::Persist)?;

        Ok(DigestOutcome {
            record,
            truncated: prompt.truncated,
            original_chars: prompt.original_chars,
            kept_chars: prompt.kept_chars,
            content_kind: source_text.kind,
            warnings,
            saved,
        })
    }
}

/// Rejects a blank URL or blank paper text before any key lookup or network call.
pub fn validate_source(source: &SourceInput) -> Result<()> {
    match source {
        SourceInput::Url(url) if url.trim().is_empty() => {
            Err(DigestError::Input("paper URL is empty".to_owned()))
        }
        SourceInput::RawText(text) if text.trim().is_empty() => {
            Err(DigestError::Input("paper text is empty".to_owned()))
        }
        _ => Ok(()),
    }
}
