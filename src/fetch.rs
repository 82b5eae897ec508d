use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use crate::error::{DigestError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PDF_PAGES: usize = 5;
pub const DEFAULT_MIN_TEXT_CHARS: usize = 100;

const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (compatible; paper-digest/0.1)";

/// Subtrees whose text never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer",
];

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_pdf_pages: usize,
    pub min_text_chars: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_pdf_pages: DEFAULT_MAX_PDF_PAGES,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Pdf,
    Html,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchedText {
    pub kind: ContentKind,
    /// Pages read from a PDF; `None` for HTML.
    pub pages: Option<usize>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
    options: FetchOptions,
}

impl ContentFetcher {
    pub fn new(options: FetchOptions) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build content fetch http client")?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Downloads `raw_url` once and returns its readable text.
    pub async fn fetch(&self, raw_url: &str) -> Result<FetchedText> {
        let url = parse_http_url(raw_url)?;

        tracing::info!(url = %url, "fetch paper content");
        let resp = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(
                ACCEPT,
                "application/pdf,text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|err| fetch_error(&url, &err))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DigestError::Fetch(format!("GET {url} returned {status}")));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let body = read_body_limited(resp, MAX_BODY_BYTES)
            .await
            .map_err(|err| match err.downcast_ref::<reqwest::Error>() {
                Some(req_err) => fetch_error(&url, req_err),
                None => DigestError::Fetch(format!("GET {url}: {err:#}")),
            })?;

        let kind = detect_kind(content_type.as_deref(), &url, &body);
        tracing::debug!(url = %url, ?kind, bytes = body.len(), "downloaded paper content");

        let fetched = match kind {
            ContentKind::Pdf => {
                let max_pages = self.options.max_pdf_pages;
                let pages =
                    tokio::task::spawn_blocking(move || extract_pdf_pages(&body, max_pages))
                        .await
                        .map_err(|err| {
                            DigestError::Extraction(format!("PDF extraction task failed: {err}"))
                        })??;
                FetchedText {
                    kind,
                    pages: Some(pages.len()),
                    text: clean_text(&pages.join("\n\n")),
                }
            }
            ContentKind::Html => {
                let html = decode_html(&body, content_type.as_deref());
                FetchedText {
                    kind,
                    pages: None,
                    text: extract_html_text(&html),
                }
            }
        };

        ensure_enough_text(&fetched.text, self.options.min_text_chars)?;
        tracing::info!(
            url = %url,
            ?kind,
            chars = fetched.text.chars().count(),
            "extracted paper text"
        );
        Ok(fetched)
    }
}

pub fn parse_http_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|err| DigestError::Fetch(format!("invalid URL {raw:?}: {err}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(DigestError::Fetch(format!("URL must be http/https: {url}")));
    }
    if url.host_str().is_none() {
        return Err(DigestError::Fetch(format!("URL must include a host: {url}")));
    }
    Ok(url)
}

fn fetch_error(url: &Url, err: &reqwest::Error) -> DigestError {
    if err.is_timeout() {
        DigestError::Fetch(format!("GET {url} timed out"))
    } else {
        DigestError::Fetch(format!("GET {url}: {err}"))
    }
}

async fn read_body_limited(mut resp: reqwest::Response, limit: usize) -> anyhow::Result<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        if out.len() + chunk.len() > limit {
            anyhow::bail!("response body exceeds {limit} bytes");
        }
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

pub fn detect_kind(content_type: Option<&str>, url: &Url, head: &[u8]) -> ContentKind {
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    if content_type.contains("application/pdf")
        || url.path().to_ascii_lowercase().ends_with(".pdf")
        || head.starts_with(b"%PDF-")
    {
        ContentKind::Pdf
    } else {
        ContentKind::Html
    }
}

/// Decodes an HTML body by the charset declared in its Content-Type, UTF-8 otherwise.
pub fn decode_html(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(declared_charset)
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

fn declared_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Text of the first `max_pages` pages, one entry per page. Pages without a text
/// layer still count toward the limit and are dropped.
pub fn extract_pdf_pages(bytes: &[u8], max_pages: usize) -> Result<Vec<String>> {
    let extracted =
        std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|_| DigestError::Extraction("PDF parser panicked on this document".to_owned()))?
            .map_err(|err| DigestError::Extraction(format!("unreadable PDF: {err}")))?;

    let pages = extracted
        .into_iter()
        .take(max_pages.max(1))
        .map(|page| page.trim().to_owned())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>();

    if pages.is_empty() {
        return Err(DigestError::Extraction(
            "PDF has no extractable text layer".to_owned(),
        ));
    }
    Ok(pages)
}

/// Visible text of an HTML document: paragraphs when present, the body otherwise.
pub fn extract_html_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let paragraphs = match Selector::parse("p") {
        Ok(selector) => document
            .select(&selector)
            .map(|p| clean_text(&visible_text(p)))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>(),
        Err(_) => Vec::new(),
    };
    if !paragraphs.is_empty() {
        return paragraphs.join("\n\n");
    }

    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());
    clean_text(&visible_text(root))
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        out.push_str(text);
        out.push(' ');
    }
    out
}

pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn ensure_enough_text(text: &str, min_chars: usize) -> Result<()> {
    let chars = text.trim().chars().count();
    if chars < min_chars {
        return Err(DigestError::Extraction(format!(
            "extracted text is too short or empty ({chars} chars); the content may be inaccessible"
        )));
    }
    Ok(())
}
