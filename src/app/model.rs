use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::fetch::ContentKind;
use crate::formats::{DigestRecord, SourceInput};

pub const PREVIEW_CHARS: usize = 1_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Url,
    RawText,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    pub kind: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    pub chars: usize,
    pub preview: String,
}

/// Body of `POST /api/digest`. Holds the credential, so it is not `Debug`.
#[derive(Clone, Deserialize)]
pub struct DigestRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    pub mode: InputMode,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl DigestRequest {
    pub fn source(&self) -> SourceInput {
        match self.mode {
            InputMode::Url => SourceInput::Url(self.url.clone().unwrap_or_default()),
            InputMode::RawText => SourceInput::RawText(self.text.clone().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentLink {
    pub name: String,
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DigestResponse {
    pub digest: DigestRecord,
    pub note_markdown: String,
    pub truncated: bool,
    pub original_chars: usize,
    pub kept_chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_kind: Option<ContentKind>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

/// First `max_chars` characters, with an ellipsis when something was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_mode_selects_source() {
        let request: DigestRequest = serde_json::from_str(
            r#"{"mode":"raw_text","text":"paper body","url":"https://ignored.example"}"#,
        )
        .unwrap();
        assert_eq!(request.source(), SourceInput::RawText("paper body".to_owned()));

        let request: DigestRequest =
            serde_json::from_str(r#"{"mode":"url","api_key":"sk-1"}"#).unwrap();
        assert_eq!(request.source(), SourceInput::Url(String::new()));
        assert_eq!(request.api_key.as_deref(), Some("sk-1"));
    }

    #[test]
    fn preview_is_char_bounded() {
        assert_eq!(preview("abc", 5), "abc");
        assert_eq!(preview("ábcdé", 3), "ábc...");
    }
}
