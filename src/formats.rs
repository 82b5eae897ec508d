use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the paper text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    Url(String),
    RawText(String),
}

impl SourceInput {
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Url(_) => SourceType::Url,
            Self::RawText(_) => SourceType::RawText,
        }
    }

    pub fn source_url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url.as_str()),
            Self::RawText(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Url,
    RawText,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::RawText => "raw_text",
        }
    }
}

/// Sections the model is asked to fill in, as parsed from a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestFields {
    pub title: String,
    pub field_or_topic: String,
    pub research_question: String,
    pub methodology: String,
    pub key_findings: Vec<String>,
    pub limitations: String,
    pub personal_takeaway: String,
}

impl DigestFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.field_or_topic.is_empty()
            && self.research_question.is_empty()
            && self.methodology.is_empty()
            && self.key_findings.is_empty()
            && self.limitations.is_empty()
            && self.personal_takeaway.is_empty()
    }
}

/// One structured reading note. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestRecord {
    #[serde(flatten)]
    pub fields: DigestFields,
    pub timestamp: DateTime<Utc>,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl DigestRecord {
    pub fn new(fields: DigestFields, source: &SourceInput) -> Self {
        Self::with_timestamp(fields, source, Utc::now())
    }

    pub fn with_timestamp(
        fields: DigestFields,
        source: &SourceInput,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            fields,
            timestamp,
            source_type: source.source_type(),
            source_url: source.source_url().map(ToOwned::to_owned),
        }
    }

    pub fn title(&self) -> &str {
        &self.fields.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_flat_without_missing_url() {
        let fields = DigestFields {
            title: "Foo".to_owned(),
            key_findings: vec!["Z".to_owned()],
            ..DigestFields::default()
        };
        let record = DigestRecord::new(fields, &SourceInput::RawText("text".to_owned()));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["title"], "Foo");
        assert_eq!(value["key_findings"][0], "Z");
        assert_eq!(value["source_type"], "raw_text");
        assert!(value.get("source_url").is_none());
        assert!(value.get("fields").is_none());
    }

    #[test]
    fn url_source_keeps_link() {
        let source = SourceInput::Url("https://example.com/p.pdf".to_owned());
        let record = DigestRecord::new(DigestFields::default(), &source);
        assert_eq!(record.source_type, SourceType::Url);
        assert_eq!(
            record.source_url.as_deref(),
            Some("https://example.com/p.pdf")
        );
    }
}
