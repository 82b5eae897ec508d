use serde::Serialize;

/// Failure of one pass through the digest pipeline.
///
/// Every variant is recoverable: callers surface the message and the tool
/// stays usable for the next request.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("failed to fetch content from URL: {0}")]
    Fetch(String),

    #[error("failed to extract text: {0}")]
    Extraction(String),

    #[error("summarization API rejected the credential: {0}")]
    Auth(String),

    #[error("summarization API rate limit reached: {0}")]
    RateLimit(String),

    #[error("summarization API error: {0}")]
    Api(String),

    #[error("failed to save digest: {0:#}")]
    Persist(anyhow::Error),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Fetch,
    Extraction,
    Auth,
    RateLimit,
    Api,
    Persist,
}

impl DigestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::Auth(_) => ErrorKind::Auth,
            Self::RateLimit(_) => ErrorKind::RateLimit,
            Self::Api(_) => ErrorKind::Api,
            Self::Persist(_) => ErrorKind::Persist,
        }
    }
}

pub type Result<T, E = DigestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_snake_case() {
        let err = DigestError::RateLimit("slow down".to_owned());
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(
            serde_json::to_string(&err.kind()).unwrap(),
            "\"rate_limit\""
        );
    }

    #[test]
    fn persist_message_includes_context_chain() {
        let inner = anyhow::anyhow!("disk full").context("append digest log");
        let err = DigestError::Persist(inner);
        assert_eq!(
            err.to_string(),
            "failed to save digest: append digest log: disk full"
        );
    }
}
