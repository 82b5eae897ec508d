use std::fs::OpenOptions;
use std::io::{BufRead as _, BufReader, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::cli::PersistMode;
use crate::formats::DigestRecord;

pub const DEFAULT_LOG_PATH: &str = "paper_digests.jsonl";
pub const DEFAULT_DOCUMENTS_DIR: &str = "digests";

const DOCUMENT_PREFIX: &str = "paper_digest_";
const DOCUMENT_EXTENSION: &str = "docx";
const MAX_TITLE_CHARS: usize = 50;
const MAX_NAME_COLLISIONS: usize = 100;

#[derive(Debug, Clone)]
pub struct DigestStore {
    log_path: PathBuf,
    documents_dir: PathBuf,
    mode: PersistMode,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SavedDigest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_path: Option<PathBuf>,
}

impl SavedDigest {
    pub fn document_name(&self) -> Option<String> {
        self.document_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
    }
}

impl DigestStore {
    pub fn new(
        log_path: impl Into<PathBuf>,
        documents_dir: impl Into<PathBuf>,
        mode: PersistMode,
    ) -> Self {
        Self {
            log_path: log_path.into(),
            documents_dir: documents_dir.into(),
            mode,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    pub fn save(&self, record: &DigestRecord) -> anyhow::Result<SavedDigest> {
        let mut saved = SavedDigest::default();
        if self.mode.writes_log() {
            append_log(&self.log_path, record).context("append digest log")?;
            saved.log_path = Some(self.log_path.clone());
        }
        if self.mode.writes_document() {
            let path =
                write_document(&self.documents_dir, record).context("write digest document")?;
            saved.document_path = Some(path);
        }
        tracing::info!(
            title = %record.title(),
            log = ?saved.log_path,
            document = ?saved.document_path,
            "saved digest"
        );
        Ok(saved)
    }

    /// Resolves a download request to a generated document, rejecting anything else.
    pub fn document_path(&self, name: &str) -> Option<PathBuf> {
        is_document_filename(name).then(|| self.documents_dir.join(name))
    }
}

/// Appends `record` as one JSON line.
pub fn append_log(path: &Path, record: &DigestRecord) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log dir: {}", parent.display()))?;
    }

    let mut line = serde_json::to_string(record).context("serialize digest record")?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open digest log: {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("write digest log: {}", path.display()))?;
    Ok(())
}

/// Saved digests, newest first. Lines that do not parse are skipped.
pub fn read_log(path: &Path) -> anyhow::Result<Vec<DigestRecord>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("open digest log: {}", path.display()));
        }
    };

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("read digest log: {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DigestRecord>(&line) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(line = idx + 1, %err, "skipping unreadable digest log line");
            }
        }
    }

    records.reverse();
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(records)
}

pub fn write_document(dir: &Path, record: &DigestRecord) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create documents dir: {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp document in {}", dir.display()))?;
    crate::docx::write_digest(record, tmp.as_file_mut()).context("render docx")?;

    let base = document_stem(record);
    for attempt in 1..=MAX_NAME_COLLISIONS {
        let name = if attempt == 1 {
            format!("{base}.{DOCUMENT_EXTENSION}")
        } else {
            format!("{base}_{attempt}.{DOCUMENT_EXTENSION}")
        };
        let path = dir.join(name);
        match tmp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                tmp = err.file;
            }
            Err(err) => {
                return Err(err.error)
                    .with_context(|| format!("persist document: {}", path.display()));
            }
        }
    }
    anyhow::bail!("too many documents named {base}.{DOCUMENT_EXTENSION}")
}

/// `paper_digest_<SafeTitle>_<YYYYmmdd_HHMMSS>`
pub fn document_stem(record: &DigestRecord) -> String {
    let safe_title = safe_title(record.title());
    let timestamp = record.timestamp.format("%Y%m%d_%H%M%S");
    format!("{DOCUMENT_PREFIX}{safe_title}_{timestamp}")
}

fn safe_title(title: &str) -> String {
    let kept = title
        .chars()
        .take(MAX_TITLE_CHARS)
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>();
    let kept = kept.trim().replace(' ', "_");
    if kept.is_empty() {
        "untitled".to_owned()
    } else {
        kept
    }
}

pub fn is_document_filename(name: &str) -> bool {
    let Some(stem) = name
        .strip_prefix(DOCUMENT_PREFIX)
        .and_then(|rest| rest.strip_suffix(".docx"))
    else {
        return false;
    };
    !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
}
