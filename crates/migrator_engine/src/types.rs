use migrator_core::ConfigError;
use thiserror::Error;

use crate::persist::PersistError;

/// Body and transfer details of one successful GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Why a single GET failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    #[error("invalid url")]
    InvalidUrl,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("redirect limit exceeded")]
    RedirectLimitExceeded,
    #[error("response too large (max {max_bytes}, actual {actual:?})")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
    #[error("unsupported content type {content_type}")]
    UnsupportedContentType { content_type: String },
    #[error("undecodable body")]
    Decode,
    #[error("network error")]
    Network,
}

/// Failures surfaced by discovery, item processing and the progress store.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Settings rejected before any state was touched.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Sitemap, container, directory or page file missing or unreadable.
    #[error("{0}")]
    Source(String),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// The content store refused to create the page.
    #[error("failed to create page: {0}")]
    Persist(#[source] PersistError),
    /// The progress record could not be read or written.
    #[error("progress store error: {0}")]
    Store(#[from] PersistError),
}

impl MigrationError {
    pub(crate) fn source_error(message: impl Into<String>) -> Self {
        MigrationError::Source(message.into())
    }
}
