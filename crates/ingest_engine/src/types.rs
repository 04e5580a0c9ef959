use std::fmt;

use tempfile::NamedTempFile;

/// Which fetch strategy a URL needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Other,
}

/// A response body streamed to a scratch file that is deleted on drop.
#[derive(Debug)]
pub struct Download {
    pub file: NamedTempFile,
    pub declared_mime: Option<String>,
    pub final_url: String,
    pub byte_len: u64,
}

#[derive(Debug)]
pub enum FetchedBody {
    Rendered(String),
    Streamed(Download),
}

#[derive(Debug)]
pub struct FetchOutput {
    pub body: FetchedBody,
    pub declared_mime: Option<String>,
}

impl FetchOutput {
    pub fn rendered(html: String) -> Self {
        Self {
            body: FetchedBody::Rendered(html),
            declared_mime: Some("text/html".to_string()),
        }
    }

    pub fn streamed(download: Download) -> Self {
        Self {
            declared_mime: download.declared_mime.clone(),
            body: FetchedBody::Streamed(download),
        }
    }
}

pub type FetchOutcome = Result<FetchOutput, FetchError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Render,
    Io,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Render => write!(f, "render error"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
