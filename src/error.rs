use std::path::PathBuf;

/// A source could not be reached or answered with a non-success status.
/// The run skips that source and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {inner}")]
    Transport {
        url: String,
        #[source]
        inner: reqwest::Error,
    },
    #[error("{0} is not set")]
    MissingCredential(String),
}

impl FetchError {
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { url: url.to_string() }
        } else if let Some(status) = err.status() {
            Self::Status {
                url: url.to_string(),
                status,
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                inner: err,
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unrecognised date text: {0:?}")]
    Date(String),
    #[error("unexpected feed shape from {url}: {inner}")]
    Feed {
        url: String,
        #[source]
        inner: serde_json::Error,
    },
}

/// The store does not look the way the serializer expects. Always fatal,
/// and always raised before anything is written.
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    #[error("insertion marker {marker:?} not found in {}", path.display())]
    MissingMarker { path: PathBuf, marker: String },
    #[error("{} does not contain a top-level JSON array", path.display())]
    NotAnArray { path: PathBuf },
    #[error("{} is not valid JSON: {inner}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        inner: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("store i/o on {}: {inner}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        inner: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
