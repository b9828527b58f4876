use thiserror::Error;

/// Failures raised by the sync, reconcile and report operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cannot parse {0:?}, bad format")]
    ParseFailure(String),

    #[error("Remote service error: {0}")]
    Remote(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            let what = err
                .url()
                .map(|u| u.path().to_string())
                .unwrap_or_else(|| "resource".into());
            return SyncError::NotFound(what);
        }
        SyncError::Remote(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Remote(format!("unexpected response body: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
