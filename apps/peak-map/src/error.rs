use reqwest::StatusCode;
use thiserror::Error;

use crate::peak::PeakId;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The request never produced a response (connect failure, timeout).
    #[error("{method} {url} failed: {source}")]
    Network {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned {status}: {body}")]
    Server {
        method: &'static str,
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("{method} {url} returned an unreadable body: {source}")]
    Decode {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid peak API url: {0}")]
    Url(#[from] url::ParseError),
}

impl RepositoryError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RepositoryError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("no pending marker to edit")]
    NoPendingMarker,
    #[error("peak {0} is not on the map")]
    UnknownPeak(PeakId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
