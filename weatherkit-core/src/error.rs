use std::{io, path::PathBuf};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything that can go wrong while turning a request payload into a report.
#[derive(Debug, Error)]
pub enum WeatherKitError {
    #[error("invalid request payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("no private key path supplied in request")]
    KeyPathMissing,

    #[error("failed to read private key {}: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid EC private key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign WeatherKit token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("failed to encode token segment: {0}")]
    TokenEncoding(#[source] serde_json::Error),

    #[error("invalid WeatherKit endpoint: {0}")]
    Endpoint(String),

    #[error("request to WeatherKit failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("WeatherKit request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse WeatherKit JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("WeatherKit response was not a JSON object")]
    NotAnObject,
}

/// Coarse classification reported to the front-end in error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    FileAccess,
    Transport,
    Parse,
}

impl WeatherKitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPayload(_)
            | Self::InvalidKey(_)
            | Self::Signing(_)
            | Self::TokenEncoding(_)
            | Self::Endpoint(_) => ErrorKind::Configuration,
            Self::KeyPathMissing | Self::KeyFile { .. } => ErrorKind::FileAccess,
            Self::Transport(_) | Self::Status { .. } => ErrorKind::Transport,
            Self::Parse(_) | Self::NotAnObject => ErrorKind::Parse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_are_transport_failures() {
        let err = WeatherKitError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        };

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn key_file_errors_name_the_path() {
        let err = WeatherKitError::KeyFile {
            path: PathBuf::from("/nope/AuthKey.p8"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };

        assert_eq!(err.kind(), ErrorKind::FileAccess);
        assert!(err.to_string().contains("/nope/AuthKey.p8"));
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::FileAccess).unwrap();
        assert_eq!(json, "\"file_access\"");
    }
}
