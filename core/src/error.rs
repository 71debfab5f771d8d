//! Error types for the feed client and the store.
//!
//! # Design
//! `FetchError` is the client's single failure channel. The store collapses
//! it into a display string for observers but keeps the `FailureKind` next to
//! it so callers and tests can still tell the categories apart.

use thiserror::Error;

use crate::date::{CalendarDate, DateBounds};

/// The round-trip never produced an HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport failed: {0}")]
pub struct TransportError(pub String);

/// Errors returned by `ApodClient`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// No connectivity, DNS failure, reset, timeout or malformed URL.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status. `message` is the feed's own
    /// explanation when the error body carried one.
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Http { status: u16, message: Option<String> },

    /// The body was not JSON or did not carry every required field.
    #[error("decode failed: {0}")]
    Decode(String),
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        FetchError::Transport(err.0)
    }
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) => FailureKind::Transport,
            FetchError::Http { status, .. } => FailureKind::Http(*status),
            FetchError::Decode(_) => FailureKind::Decode,
        }
    }

    /// Short text suitable for an error banner.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Transport(_) => {
                "Couldn't reach the picture service. Check your connection and try again.".into()
            }
            FetchError::Http { status: 400 | 404, .. } => {
                "No picture is available for this date.".into()
            }
            FetchError::Http { status: 401 | 403, .. } => {
                "The picture service rejected the API key.".into()
            }
            FetchError::Http { status: 429, .. } => {
                "Too many requests. The API rate limit was reached; try again later.".into()
            }
            FetchError::Http { status, .. } if *status >= 500 => {
                "The picture service is unavailable right now. Try again later.".into()
            }
            FetchError::Http { status, .. } => {
                format!("The picture service returned an unexpected status ({status}).")
            }
            FetchError::Decode(_) => {
                "The picture service sent a response that couldn't be read.".into()
            }
        }
    }
}

/// Category of the most recent failed load, kept alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Http(u16),
    Decode,
}

/// Rejected date selections. Nothing is clamped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("{date} is outside the available range {} to {}", .bounds.min, .bounds.max)]
    OutOfRange { date: CalendarDate, bounds: DateBounds },
}

/// Errors building an `ApodConfig`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API key is missing; set {0}")]
    MissingApiKey(&'static str),

    #[error("base URL {0:?} is not an http(s) URL")]
    InvalidBaseUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_display_includes_feed_message_when_present() {
        let err = FetchError::Http {
            status: 400,
            message: Some("Date must be between Jun 16, 1995 and Mar 01, 2024.".into()),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 400: Date must be between Jun 16, 1995 and Mar 01, 2024."
        );
        let bare = FetchError::Http { status: 502, message: None };
        assert_eq!(bare.to_string(), "HTTP 502");
    }

    #[test]
    fn kind_preserves_category() {
        assert_eq!(FetchError::Transport("reset".into()).kind(), FailureKind::Transport);
        assert_eq!(
            FetchError::Http { status: 429, message: None }.kind(),
            FailureKind::Http(429)
        );
        assert_eq!(FetchError::Decode("eof".into()).kind(), FailureKind::Decode);
    }

    #[test]
    fn user_messages_distinguish_common_statuses() {
        let msg = |status| FetchError::Http { status, message: None }.user_message();
        assert!(msg(429).contains("rate limit"));
        assert!(msg(404).contains("No picture"));
        assert!(msg(403).contains("API key"));
        assert!(msg(503).contains("unavailable"));
        assert!(msg(418).contains("418"));
    }

    #[test]
    fn transport_error_converts_into_fetch_error() {
        let err: FetchError = TransportError("timed out".into()).into();
        assert_eq!(err, FetchError::Transport("timed out".into()));
    }
}
