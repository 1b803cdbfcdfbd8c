use thiserror::Error;

/// Raised once when a destination is constructed from missing or internally
/// inconsistent settings. Fatal: no dispatcher exists in an invalid state,
/// so `track`/`page` can never observe one of these.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("settings.appId is required")]
    MissingAppId,
    #[error("settings.events must contain at least one mapping")]
    NoEventMappings,
    #[error("mobile projects must specify a fbAppId")]
    MissingMobileCredential,
    #[error("invalid endpoint base url")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// A single outbound request that could not be delivered, after the client
/// exhausted its retries. A failing request never cancels sibling requests
/// in the same fan-out batch.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("request could not be sent: {0}")]
    Request(#[from] reqwest::Error),
    #[error("destination answered {status}")]
    FailureStatus {
        status: http::StatusCode,
        body: String,
    },
}
