use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown contest: {0}")]
    UnknownContest(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::UnknownContest(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// A feed fetch that produced no usable snapshot. Recovered by the engine
/// as an empty feed; never surfaced as a crash.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(u16),

    #[error("feed body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("feed body is not a JSON array")]
    NotAnArray,
}

/// A single bet record that cannot take part in aggregation. Contained
/// within the pipeline: the record is skipped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("odds missing")]
    MissingOdds,

    #[error("odds not an integer: {0}")]
    UnparseableOdds(String),

    #[error("odds of zero are not valid American odds")]
    ZeroOdds,

    #[error("odds out of range: {0}")]
    OddsOutOfRange(i64),

    #[error("unrecognised bet result: {0}")]
    UnknownResult(String),

    #[error("posted time not parseable: {0}")]
    UnparseablePostedTime(String),
}
