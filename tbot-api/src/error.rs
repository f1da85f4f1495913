//! Error taxonomy shared by the transport, the poller and the dispatcher.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The caller's cancellation token fired while an operation was pending.
    #[error("operation cancelled")]
    Cancelled,

    /// The bot token was rejected (error code 401). Never retried.
    #[error("unauthorized")]
    Unauthorized,

    /// The remote side answered HTTP 403. Never retried.
    #[error("forbidden")]
    Forbidden,

    /// Network or HTTP failure. Built with the request URL stripped, since the URL carries the
    /// bot token.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The remote API rejected the request (`ok: false`).
    #[error("apiError: {description}")]
    Api {
        description: String,
        error_code: i64,
        /// Seconds to wait before repeating the request, when the API asks for it.
        retry_after: Option<u64>,
    },

    #[error("{} required", fields.join(" or "))]
    Required { fields: Vec<String> },

    #[error("field {field} is invalid: {description}")]
    Validation { field: String, description: String },

    /// A panic raised inside a handler, converted into a value.
    #[error("panic: {0}")]
    Fault(String),
}

impl Error {
    pub fn required(fields: &[&str]) -> Self {
        Error::Required {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn transport(err: reqwest::Error) -> Self {
        Error::Transport(err.without_url())
    }

    pub fn validation(field: &str, description: &str) -> Self {
        Error::Validation {
            field: field.to_string(),
            description: description.to_string(),
        }
    }

    /// Unauthorized and Forbidden: retrying cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Error::Unauthorized | Error::Forbidden)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Errors raised locally before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(self, Error::Required { .. } | Error::Validation { .. })
    }

    /// Whether a long-poll loop should back off and try again after this error.
    ///
    /// API rejections are final unless the server named a `retry_after` delay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Decode(_)
                | Error::Api {
                    retry_after: Some(_),
                    ..
                }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
