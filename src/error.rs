use thiserror::Error;

/// Failure of a single backend request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::Status {
            status: status.as_u16(),
            body: truncate_error(body),
        }
    }
}

/// A required field was left empty. Raised before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub &'static str);

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("login URL is not configured; set [login] url in config.toml or TODOTERM_LOGIN_URL")]
    MissingLoginUrl,

    #[error("failed to start login callback listener: {0}")]
    Bind(String),

    #[error("login timed out after {0}s")]
    TimedOut(u64),

    #[error("login callback failed: {0}")]
    Callback(String),

    #[error("login cancelled")]
    Cancelled,
}

fn truncate_error(message: &str) -> String {
    let mut out = message.trim().replace(['\n', '\r'], " ");
    if out.len() > 240 {
        let mut cut = 240;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out.push_str("...");
    }
    out
}
