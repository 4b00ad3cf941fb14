use thiserror::Error;

/// Classified failures of the library surface. Decode failures and per-anchor
/// parse failures are deliberately absent: those are recovered where they
/// occur and never cross this boundary.
#[derive(Debug, Error)]
pub enum DirectError {
    #[error("no browser found; install Chrome, Chromium, or Brave, or set CHROME_EXECUTABLE")]
    BrowserUnavailable,

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

pub type DirectResult<T> = Result<T, DirectError>;
