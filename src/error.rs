use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("scrape error: {0}")]
    Scrape(String),
    #[error("write error: {0}")]
    Write(String),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PipelineError::Network(format!("request timed out: {err}"))
        } else {
            PipelineError::Network(err.to_string())
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
