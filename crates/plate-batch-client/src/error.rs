use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid endpoint url '{value}'")]
    InvalidUrl { value: String },

    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("failed to parse response from {url}: {source}")]
    Body { url: String, source: reqwest::Error },
}

impl ClientError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
