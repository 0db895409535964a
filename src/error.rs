use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse workflow_job event: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("cannot fetch {what}: {source}")]
    Fetch {
        what: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("webhook signature mismatch")]
    InvalidSignature,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn fetch(
        what: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Fetch {
            what: what.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
