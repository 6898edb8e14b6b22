use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Import cancelled by user")]
    Cancelled,

    #[error("Invalid source document: {reason}")]
    InvalidSource { reason: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ImportError {
    pub fn invalid_source(reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
