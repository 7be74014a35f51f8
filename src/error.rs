use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid cache ttl {0}ms: must be positive")]
    InvalidTtl(i64),

    #[error("Upstream source '{source_name}' unavailable: {details}")]
    Upstream {
        source_name: String,
        details: String,
    },

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl DashboardError {
    pub fn upstream(source_name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Upstream {
            source_name: source_name.into(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
