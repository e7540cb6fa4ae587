use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure or a non-success HTTP status.
    #[error("Network failure fetching {url}: {message}")]
    Network { url: String, message: String },

    /// The backend answered but flagged the request as unsuccessful.
    #[error("Backend rejected request: {message}")]
    Backend { message: String },

    #[error("Response envelope failed schema validation: {}", .violations.join("; "))]
    Schema { violations: Vec<String> },

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl RosterError {
    /// True for failures that belong to the fetch cycle (transport, status, backend refusal, bad envelope).
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            RosterError::Network { .. }
                | RosterError::Backend { .. }
                | RosterError::Schema { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RosterError>;
