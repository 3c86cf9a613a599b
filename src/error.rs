use thiserror::Error;

/// Crate-level errors surfaced to callers of the aggregator
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Client errors (permanent - rejected at the boundary)
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    /// An explicit platform filter matched nothing in the registry
    #[error("No valid platforms specified. Available: {}", available.join(", "))]
    NoValidPlatforms { available: Vec<String> },

    #[error("Platform '{platform}' not found. Available: {}", available.join(", "))]
    UnknownPlatform {
        platform: String,
        available: Vec<String>,
    },
}

impl Error {
    /// Whether the error rejects the request itself rather than a single provider
    pub const fn is_request_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::NoValidPlatforms { .. } | Self::UnknownPlatform { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
