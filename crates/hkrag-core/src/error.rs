use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing credentials for {provider}: {hint}")]
    MissingCredentials { provider: String, hint: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to load {path}: {message}")]
    Load { path: String, message: String },

    /// The store was populated by a different embedding model than the one configured.
    #[error("Embedding model mismatch: store was built with '{expected}', configured embedder is '{found}'")]
    EmbedderMismatch { expected: String, found: String },

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Configuration-class errors are fatal at startup rather than per request.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_) | Error::MissingCredentials { .. } | Error::EmbedderMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
