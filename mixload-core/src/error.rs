pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: `{field}` {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    #[error("duplicate traffic profile `{0}`")]
    DuplicateProfile(String),

    #[error("execution engine failed: {0}")]
    EngineLaunch(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while validating inputs, before anything runs.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration { .. } | Self::InvalidWeights(_) | Self::DuplicateProfile(_)
        )
    }
}
