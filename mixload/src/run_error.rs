use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    /// Rejected while composing the workload; nothing was sent.
    InvalidInput(anyhow::Error),
    /// Failed while executing the workload.
    RuntimeError(anyhow::Error),
}

impl RunError {
    /// Configuration errors from the core are input errors; anything else is a runtime error.
    pub fn from_core(err: mixload_core::Error, context: &'static str) -> Self {
        if err.is_configuration() {
            Self::InvalidInput(anyhow::Error::new(err).context(context))
        } else {
            Self::RuntimeError(anyhow::Error::new(err).context(context))
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => e,
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(e) => write!(f, "composition failed: {e:#}"),
            Self::RuntimeError(e) => write!(f, "execution failed: {e:#}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}
