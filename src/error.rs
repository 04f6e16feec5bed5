//! Error type shared by every stage of the H/V pipeline.

/// Result type for hvarma operations.
pub type Result<T> = std::result::Result<T, HvarmaError>;

/// Errors that can occur while loading data, fitting models or searching orders.
#[derive(Debug, thiserror::Error)]
pub enum HvarmaError {
    /// Invalid parameter record or parameter file.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Mismatched signal headers or lengths, or a window that does not fit.
    #[error("Input error: {0}")]
    Input(String),

    /// Singular linear system during a fit or a coherence inversion.
    #[error("Numeric error: {0}")]
    Numeric(String),

    /// Frequency bounds out of order or beyond the Nyquist frequency.
    #[error("Domain error: {0}")]
    Domain(String),

    /// The order search reached its ceiling without meeting the tolerance.
    #[error("No model order up to {ceiling} converges within tolerance {tol}")]
    ConvergenceFailure { ceiling: usize, tol: f64 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl HvarmaError {
    pub(crate) fn singular(context: &str) -> Self {
        HvarmaError::Numeric(format!("singular or ill-conditioned system ({context})"))
    }

    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        HvarmaError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
