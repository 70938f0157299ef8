use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the simulation engine and its collaborators.
///
/// None of these are recovered locally inside the engine: configuration and
/// initialization errors abort before the first snapshot, the rest abort the run.
#[derive(Debug, Error)]
pub enum Error {
    /// Run parameters outside their accepted ranges (N, L, T, radii, restitution...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Could not build a legal initial state (e.g. placement retry budget exhausted).
    #[error("initialization error: {0}")]
    Initialization(String),

    /// Invalid argument to a constructor or operator.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// A physical invariant was broken; carries particle diagnostics. Indicates a bug.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Snapshot emission failed.
    #[error("sink error: {0}")]
    Sink(String),

    /// Propagated I/O errors (configuration files).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = Error::Configuration("aperture must be < enclosure".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("aperture"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
        let e: Error = io.into();
        assert!(e.to_string().contains("missing.toml"));
    }
}
