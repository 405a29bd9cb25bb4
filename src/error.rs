use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why the inspection gate refused a class file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    PackageInfo,
    Groovy,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::PackageInfo => f.write_str("package-info class"),
            SkipReason::Groovy => f.write_str("Groovy class"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DecompileError {
    #[error("skipped by policy: {0}")]
    SkippedByPolicy(SkipReason),

    #[error("bytecode requested for a path outside the unit set: {0}")]
    ProviderNotFound(String),

    #[error("engine failure: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A failure that already went through the engine logger. Never wrapped twice.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        cause: BoxError,
    },
}

impl DecompileError {
    pub fn engine<E: std::fmt::Display>(e: E) -> Self {
        Self::Engine(e.to_string())
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Wraps `self` as an internal failure unless it already is one.
    pub fn into_internal(self, message: impl Into<String>) -> Self {
        if self.is_internal() {
            return self;
        }
        Self::Internal {
            message: message.into(),
            cause: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn into_internal_wraps_plain_failures_once() {
        let err = DecompileError::engine("boom").into_internal("decompiling Foo.class");
        assert!(err.is_internal());
        assert_eq!(err.to_string(), "decompiling Foo.class");
        assert_eq!(
            err.source().map(|s| s.to_string()).as_deref(),
            Some("engine failure: boom")
        );

        let again = err.into_internal("outer");
        assert_eq!(again.to_string(), "decompiling Foo.class");
        let inner = again.source().expect("cause is kept");
        assert!(inner.source().is_none());
    }

    #[test]
    fn io_errors_convert_into_io_variant() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DecompileError = io.into();
        assert!(matches!(err, DecompileError::Io(_)));
        assert!(!err.is_internal());
    }
}
