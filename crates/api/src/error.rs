#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("specified resource is not configured")]
    NotFound,
    #[error("unknown resource path: {0}")]
    UnknownResource(String),
    #[error("invalid resource format: {0}")]
    Format(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid matcher configuration: {0}")]
    MatcherConfig(String),
    #[error("no language match")]
    NoLanguageMatch,
    #[error("unsupported update: {0}")]
    UnsupportedUpdate(String),
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("resource update conflict: {0}")]
    Conflict(String),
    #[error("invalid resource '{path}': too large ({size} > {max})")]
    TooLarge { path: String, size: usize, max: usize },
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ResourceError {
    /// Whether this is an ordinary "nothing configured here" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound)
    }

    /// Whether the error came from the underlying storage rather than the data.
    pub fn is_io(&self) -> bool {
        matches!(self, ResourceError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, ResourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            ResourceError::NotFound.to_string(),
            "specified resource is not configured"
        );
        assert!(ResourceError::NotFound.is_not_found());
    }

    #[test]
    fn test_io_is_distinguishable() {
        let err: ResourceError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(err.is_io());
        assert!(!err.is_not_found());
    }
}
