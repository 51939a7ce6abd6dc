pub use strata_api::error::{ResourceError, Result};

/// Wrap a JSON decode failure of a resource file as a format error.
pub(crate) fn json_format(path: &str, err: serde_json::Error) -> ResourceError {
    ResourceError::Format(format!("{path}: invalid JSON: {err}"))
}
