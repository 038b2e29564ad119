//! Domain-specific errors.

use saphyr_parser::ScanError;
use thiserror::Error;

/// Reasons a manifest produced no application entries.
///
/// None of these reach the user during normal reconciling: the locator turns
/// them into an empty result. They exist so that strict callers can explain
/// an empty result.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("malformed YAML: {0}")]
    Parse(#[from] ScanError),
    #[error("unexpected YAML event stream: {0}")]
    Compose(String),
    #[error("expected exactly one YAML document, found {documents}")]
    UnsupportedShape { documents: usize },
}

impl LocateError {
    pub(crate) fn compose(message: impl Into<String>) -> Self {
        Self::Compose(message.into())
    }
}
