//! Invoker configuration.

use serde::Deserialize;

pub const DEFAULT_INTERNAL_ERROR_MESSAGE: &str = "Error in application code";

/// Settings that shape how the invoker reports failures.
///
/// Deserializable so it can live next to the rest of the server configuration; missing
/// fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InvokerConfig {
    /// Message attached to failures that application code did not tag itself.
    pub internal_error_message: String,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            internal_error_message: DEFAULT_INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}
