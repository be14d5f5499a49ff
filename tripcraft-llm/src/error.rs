//! LLM error types
//!
//! Re-exports tripcraft-error and maps provider failures onto it.

pub use tripcraft_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::provider::ProviderError;

impl ProviderError {
    /// Convert into the unified error, recording which operation was running
    pub fn into_error(self, operation: &'static str) -> Error {
        let err = match &self {
            ProviderError::Network(_) => Error::new(ErrorKind::NetworkFailed, self.to_string()),
            ProviderError::RateLimited { retry_after } => {
                let err = Error::new(ErrorKind::RateLimited, self.to_string());
                match retry_after {
                    Some(secs) => err.with_context("retry_after", secs.to_string()),
                    None => err,
                }
            }
            ProviderError::AuthenticationFailed => {
                Error::new(ErrorKind::ProviderUnavailable, self.to_string()).permanent()
            }
            ProviderError::Api { status, .. } => {
                Error::inference_failed(self.to_string()).with_context("status", status.to_string())
            }
            ProviderError::Parse(_) => Error::parse_failed(self.to_string()),
            ProviderError::InvalidRequest(_) => Error::invalid_argument(self.to_string()),
            ProviderError::ModelNotFound(model) => {
                Error::config_invalid(self.to_string()).with_context("model", model.clone())
            }
            ProviderError::Other(_) => Error::inference_failed(self.to_string()),
        };
        err.with_operation(operation)
    }
}
