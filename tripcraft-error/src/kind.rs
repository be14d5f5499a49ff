//! Error kinds for tripcraft operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to decide how to react. Configuration kinds
/// point at the YAML catalogs or the environment, upstream kinds at one of the
/// HTTP services, tool kinds at a model-issued tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// Invalid configuration or parameters
    ConfigInvalid,

    /// A named task or agent is not present in the configuration
    ConfigNotFound,

    /// A task was rendered without one of its required inputs
    MissingInput,

    // =========================================================================
    // Inference/LLM errors
    // =========================================================================
    /// LLM inference failed
    InferenceFailed,

    /// Provider not available (bad credentials, service down)
    ProviderUnavailable,

    /// Rate limit exceeded
    RateLimited,

    // =========================================================================
    // Upstream service errors
    // =========================================================================
    /// The geocoder returned no match for a place
    GeocodeNotFound,

    /// Network error
    NetworkFailed,

    // =========================================================================
    // Tool errors
    // =========================================================================
    /// A tool call named a tool nobody registered
    ToolUnknown,

    /// A tool ran but could not produce a result
    ToolFailed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// Failed to parse input or an upstream payload
    ParseFailed,

    /// Serialization/deserialization of local state failed
    SerializationFailed,

    /// Invalid argument passed to function
    InvalidArgument,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",

            // Configuration
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::ConfigNotFound => "ConfigNotFound",
            ErrorKind::MissingInput => "MissingInput",

            // Inference
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",

            // Upstream
            ErrorKind::GeocodeNotFound => "GeocodeNotFound",
            ErrorKind::NetworkFailed => "NetworkFailed",

            // Tools
            ErrorKind::ToolUnknown => "ToolUnknown",
            ErrorKind::ToolFailed => "ToolFailed",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",

            // Parse
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::InvalidArgument => "InvalidArgument",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::ProviderUnavailable
        )
    }

    /// Errors that come from the YAML catalogs or the environment
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConfigInvalid | ErrorKind::ConfigNotFound | ErrorKind::MissingInput
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::MissingInput.to_string(), "MissingInput");
        assert_eq!(ErrorKind::GeocodeNotFound.to_string(), "GeocodeNotFound");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(!ErrorKind::ConfigNotFound.is_retryable());
        assert!(!ErrorKind::GeocodeNotFound.is_retryable());
    }

    #[test]
    fn test_is_configuration() {
        assert!(ErrorKind::MissingInput.is_configuration());
        assert!(ErrorKind::ConfigNotFound.is_configuration());
        assert!(!ErrorKind::ToolFailed.is_configuration());
    }
}
