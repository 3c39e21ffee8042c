use thiserror::Error;

/// Boxed error produced by a wrapped remote call
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure taxonomy of the cache-aside layer
///
/// Only [`CacheAsideError::RemoteCall`] (synchronous path) and
/// [`CacheAsideError::Deserialization`] (final payload decode) ever reach the
/// caller of a cached call. Every other variant is produced by collaborators
/// and absorbed by the orchestrator.
#[derive(Debug, Error)]
pub enum CacheAsideError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Encoding error: {message}")]
    Encoding { message: String },

    #[error("Decoding error: {message}")]
    Decoding { message: String },

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Unable to deserialize cached payload into response: {message}")]
    Deserialization { message: String },

    #[error(transparent)]
    RemoteCall(BoxError),
}

impl CacheAsideError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }

    pub fn remote_call(source: impl Into<BoxError>) -> Self {
        Self::RemoteCall(source.into())
    }

    /// Returns true if the error came from the wrapped remote call
    pub fn is_remote_call(&self) -> bool {
        matches!(self, Self::RemoteCall(_))
    }

    /// Returns the remote call's own error, if this is one
    pub fn into_remote_error(self) -> Option<BoxError> {
        match self {
            Self::RemoteCall(source) => Some(source),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for CacheAsideError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("upstream unavailable")]
    struct UpstreamError;

    #[test]
    fn test_configuration_error() {
        let error = CacheAsideError::configuration("hard ttl is not set");
        assert_eq!(error.to_string(), "Configuration error: hard ttl is not set");
    }

    #[test]
    fn test_backend_error() {
        let error = CacheAsideError::backend("connection refused");
        assert_eq!(error.to_string(), "Backend error: connection refused");
        assert!(!error.is_remote_call());
    }

    #[test]
    fn test_remote_call_error_is_transparent() {
        let error = CacheAsideError::remote_call(UpstreamError);
        assert_eq!(error.to_string(), "upstream unavailable");
        assert!(error.is_remote_call());

        let source = error.into_remote_error().unwrap();
        assert!(source.downcast_ref::<UpstreamError>().is_some());
    }

    #[test]
    fn test_into_remote_error_on_other_variant() {
        let error = CacheAsideError::decoding("bad gzip header");
        assert!(error.into_remote_error().is_none());
    }
}
