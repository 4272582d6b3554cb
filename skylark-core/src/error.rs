//! Feed errors.

use crate::types::UserId;

/// Error returned by feed operations.
///
/// Configuration and argument errors are returned synchronously from an
/// operation's entry point and never appear inside a [`crate::Response`];
/// operational failures in a multi-user call are captured per user
/// instead, which is why this type is `Clone`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    /// Invalid or conflicting configuration, including duplicate feed
    /// registration and duplicate option assignment in a builder.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Invalid call arguments (empty user list, zero page, ...).
    #[error("invalid argument: {message}")]
    Argument { message: String },

    /// Connection acquisition or network I/O failed.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The per-call deadline elapsed before the operation completed.
    #[error("operation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The backend returned a reply the provider could not interpret.
    #[error("provider error: {message}")]
    Provider { message: String },

    /// The operation required existing state for a user that has none.
    #[error("no feed state for user '{user}'")]
    NotFound { user: UserId },
}

impl FeedError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Argument { .. } => "argument",
            Self::Transport { .. } => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Provider { .. } => "provider",
            Self::NotFound { .. } => "not_found",
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new argument error
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout(elapsed_ms: u64) -> Self {
        Self::Timeout { elapsed_ms }
    }

    /// Create a new provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create a new "not found" error
    pub fn not_found(user: impl Into<UserId>) -> Self {
        Self::NotFound { user: user.into() }
    }

    /// Whether a bounded retry may help (transient transport failures).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(FeedError::config("x").kind(), "config");
        assert_eq!(FeedError::timeout(10).kind(), "timeout");
        assert_eq!(FeedError::not_found("7").kind(), "not_found");
    }

    #[test]
    fn test_retryable() {
        assert!(FeedError::transport("refused").is_retryable());
        assert!(!FeedError::timeout(5000).is_retryable());
        assert!(!FeedError::provider("bad reply").is_retryable());
    }

    #[test]
    fn test_display() {
        let err = FeedError::timeout(250);
        assert!(err.to_string().contains("250ms"));
    }
}
