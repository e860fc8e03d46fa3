//! Error types for the login flow.
//!
//! # Design
//!
//! - Constant messages; context lives in structured fields.
//! - Transport failures keep the `reqwest` source untouched so callers see timeouts and
//!   connection errors exactly as the client reported them.
//! - `AuthErrorKind` folds every variant into a remediation class; local faults are
//!   kept apart from network failures.

use thiserror::Error;

/// Result alias for login operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised while validating input or driving the login flow.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username did not match the `[bmd]` + seven digits shape.
    #[error("invalid username")]
    InvalidUsername {
        /// Username supplied by the caller.
        given: String,
    },
    /// Both form bundles of the protocol configuration were empty.
    #[error("protocol configuration incomplete")]
    ConfigIncomplete,
    /// The identity provider rejected the submission, or answered with an unexpected page.
    #[error("authentication failed: {message}")]
    AuthFailed {
        /// Human-readable reason, taken from the IdP page when it provides one.
        message: String,
    },
    /// An HTTP exchange failed before a response could be read.
    #[error("http exchange failed")]
    Transport {
        /// Exchange that failed.
        operation: &'static str,
        /// Target URL of the failed exchange.
        url: String,
        /// Underlying client error.
        source: reqwest::Error,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build http client")]
    ClientBuild {
        /// Underlying client error.
        source: reqwest::Error,
    },
    /// A serialized protocol configuration could not be read or written.
    #[error("invalid protocol configuration document")]
    ConfigDocument {
        /// Underlying serde error.
        source: serde_json::Error,
    },
    /// A configured or extracted URL could not be parsed.
    #[error("invalid url")]
    InvalidUrl {
        /// Field the URL came from.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// A CSS selector used to inspect IdP pages did not parse.
    #[error("invalid html selector")]
    InvalidSelector {
        /// Offending selector.
        selector: String,
    },
    /// The username pattern did not compile.
    #[error("username pattern failed to compile")]
    UsernamePattern {
        /// Pattern that failed.
        pattern: &'static str,
        /// Underlying regex error.
        source: regex::Error,
    },
}

/// Coarse classification used to pick a remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Fix the credentials or configuration.
    InvalidInput,
    /// The IdP refused the login.
    Rejected,
    /// The server could not be reached; retrying later may help.
    Unreachable,
    /// A local fault in client construction or page inspection; retrying will not help.
    Internal,
}

impl AuthError {
    /// Shorthand for an [`AuthError::AuthFailed`] with the given message.
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::AuthFailed {
            message: message.into(),
        }
    }

    pub(crate) fn transport(
        operation: &'static str,
        url: impl Into<String>,
        source: reqwest::Error,
    ) -> Self {
        Self::Transport {
            operation,
            url: url.into(),
            source,
        }
    }

    pub(crate) fn invalid_url(
        field: &'static str,
        value: impl Into<String>,
        source: url::ParseError,
    ) -> Self {
        Self::InvalidUrl {
            field,
            value: value.into(),
            source,
        }
    }

    /// Classify the error for the caller.
    #[must_use]
    pub const fn kind(&self) -> AuthErrorKind {
        match self {
            Self::InvalidUsername { .. }
            | Self::ConfigIncomplete
            | Self::ConfigDocument { .. }
            | Self::InvalidUrl { .. } => AuthErrorKind::InvalidInput,
            Self::AuthFailed { .. } => AuthErrorKind::Rejected,
            Self::Transport { .. } => AuthErrorKind::Unreachable,
            Self::ClientBuild { .. }
            | Self::InvalidSelector { .. }
            | Self::UsernamePattern { .. } => AuthErrorKind::Internal,
        }
    }
}
