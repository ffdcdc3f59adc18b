//! Error types for frame-rpc.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use frame_rpc::{Envelope, Result};
//!
//! async fn example(driver: &Driver) -> Result<()> {
//!     let response = driver.send_request(Envelope::new("compile"))?.await?;
//!     println!("{:?}", response.get("binary"));
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Lifecycle | [`Error::Disposed`], [`Error::ChannelClosed`] |
//! | Protocol | [`Error::Protocol`] |
//! | Remote | [`Error::Remote`], [`Error::RemoteFailure`] |
//! | External | [`Error::Json`], [`Error::Url`], [`Error::Regex`] |
//!
//! Only the remote category ever reaches a caller as the outcome of a
//! request. Protocol noise is logged and dropped inside the link.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by builders when link options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The link was disposed.
    ///
    /// Returned when a disposed driver or client is used again.
    #[error("Link disposed")]
    Disposed,

    /// The link was dropped while a response was outstanding.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed message, or an application message using a reserved kind.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// The remote side answered a request with `success: false` and an
    /// error value.
    #[error("Remote error: {message}")]
    Remote {
        /// Human-readable rendering of the error value.
        message: String,
        /// The error value exactly as the remote sent it.
        error: Value,
    },

    /// The remote side answered with `success: false` and no error value.
    #[error("Remote returned failure")]
    RemoteFailure,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid kind filter pattern.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates the rejection for a failed response.
    ///
    /// Strings are used verbatim as the message, objects contribute their
    /// `message` field when present, anything else is rendered as JSON.
    /// A missing or `null` error yields [`Error::RemoteFailure`].
    pub fn remote(error: Option<Value>) -> Self {
        let error = match error {
            None | Some(Value::Null) => return Self::RemoteFailure,
            Some(error) => error,
        };

        let message = match &error {
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("message").and_then(Value::as_str) {
                Some(m) => m.to_string(),
                None => error.to_string(),
            },
            other => other.to_string(),
        };

        Self::Remote { message, error }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the remote side reported the failure.
    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::RemoteFailure)
    }

    /// Returns `true` if the link was disposed or dropped.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed | Self::ChannelClosed(_))
    }

    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Url(_) | Self::Regex(_))
    }

    /// Returns the remote error value, if any.
    #[inline]
    #[must_use]
    pub fn remote_value(&self) -> Option<&Value> {
        match self {
            Self::Remote { error, .. } => Some(error),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
