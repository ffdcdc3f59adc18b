//! Link configuration.
//!
//! # Example
//!
//! ```
//! use frame_rpc::LinkOptions;
//!
//! let options = LinkOptions::new()
//!     .with_frame_url("https://sim.example/run.html?frameid=sim-1")
//!     .with_accept_kinds("^(sim|debugger)");
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use regex::Regex;

use crate::error::{Error, Result};
use crate::identifiers::FrameId;
use crate::link::LinkConfig;

use super::frame::FrameHandle;

// ============================================================================
// LinkOptions
// ============================================================================

/// Settings shared by [`Driver`] and [`EmbeddedClient`].
///
/// Plain data; checked when a link is spawned.
///
/// [`Driver`]: crate::Driver
/// [`EmbeddedClient`]: crate::EmbeddedClient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    /// Explicit frame id scoping bus traffic.
    pub frame_id: Option<String>,

    /// Address of the embedded context; its `frameid` parameter scopes bus
    /// traffic when no explicit id is set.
    pub frame_url: Option<String>,

    /// Upgrade to a dedicated port once the remote side is ready.
    ///
    /// Only a scoped host upgrades automatically. Defaults to `true`.
    pub upgrade: bool,

    /// Regular expression inbound event kinds must match.
    pub accept_kinds: Option<String>,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl LinkOptions {
    /// Creates options with default settings: unscoped, upgrades enabled,
    /// every event kind accepted.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frame_id: None,
            frame_url: None,
            upgrade: true,
            accept_kinds: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl LinkOptions {
    /// Sets the frame id.
    #[inline]
    #[must_use]
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = Some(frame_id.into());
        self
    }

    /// Sets the embedded context's address.
    #[inline]
    #[must_use]
    pub fn with_frame_url(mut self, url: impl Into<String>) -> Self {
        self.frame_url = Some(url.into());
        self
    }

    /// Enables or disables the automatic port upgrade.
    #[inline]
    #[must_use]
    pub fn with_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }

    /// Restricts inbound event kinds to those matching `pattern`.
    #[inline]
    #[must_use]
    pub fn with_accept_kinds(mut self, pattern: impl Into<String>) -> Self {
        self.accept_kinds = Some(pattern.into());
        self
    }

    /// Copies address and frame id from an existing handle.
    #[must_use]
    pub fn with_frame(mut self, frame: &FrameHandle) -> Self {
        self.frame_url = frame.url().map(ToString::to_string);
        self.frame_id = frame.frame_id().map(ToString::to_string);
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl LinkOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the frame id is empty or disagrees with the
    ///   `frameid` parameter of the frame URL
    /// - [`Error::Url`] if the frame URL does not parse
    /// - [`Error::Regex`] if the kind pattern does not compile
    pub fn validate(&self) -> Result<()> {
        self.resolve().map(|_| ())
    }

    /// Resolves the options into the frame handle and link settings.
    pub(crate) fn resolve(&self) -> Result<(FrameHandle, LinkConfig)> {
        let frame = self.resolve_frame()?;

        let kind_filter = self
            .accept_kinds
            .as_deref()
            .map(Regex::new)
            .transpose()?;

        let config = LinkConfig {
            frame_id: frame.frame_id().cloned(),
            upgrade: self.upgrade,
            kind_filter,
        };

        Ok((frame, config))
    }

    fn resolve_frame(&self) -> Result<FrameHandle> {
        let explicit = match self.frame_id.as_deref() {
            Some(raw) => Some(FrameId::new(raw).ok_or_else(|| {
                Error::config("frame id must not be empty. Omit it to leave the link unscoped.")
            })?),
            None => None,
        };

        let Some(url) = self.frame_url.as_deref() else {
            return Ok(FrameHandle::new(explicit));
        };

        let frame = FrameHandle::from_url(url)?;
        let Some(explicit) = explicit else {
            return Ok(frame);
        };

        if let Some(from_url) = frame.frame_id()
            && from_url != &explicit
        {
            return Err(Error::config(format!(
                "frame id `{explicit}` disagrees with `frameid={from_url}` in the frame URL"
            )));
        }

        Ok(frame.scoped_to(explicit))
    }
}

// ============================================================================
// Tests
// ============================================================================
