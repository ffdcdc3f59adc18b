//! Builder pattern for link configuration.
//!
//! Provides a fluent API for configuring and spawning [`Driver`] and
//! [`EmbeddedClient`] instances.
//!
//! # Example
//!
//! ```no_run
//! use frame_rpc::{Bus, Driver};
//!
//! # async fn example() -> frame_rpc::Result<()> {
//! let bus = Bus::new();
//! let driver = Driver::builder(&bus)
//!     .frame_url("https://sim.example/run.html?frameid=sim-1")
//!     .spawn()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::error::Result;
use crate::link::{Link, Role};
use crate::transport::Bus;

use super::embedded::EmbeddedClient;
use super::frame::FrameHandle;
use super::host::Driver;
use super::options::LinkOptions;

// ============================================================================
// DriverBuilder
// ============================================================================

/// Builder for configuring a [`Driver`] instance.
///
/// Use [`Driver::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct DriverBuilder {
    /// Bus shared with the embedded context.
    bus: Bus,
    /// Link options.
    options: LinkOptions,
}

// ============================================================================
// DriverBuilder Implementation
// ============================================================================

impl DriverBuilder {
    /// Creates a new driver builder with default options.
    #[inline]
    #[must_use]
    pub fn new(bus: &Bus) -> Self {
        Self {
            bus: bus.clone(),
            options: LinkOptions::new(),
        }
    }

    /// Targets an existing frame handle.
    #[inline]
    #[must_use]
    pub fn frame(mut self, frame: &FrameHandle) -> Self {
        self.options = self.options.with_frame(frame);
        self
    }

    /// Targets the embedded context at `url`.
    ///
    /// Its `frameid` query parameter scopes bus traffic.
    #[inline]
    #[must_use]
    pub fn frame_url(mut self, url: impl Into<String>) -> Self {
        self.options = self.options.with_frame_url(url);
        self
    }

    /// Scopes bus traffic to `frame_id`.
    #[inline]
    #[must_use]
    pub fn frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.options = self.options.with_frame_id(frame_id);
        self
    }

    /// Enables or disables the automatic port upgrade of scoped links.
    #[inline]
    #[must_use]
    pub fn upgrade(mut self, upgrade: bool) -> Self {
        self.options = self.options.with_upgrade(upgrade);
        self
    }

    /// Drops inbound events whose kind does not match `pattern`.
    #[inline]
    #[must_use]
    pub fn accept_kinds(mut self, pattern: impl Into<String>) -> Self {
        self.options = self.options.with_accept_kinds(pattern);
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: LinkOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the options and spawns the driver.
    ///
    /// The driver announces itself on the bus immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid or no tokio runtime
    ///   is running
    /// - [`Error::Url`] if the frame URL does not parse
    /// - [`Error::Regex`] if the kind pattern does not compile
    ///
    /// [`Error::Config`]: crate::Error::Config
    /// [`Error::Url`]: crate::Error::Url
    /// [`Error::Regex`]: crate::Error::Regex
    pub fn spawn(self) -> Result<Driver> {
        let (frame, config) = self.options.resolve()?;
        debug!(frame_id = ?frame.frame_id(), upgrade = config.upgrade, "Spawning driver");

        let link = Link::spawn(Role::Host, &self.bus, config)?;
        Ok(Driver::new(link, frame))
    }
}

// ============================================================================
// EmbeddedClientBuilder
// ============================================================================

/// Builder for configuring an [`EmbeddedClient`] instance.
///
/// Use [`EmbeddedClient::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct EmbeddedClientBuilder {
    bus: Bus,
    options: LinkOptions,
}

impl EmbeddedClientBuilder {
    /// Creates a new client builder with default options.
    #[inline]
    #[must_use]
    pub fn new(bus: &Bus) -> Self {
        Self {
            bus: bus.clone(),
            options: LinkOptions::new(),
        }
    }

    /// Sets this context's own address.
    ///
    /// Its `frameid` query parameter scopes bus traffic.
    #[inline]
    #[must_use]
    pub fn location(mut self, url: impl Into<String>) -> Self {
        self.options = self.options.with_frame_url(url);
        self
    }

    /// Scopes bus traffic to `frame_id`.
    #[inline]
    #[must_use]
    pub fn frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.options = self.options.with_frame_id(frame_id);
        self
    }

    /// Drops inbound events whose kind does not match `pattern`.
    #[inline]
    #[must_use]
    pub fn accept_kinds(mut self, pattern: impl Into<String>) -> Self {
        self.options = self.options.with_accept_kinds(pattern);
        self
    }

    /// Replaces all options at once. The upgrade flag is ignored; the
    /// client only accepts upgrades offered by the host.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: LinkOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the options and spawns the client.
    ///
    /// The client announces readiness on the bus immediately.
    ///
    /// # Errors
    ///
    /// Same as [`DriverBuilder::spawn`].
    pub fn spawn(self) -> Result<EmbeddedClient> {
        let (frame, config) = self.options.resolve()?;
        debug!(frame_id = ?frame.frame_id(), "Spawning embedded client");

        let link = Link::spawn(Role::Embedded, &self.bus, config)?;
        Ok(EmbeddedClient::new(link, frame))
    }
}

// ============================================================================
// Tests
// ============================================================================
