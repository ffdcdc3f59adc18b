//! Public link handles.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Driver`] | Host-side handle to an embedded context |
//! | [`EmbeddedClient`] | Embedded-side handle to the host |
//! | [`DriverBuilder`], [`EmbeddedClientBuilder`] | Fluent configuration builders |
//! | [`LinkOptions`] | Shared link settings |
//! | [`FrameHandle`] | Address and frame id of an embedded context |
//!
//! # Example
//!
//! ```no_run
//! use frame_rpc::{Bus, Driver, EmbeddedClient, Envelope, Result, listener};
//!
//! # async fn example() -> Result<()> {
//! let bus = Bus::new();
//!
//! let client = EmbeddedClient::builder(&bus).frame_id("sim-1").spawn()?;
//! let responder = client.clone();
//! client.on("ping", listener(move |request| {
//!     let _ = responder.respond(request, Ok(Default::default()));
//! }));
//!
//! let driver = Driver::builder(&bus).frame_id("sim-1").spawn()?;
//! driver.send_request(Envelope::new("ping"))?.await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builders for drivers and clients.
pub mod builder;

/// Embedded-side handle.
pub mod embedded;

/// Embedded context address and identity.
pub mod frame;

/// Host-side handle.
pub mod host;

/// Link settings.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{DriverBuilder, EmbeddedClientBuilder};
pub use embedded::EmbeddedClient;
pub use frame::{FRAME_ID_PARAM, FrameHandle};
pub use host::Driver;
pub use options::LinkOptions;
