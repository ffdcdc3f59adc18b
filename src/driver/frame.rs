//! Handle to an embedded context.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::Result;
use crate::identifiers::FrameId;

// ============================================================================
// Constants
// ============================================================================

/// Query parameter carrying the frame identity in an embedded context's URL.
pub const FRAME_ID_PARAM: &str = "frameid";

// ============================================================================
// FrameHandle
// ============================================================================

/// The embedded context a [`Driver`] talks to.
///
/// Identified by its address and, when several contexts share one bus,
/// by a frame id taken from the [`FRAME_ID_PARAM`] query parameter.
///
/// # Example
///
/// ```
/// use frame_rpc::FrameHandle;
///
/// let frame = FrameHandle::from_url("https://sim.example/run.html?frameid=sim-1")?;
/// assert_eq!(frame.frame_id().map(|id| id.as_str()), Some("sim-1"));
/// # Ok::<(), frame_rpc::Error>(())
/// ```
///
/// [`Driver`]: crate::Driver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameHandle {
    url: Option<Url>,
    frame_id: Option<FrameId>,
}

impl FrameHandle {
    /// Creates a handle with an explicit frame id and no address.
    #[inline]
    #[must_use]
    pub fn new(frame_id: Option<FrameId>) -> Self {
        Self {
            url: None,
            frame_id,
        }
    }

    /// Creates a handle from the context's address.
    ///
    /// An empty or missing `frameid` parameter leaves the handle unscoped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`](crate::Error::Url) if `url` does not parse.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        let frame_id = url
            .query_pairs()
            .find(|(key, _)| key == FRAME_ID_PARAM)
            .and_then(|(_, value)| FrameId::new(value.into_owned()));

        Ok(Self {
            url: Some(url),
            frame_id,
        })
    }

    /// Returns the handle scoped to `frame_id`.
    #[inline]
    #[must_use]
    pub fn scoped_to(mut self, frame_id: FrameId) -> Self {
        self.frame_id = Some(frame_id);
        self
    }

    /// Returns the context's address, if known.
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Returns the frame id scoping bus traffic, if any.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> Option<&FrameId> {
        self.frame_id.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================
