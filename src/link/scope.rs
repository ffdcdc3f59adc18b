//! Frame identity filter.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::identifiers::FrameId;
use crate::protocol::frame_id_of;

// ============================================================================
// FrameScope
// ============================================================================

/// Restricts a link to bus traffic tagged with its own frame id.
///
/// Unscoped links admit everything. A scoped link admits only messages
/// whose `frameId` matches; untagged messages are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameScope {
    frame_id: Option<FrameId>,
}

impl FrameScope {
    /// Creates a scope.
    #[inline]
    #[must_use]
    pub fn new(frame_id: Option<FrameId>) -> Self {
        Self { frame_id }
    }

    /// Returns the scoped frame id.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> Option<&FrameId> {
        self.frame_id.as_ref()
    }

    /// Returns `true` if the scope filters traffic.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.frame_id.is_some()
    }

    /// Returns `true` if a wire value belongs to this scope.
    #[must_use]
    pub fn admits(&self, value: &Value) -> bool {
        match &self.frame_id {
            None => true,
            Some(frame_id) => frame_id_of(value) == Some(frame_id.as_str()),
        }
    }

    /// Drops the filter once a dedicated port makes it redundant.
    #[inline]
    pub fn clear(&mut self) {
        self.frame_id = None;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_unscoped_admits_everything() {
        let scope = FrameScope::default();
        assert!(!scope.is_active());
        assert!(scope.admits(&json!({ "kind": "x" })));
        assert!(scope.admits(&json!({ "kind": "x", "frameId": "b" })));
    }

    #[test]
    fn test_scoped_admits_only_matching() {
        let scope = FrameScope::new(FrameId::new("a"));
        assert!(scope.admits(&json!({ "kind": "x", "frameId": "a" })));
        assert!(!scope.admits(&json!({ "kind": "x", "frameId": "b" })));
        assert!(!scope.admits(&json!({ "kind": "x" })));
    }

    #[test]
    fn test_clear() {
        let mut scope = FrameScope::new(FrameId::new("a"));
        scope.clear();
        assert!(scope.frame_id().is_none());
        assert!(scope.admits(&json!({ "frameId": "b" })));
    }
}
