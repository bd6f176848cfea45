//! Identifiers for feedback loops.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a feedback loop.
///
/// Used to detect reentrant reduction of the same loop and to correlate log
/// lines from one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(u64);

impl LoopId {
    /// Generate a new unique loop ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for LoopId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_ids_are_unique() {
        let id1 = LoopId::new();
        let id2 = LoopId::new();
        let id3 = LoopId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn display_is_prefixed() {
        let id = LoopId::new();
        assert_eq!(id.to_string(), format!("loop#{}", id.0));
    }
}
