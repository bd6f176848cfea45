//! Reduction Scope
//!
//! Tracks which loops are currently reducing on this thread. A loop may be
//! entered at most once per thread at a time: entering a loop that is already
//! on the stack means `perform` or `update` was called from inside its own
//! reducer, which would break the one-reduction-at-a-time guarantee.
//!
//! # Implementation
//!
//! A thread-local stack of loop IDs. Entering pushes; dropping the returned
//! guard pops. Different loops may nest (a reducer of one loop performing an
//! action on another loop confined to the same thread).

use std::cell::RefCell;

use crate::id::LoopId;

thread_local! {
    static REDUCING: RefCell<Vec<LoopId>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the loop off the reduction stack when dropped.
///
/// This keeps the stack balanced even if the reducer panics.
pub(crate) struct ReductionScope {
    loop_id: LoopId,
}

impl ReductionScope {
    /// Mark `loop_id` as reducing on this thread.
    ///
    /// # Panics
    ///
    /// Panics if `loop_id` is already reducing on this thread.
    pub(crate) fn enter(loop_id: LoopId) -> Self {
        if Self::is_reducing(loop_id) {
            panic!(
                "reentrant reduction of {loop_id}: \
                 perform/update must not be called from inside the reducer"
            );
        }

        REDUCING.with(|stack| stack.borrow_mut().push(loop_id));
        Self { loop_id }
    }

    /// Check whether `loop_id` is reducing on this thread.
    pub(crate) fn is_reducing(loop_id: LoopId) -> bool {
        REDUCING.with(|stack| stack.borrow().contains(&loop_id))
    }

    /// Number of reductions currently on this thread's stack.
    #[cfg(test)]
    pub(crate) fn depth() -> usize {
        REDUCING.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReductionScope {
    fn drop(&mut self) {
        REDUCING.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(id) = popped {
                debug_assert_eq!(
                    id, self.loop_id,
                    "ReductionScope mismatch: expected {:?}, got {:?}",
                    self.loop_id, id
                );
            }
        });
    }
}
