//! Scoped animation batches
//!
//! A batch groups every animation started between `begin_batch` and
//! `end_batch` and reports a single completion once the batch has been ended
//! and all of its animations have finished. The transition controller uses
//! this to know when a whole transition is done; tiles use it for the idle
//! rotation wobble. Batch ids are never reused; the stage drops a batch's
//! bookkeeping as soon as it completes.

/// Handle to a batch owned by a [`Stage`](super::Stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId(pub(super) usize);

#[derive(Debug)]
pub(super) struct BatchState {
    /// Animations started under this batch that have not finished yet
    pub remaining: usize,
    /// Whether `end_batch` has been called
    pub ended: bool,
}

impl BatchState {
    pub fn new() -> Self {
        Self {
            remaining: 0,
            ended: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.ended && self.remaining == 0
    }
}
