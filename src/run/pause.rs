//! Cooperative pause flag shared between the run loop and its controllers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable pause request flag.
///
/// The run loop checks it once per iteration, before planning the next
/// batch. A batch already sent to the model always finishes and is applied.
#[derive(Debug, Clone, Default)]
pub struct PauseToken {
    flag: Arc<AtomicBool>,
}

impl PauseToken {
    /// A token with no pause requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a pause at the next suspension point.
    pub fn pause(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clears a pending pause request.
    pub fn resume(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Whether a pause has been requested.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
