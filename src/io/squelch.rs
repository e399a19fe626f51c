use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Reentrant advisory counter held while the core writes documents, so the
/// change listener can tell its own writes from external edits.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct Squelch {
    depth: Arc<AtomicUsize>,
}

impl Squelch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a squelched section. The section ends when the guard drops.
    pub fn hold(&self) -> SquelchGuard {
        self.depth.fetch_add(1, Ordering::SeqCst);
        SquelchGuard {
            depth: Arc::clone(&self.depth),
        }
    }

    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    /// Number of currently open sections
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

/// Scoped hold on a [`Squelch`]. Decrements on drop, including on error paths.
#[derive(Debug)]
#[must_use = "the squelch is released as soon as the guard is dropped"]
pub struct SquelchGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for SquelchGuard {
    fn drop(&mut self) {
        // Saturating: never below zero
        let _ = self
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| d.checked_sub(1));
    }
}
