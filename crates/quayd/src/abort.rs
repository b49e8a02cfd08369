//! Cancellation signal handed to facade constructors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Read side of a cancellation signal.
///
/// [`AbortSignal::never`] is what the dispatch layer hands out by default; it
/// never fires. Facades must treat an unfired signal as "not cancelled".
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Option<Arc<AtomicBool>>,
}

impl AbortSignal {
    /// A signal that can never fire.
    #[must_use]
    pub const fn never() -> Self {
        Self { flag: None }
    }

    /// Returns `true` once the paired [`AbortHandle`] has fired.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }
}

/// Write side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Fires the signal. Firing more than once has no further effect.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Creates a connected handle and signal.
#[must_use]
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let flag = Arc::new(AtomicBool::new(false));
    (
        AbortHandle {
            flag: Arc::clone(&flag),
        },
        AbortSignal { flag: Some(flag) },
    )
}
