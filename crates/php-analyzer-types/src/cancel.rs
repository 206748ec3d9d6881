//! Cooperative cancellation for query traversals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A flag checked by visitors between nodes. Cancelled queries return the
/// typed empty result for their shape; no partial state escapes.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// True if `token` is present and tripped.
pub fn cancelled(token: Option<&CancellationToken>) -> bool {
    token.is_some_and(CancellationToken::is_cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(!cancelled(Some(&token)));
        assert!(!cancelled(None));

        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(cancelled(Some(&token)));
    }
}
