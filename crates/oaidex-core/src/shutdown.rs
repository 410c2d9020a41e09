//! Cooperative cancellation via a shared atomic flag

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable cancellation signal.
///
/// Workers poll [`is_cancelled`](CancelToken::is_cancelled) before each
/// submission; raising it stops new work but lets in-flight requests finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Raise the flag, returning whether it was already raised.
    ///
    /// Signal handlers use this to exit hard on the second signal.
    pub fn cancel_again(&self) -> bool {
        self.0.swap(true, Ordering::Relaxed)
    }
}

/// Process-wide token raised by SIGINT/SIGTERM handlers
pub fn shutdown_token() -> &'static CancelToken {
    static TOKEN: std::sync::LazyLock<CancelToken> = std::sync::LazyLock::new(CancelToken::new);
    &TOKEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn cancel_again_reports_previous() {
        let token = CancelToken::new();
        assert!(!token.cancel_again());
        assert!(token.cancel_again());
    }
}
