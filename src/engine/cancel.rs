//! Pipeline-wide cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::EngineError;

/// Level-triggered cancel signal shared by the reader and all workers.
///
/// The first party to fail records its error and trips the flag; everyone
/// else exits at their next suspension point (channel operation or loop
/// top). Later errors are discarded.
pub struct Cancel {
    tripped: AtomicBool,
    first: Mutex<Option<EngineError>>,
}

impl Default for Cancel {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancel {
    pub fn new() -> Self {
        Self { tripped: AtomicBool::new(false), first: Mutex::new(None) }
    }

    /// Records `err` if it is the first failure, and trips the flag.
    pub fn fail(&self, err: EngineError) {
        if let Ok(mut slot) = self.first.lock() {
            if slot.is_none() {
                *slot = Some(err);
            }
        }
        self.set();
    }

    /// Trips the flag without recording an error. Used by parties whose
    /// error travels back through a join handle instead.
    #[inline]
    pub fn set(&self) {
        self.tripped.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Consumes the signal, yielding the first recorded error if any.
    pub fn into_first(self) -> Option<EngineError> {
        match self.first.into_inner() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_clear() {
        let cancel = Cancel::new();
        assert!(!cancel.is_tripped());
        assert!(cancel.into_first().is_none());
    }

    #[test]
    fn test_first_error_wins() {
        let cancel = Cancel::new();
        cancel.fail(EngineError::AuthFailure);
        cancel.fail(EngineError::NonceWouldWrap);

        assert!(cancel.is_tripped());
        assert!(matches!(cancel.into_first(), Some(EngineError::AuthFailure)));
    }

    #[test]
    fn test_set_trips_without_error() {
        let cancel = Cancel::new();
        cancel.set();

        assert!(cancel.is_tripped());
        assert!(cancel.into_first().is_none());
    }
}
