//! Zeroize-on-drop containers for key material.

use std::fmt::{Debug, Formatter, Result};

use zeroize::Zeroize;

/// Wraps a byte container and scrubs it when dropped.
///
/// Used for the passphrase and for derived subkeys so that key material does
/// not linger in freed memory after a run completes. `zeroize` guarantees the
/// overwrite is not elided by the optimizer.
pub struct Secret<T>
where
    T: Zeroize,
{
    value: T,
}

impl<T> Secret<T>
where
    T: Zeroize,
{
    #[inline]
    pub fn new(value: T) -> Self {
        Self { value }
    }

    #[inline]
    pub fn expose(&self) -> &T {
        &self.value
    }
}

impl<T> Drop for Secret<T>
where
    T: Zeroize,
{
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

impl<T> Debug for Secret<T>
where
    T: Zeroize,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str("[REDACTED]")
    }
}
