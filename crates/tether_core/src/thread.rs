//! # Thread Tokens
//!
//! `std::thread::ThreadId` has no stable integer form, so it cannot live in
//! an atomic. Every thread draws a nonzero token from a global counter the
//! first time it asks, and keeps it for its lifetime. Zero means "no thread".

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: NonZeroU64 = next_token();
}

fn next_token() -> NonZeroU64 {
    NonZeroU64::new(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)).unwrap_or(NonZeroU64::MIN)
}

/// Process-unique identity of a thread, storable in an `AtomicU64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadToken(NonZeroU64);

impl ThreadToken {
    /// Returns the token of the calling thread.
    #[inline]
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(|token| Self(*token))
    }

    /// Raw value. Never zero.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Rebuilds a token from a raw value. Zero maps to `None`.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}
