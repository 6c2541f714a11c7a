use crate::Generator;
use shrink_core::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimum number of digits a sequence code is padded to.
pub const DEFAULT_WIDTH: usize = 6;

/// Deterministic generator: `prefix` followed by a zero-padded counter.
///
/// The counter lives in memory only, so after a restart it replays codes
/// that are already stored. Run it behind a
/// [`CodeAllocator`](crate::CodeAllocator), which skips them.
#[derive(Debug)]
pub struct SeqGenerator {
    prefix: String,
    width: usize,
    next: AtomicU64,
}

impl SeqGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_offset(prefix, 0)
    }

    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Self {
        Self {
            prefix: prefix.into(),
            width: DEFAULT_WIDTH,
            next: AtomicU64::new(offset),
        }
    }

    /// Pads the counter to `width` digits instead of [`DEFAULT_WIDTH`].
    pub fn padded_to(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Counter value the next code will carry.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> ShortCode {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        ShortCode::new_unchecked(format!("{}{:0width$}", self.prefix, n, width = self.width))
    }
}
