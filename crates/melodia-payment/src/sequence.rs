//! Process-wide transaction sequence.
//!
//! Values are unique and strictly increasing within one process. The seed is
//! the last six digits of the start time in milliseconds, so two processes
//! (or a quick restart) can hand out the same value; the gateway rejects the
//! duplicate `app_trans_id` in that case. Multi-instance deployments need a
//! shared sequence instead.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct TransactionSequence {
    last: AtomicU64,
}

impl TransactionSequence {
    pub fn seeded_from_clock() -> Self {
        let millis = chrono::Utc::now().timestamp_millis().unsigned_abs();
        Self::starting_after(millis % 1_000_000)
    }

    /// The first call to [`next`](Self::next) returns `seed + 1`.
    pub fn starting_after(seed: u64) -> Self {
        Self {
            last: AtomicU64::new(seed),
        }
    }

    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for TransactionSequence {
    fn default() -> Self {
        Self::seeded_from_clock()
    }
}
