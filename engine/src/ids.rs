use roadwatch_types::{ReportId, Timestamp, ValidationError};
use std::sync::atomic::{AtomicU64, Ordering};

/// Generates `rpt_<millis>_<seq><rand>` report ids.
///
/// The millisecond prefix keeps ids roughly time-ordered; the per-process
/// sequence plus random suffix makes collisions between processes unlikely.
/// A collision that does happen surfaces as a version conflict on create
/// and the submission is retried with a fresh id.
#[derive(Default)]
pub struct ReportIdGenerator {
    seq: AtomicU64,
}

impl ReportIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, now: Timestamp) -> Result<ReportId, ValidationError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut rand = [0u8; 4];
        let suffix = match getrandom::getrandom(&mut rand) {
            Ok(()) => hex::encode(rand),
            Err(_) => String::new(),
        };
        let raw = format!("rpt_{}_{:04x}{}", now.as_millis(), seq & 0xffff, suffix);
        ReportId::new(raw)
    }
}
