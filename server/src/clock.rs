//! C1: the only source of timestamps in the engine.
//!
//! Every component that needs "now" takes an `Arc<dyn Clock>` rather than
//! calling `Utc::now()` directly, so tests can substitute a fake and assert
//! exact `created_at`/`updated_at` values.

use chrono::{DateTime, Utc};
use std::fmt;

pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::FakeClock;

    #[test]
    fn fake_clock_advances_by_seconds() {
        let start = Utc::now();
        let clock = FakeClock::new(start);
        clock.advance(5);
        assert_eq!(clock.now(), start + chrono::Duration::seconds(5));
    }
}
