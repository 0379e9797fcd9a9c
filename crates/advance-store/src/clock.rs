use chrono::{DateTime, TimeDelta, Utc};

/// Hands out strictly increasing creation timestamps at microsecond
/// resolution, so history ordering never depends on id tie-breaks.
#[derive(Debug, Default)]
pub(crate) struct CreationClock {
    last: Option<DateTime<Utc>>,
}

impl CreationClock {
    /// A clock whose first stamp is later than `last`, e.g. the newest
    /// timestamp already persisted.
    pub(crate) fn resuming_after(last: Option<DateTime<Utc>>) -> Self {
        Self { last }
    }

    pub(crate) fn next(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now);
        let stamp = match self.last {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}
