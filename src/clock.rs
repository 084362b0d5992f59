use super::contract::TimeStamp;
use chrono::Utc;

/// Source of "now" for everything that depends on elapsed time.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimeStamp<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeStamp<Utc> {
        TimeStamp::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock(pub TimeStamp<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> TimeStamp<Utc> {
        self.0.clone()
    }
}
