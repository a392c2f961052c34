//! Wall-clock source.
//!
//! Activity policy works on local naive time because sleep hours and
//! time-of-day buckets are about the group's wall clock.

use chrono::NaiveDateTime;

/// Source of "now" for the scheduler.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The machine's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
pub(crate) struct ManualClock(std::sync::Mutex<NaiveDateTime>);

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(start: NaiveDateTime) -> Self {
        Self(std::sync::Mutex::new(start))
    }

    pub(crate) fn set(&self, t: NaiveDateTime) {
        *self.0.lock().unwrap() = t;
    }

    pub(crate) fn advance_minutes(&self, minutes: i64) {
        let mut t = self.0.lock().unwrap();
        *t += chrono::Duration::minutes(minutes);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}
