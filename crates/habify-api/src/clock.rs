use std::sync::Mutex;

use chrono::{Local, NaiveDate, Utc};

/// Source of "today" and "now" for handlers.
pub trait Clock: Send + Sync {
    /// The server's current calendar date.
    fn today(&self) -> NaiveDate;

    /// Unix seconds, used for token expiry.
    fn now(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock pinned to a date and an instant that tests can move forward.
pub struct FixedClock {
    today: Mutex<NaiveDate>,
    now: Mutex<i64>,
}

impl FixedClock {
    /// The instant starts at the real current time so issued JWTs stay valid.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
            now: Mutex::new(Utc::now().timestamp()),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        if let Ok(mut guard) = self.today.lock() {
            *guard = today;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by.num_seconds();
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        match self.today.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn now(&self) -> i64 {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_only_moves_when_told() {
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let before = clock.now();
        clock.advance(chrono::Duration::minutes(31));
        assert_eq!(clock.now(), before + 31 * 60);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }
}
