//! 24/7 crypto calendar: every UTC date is a session opening at 00:00 UTC.

use chrono::{DateTime, NaiveDate, Utc};

use crate::calendar::{require_session, ymd, CalendarError, TradingCalendar};
use crate::CRYPTO;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoCalendar {
    first: NaiveDate,
    last: NaiveDate,
}

impl CryptoCalendar {
    pub fn new() -> Self {
        Self::with_bounds(ymd(2009, 1, 3), ymd(2099, 12, 31))
    }

    pub fn with_bounds(first: NaiveDate, last: NaiveDate) -> Self {
        Self { first, last }
    }
}

impl Default for CryptoCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl TradingCalendar for CryptoCalendar {
    fn calendar_id(&self) -> &str {
        CRYPTO
    }

    fn first_session(&self) -> NaiveDate {
        self.first
    }

    fn last_session(&self) -> NaiveDate {
        self.last
    }

    fn is_session(&self, _date: NaiveDate) -> bool {
        true
    }

    fn session_open(&self, date: NaiveDate) -> Result<DateTime<Utc>, CalendarError> {
        require_session(self, date)?;
        Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}
