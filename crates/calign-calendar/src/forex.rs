//! 24/5 forex calendar.
//!
//! Sessions are labelled by the UTC date on which they open. A session opens
//! at 05:00 UTC and runs until 04:59:59 UTC on the following date, so bars
//! stamped 00:00-04:59 UTC on date D belong to the session labelled D−1.
//! Monday-Friday are sessions; there are no holidays.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

use crate::calendar::{require_session, ymd, CalendarError, TradingCalendar};
use crate::FOREX;

/// Hour (UTC) at which every forex session opens.
pub const FOREX_OPEN_HOUR_UTC: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForexCalendar {
    first: NaiveDate,
    last: NaiveDate,
}

impl ForexCalendar {
    pub fn new() -> Self {
        Self::with_bounds(ymd(2000, 1, 3), ymd(2099, 12, 31))
    }

    pub fn with_bounds(first: NaiveDate, last: NaiveDate) -> Self {
        Self { first, last }
    }
}

impl Default for ForexCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl TradingCalendar for ForexCalendar {
    fn calendar_id(&self) -> &str {
        FOREX
    }

    fn first_session(&self) -> NaiveDate {
        self.first
    }

    fn last_session(&self) -> NaiveDate {
        self.last
    }

    fn is_session(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    fn session_open(&self, date: NaiveDate) -> Result<DateTime<Utc>, CalendarError> {
        require_session(self, date)?;
        date.and_hms_opt(FOREX_OPEN_HOUR_UTC, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| CalendarError::InvalidOpenTime {
                calendar_id: FOREX.to_string(),
                date,
            })
    }
}
