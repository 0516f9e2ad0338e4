//! Exchange calendars: discontinuous, holiday-aware sessions.
//!
//! # XNYS
//!
//! - Weekdays only (Monday-Friday).
//! - Regular session opens 09:30 America/New_York; the UTC instant is
//!   DST-correct (14:30 UTC in winter, 13:30 UTC in summer).
//! - Holidays are derived by rule, not from a table, so any year inside the
//!   calendar bounds is covered. One-off closures (national days of mourning,
//!   weather) are not modelled.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::calendar::{require_session, ymd, CalendarError, TradingCalendar};
use crate::XNYS;

// ---------------------------------------------------------------------------
// ExchangeCalendar
// ---------------------------------------------------------------------------

/// A weekday exchange calendar with an explicit holiday set and a local
/// session-open time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeCalendar {
    calendar_id: String,
    tz: Tz,
    open_local: NaiveTime,
    first: NaiveDate,
    last: NaiveDate,
    holidays: BTreeSet<NaiveDate>,
}

impl ExchangeCalendar {
    /// Build an exchange calendar from its parts.
    ///
    /// `holidays` outside `[first, last]` are kept but never consulted.
    pub fn new(
        calendar_id: impl Into<String>,
        tz: Tz,
        open_local: NaiveTime,
        first: NaiveDate,
        last: NaiveDate,
        holidays: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            tz,
            open_local,
            first,
            last,
            holidays: holidays.into_iter().collect(),
        }
    }

    /// New York Stock Exchange, 1990-01-02 through 2099-12-31.
    pub fn xnys() -> Self {
        let holidays = (1990..=2099).flat_map(nyse_holidays);
        Self::new(
            XNYS,
            chrono_tz::America::New_York,
            NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            ymd(1990, 1, 2),
            ymd(2099, 12, 31),
            holidays,
        )
    }

    /// Returns `true` if `date` is an exchange holiday (weekday closure).
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }
}

impl TradingCalendar for ExchangeCalendar {
    fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn first_session(&self) -> NaiveDate {
        self.first
    }

    fn last_session(&self) -> NaiveDate {
        self.last
    }

    fn is_session(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }

    fn session_open(&self, date: NaiveDate) -> Result<DateTime<Utc>, CalendarError> {
        require_session(self, date)?;
        self.tz
            .from_local_datetime(&date.and_time(self.open_local))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| CalendarError::InvalidOpenTime {
                calendar_id: self.calendar_id.clone(),
                date,
            })
    }
}

// ---------------------------------------------------------------------------
// NYSE holiday rules
// ---------------------------------------------------------------------------

/// NYSE full-day holidays observed in `year`, ascending.
///
/// Observance: a holiday on Saturday moves to Friday, on Sunday to Monday.
/// New Year's Day is the exception: when it falls on Saturday the exchange
/// stays open on the preceding Friday (Dec 31), so no date is emitted.
pub fn nyse_holidays(year: i32) -> Vec<NaiveDate> {
    let mut out: Vec<NaiveDate> = Vec::with_capacity(10);

    let new_year = ymd(year, 1, 1);
    match new_year.weekday() {
        Weekday::Sat => {}
        Weekday::Sun => out.push(new_year + Duration::days(1)),
        _ => out.push(new_year),
    }

    if year >= 1998 {
        out.extend(nth_weekday(year, 1, Weekday::Mon, 3)); // Martin Luther King Jr. Day
    }
    out.extend(nth_weekday(year, 2, Weekday::Mon, 3)); // Washington's Birthday
    out.push(easter_sunday(year) - Duration::days(2)); // Good Friday
    out.push(last_weekday(year, 5, Weekday::Mon)); // Memorial Day
    if year >= 2022 {
        out.push(observed(ymd(year, 6, 19))); // Juneteenth
    }
    out.push(observed(ymd(year, 7, 4))); // Independence Day
    out.extend(nth_weekday(year, 9, Weekday::Mon, 1)); // Labor Day
    out.extend(nth_weekday(year, 11, Weekday::Thu, 4)); // Thanksgiving
    out.push(observed(ymd(year, 12, 25))); // Christmas

    out.sort_unstable();
    out
}

/// Easter Sunday (Gregorian) via the anonymous computus.
pub fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}

fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let first_of_next = if month == 12 {
        ymd(year + 1, 1, 1)
    } else {
        ymd(year, month + 1, 1)
    };
    let mut d = first_of_next - Duration::days(1);
    while d.weekday() != weekday {
        d -= Duration::days(1);
    }
    d
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
