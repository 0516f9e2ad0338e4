use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors a [`TradingCalendar`] may return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// The date lies outside the range the calendar is defined for.
    #[error("{calendar_id}: date {date} outside calendar bounds [{first}, {last}]")]
    OutOfBounds {
        calendar_id: String,
        date: NaiveDate,
        first: NaiveDate,
        last: NaiveDate,
    },

    /// `session_open` was asked about a date that is not a session.
    #[error("{calendar_id}: {date} is not a trading session")]
    NotASession { calendar_id: String, date: NaiveDate },

    /// The local open time could not be mapped to a single UTC instant.
    #[error("{calendar_id}: session open on {date} has no unique UTC instant")]
    InvalidOpenTime { calendar_id: String, date: NaiveDate },
}

// ---------------------------------------------------------------------------
// Calendar contract
// ---------------------------------------------------------------------------

/// Source of truth for valid session dates and session opens.
///
/// All dates are UTC calendar dates. Implementations must be deterministic:
/// the same query always produces the same answer, regardless of which
/// handle or thread asks.
pub trait TradingCalendar: Send + Sync + fmt::Debug {
    /// Stable identifier (e.g. `"FOREX"`, `"CRYPTO"`, `"XNYS"`).
    fn calendar_id(&self) -> &str;

    /// First date the calendar is defined for.
    fn first_session(&self) -> NaiveDate;

    /// Last date the calendar is defined for.
    fn last_session(&self) -> NaiveDate;

    /// Returns `true` if `date` is a trading session. Bounds are not checked.
    fn is_session(&self, date: NaiveDate) -> bool;

    /// UTC instant at which the session labelled `date` opens.
    fn session_open(&self, date: NaiveDate) -> Result<DateTime<Utc>, CalendarError>;

    /// Fails with [`CalendarError::OutOfBounds`] if `date` is outside
    /// `[first_session, last_session]`.
    fn check_bounds(&self, date: NaiveDate) -> Result<(), CalendarError> {
        let (first, last) = (self.first_session(), self.last_session());
        if date < first || date > last {
            return Err(CalendarError::OutOfBounds {
                calendar_id: self.calendar_id().to_string(),
                date,
                first,
                last,
            });
        }
        Ok(())
    }

    /// All sessions in the inclusive range `[start, end]`, ascending.
    ///
    /// `start > end` yields an empty list. Both bounds must lie inside the
    /// calendar's defined range.
    fn sessions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, CalendarError> {
        if start > end {
            return Ok(Vec::new());
        }
        self.check_bounds(start)?;
        self.check_bounds(end)?;

        Ok(start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_session(*d))
            .collect())
    }
}

/// Shared `session_open` preamble: bounds first, then session membership.
pub(crate) fn require_session<C: TradingCalendar + ?Sized>(
    cal: &C,
    date: NaiveDate,
) -> Result<(), CalendarError> {
    cal.check_bounds(date)?;
    if !cal.is_session(date) {
        return Err(CalendarError::NotASession {
            calendar_id: cal.calendar_id().to_string(),
            date,
        });
    }
    Ok(())
}

/// Build a date from literal components.
///
/// Only used with literal, known-valid components; an impossible date falls
/// back to `NaiveDate::MIN` rather than panicking.
pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}
