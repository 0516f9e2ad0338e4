//! calign-calendar
//!
//! Trading calendars keyed by a stable calendar id.
//!
//! A calendar answers three questions for the session-alignment core:
//! which UTC dates are sessions, when each session opens (UTC instant), and
//! which date range the calendar is defined for. Pure deterministic logic.
//! No IO, no wall-clock.
//!
//! Built-in calendars:
//! - [`ForexCalendar`] (`FOREX`) : 24/5, Monday-Friday, session opens 05:00 UTC
//!   and runs past midnight into the next UTC date.
//! - [`CryptoCalendar`] (`CRYPTO`) : 24/7, every date is a session.
//! - [`ExchangeCalendar::xnys`] (`XNYS`) : NYSE weekdays minus rule-derived
//!   holidays, session opens 09:30 America/New_York.

mod calendar;
mod crypto;
mod exchange;
mod forex;
mod registry;

pub use calendar::{ymd, CalendarError, TradingCalendar};
pub use crypto::CryptoCalendar;
pub use exchange::{easter_sunday, nyse_holidays, ExchangeCalendar};
pub use forex::ForexCalendar;
pub use registry::CalendarRegistry;

/// Calendar id of the built-in 24/5 forex calendar.
pub const FOREX: &str = "FOREX";
/// Calendar id of the built-in 24/7 crypto calendar.
pub const CRYPTO: &str = "CRYPTO";
/// Calendar id of the built-in New York Stock Exchange calendar.
pub const XNYS: &str = "XNYS";
