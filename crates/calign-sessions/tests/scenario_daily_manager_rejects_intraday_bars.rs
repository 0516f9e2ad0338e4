//! A manager left at its default daily frequency refuses intraday input
//! instead of collapsing it to one bar per date.
//!
//! GREEN when:
//! - Two days of hourly crypto bars through a default manager fail in
//!   `gap_fill` with a frequency mismatch naming the first crowded date.
//! - The same bars through an intraday manager keep every row and volume.

use calign_calendar::{ymd, CalendarRegistry};
use calign_sessions::{Bar, BarSeries, FilterError, Frequency, SessionError, SessionManager};
use chrono::{Duration, TimeZone, Utc};

fn hourly_bars(hours: i64) -> BarSeries {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    BarSeries::from_rows((0..hours).map(|h| (start + Duration::hours(h), Bar::new(5, 6, 4, 5, 10))))
        .unwrap()
}

#[test]
fn default_manager_fails_on_hourly_bars() {
    let cals = CalendarRegistry::builtin();
    let manager = SessionManager::for_asset_class("crypto", &cals).unwrap();
    assert_eq!(manager.frequency(), Frequency::Daily);

    let err = manager.apply_filters(&hourly_bars(48)).unwrap_err();
    match err {
        SessionError::FilterFailure {
            filter: "gap_fill",
            source: FilterError::FrequencyMismatch { date, count },
            ..
        } => {
            assert_eq!(date, ymd(2024, 1, 1));
            assert_eq!(count, 24);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn intraday_manager_keeps_every_hourly_bar() {
    let cals = CalendarRegistry::builtin();
    let manager = SessionManager::for_asset_class("crypto", &cals)
        .unwrap()
        .with_frequency(Frequency::Intraday);

    let out = manager.apply_filters(&hourly_bars(48)).unwrap();
    assert_eq!(out.len(), 48);
    assert_eq!(out.iter().map(|(_, b)| b.volume).sum::<i64>(), 480);
}
