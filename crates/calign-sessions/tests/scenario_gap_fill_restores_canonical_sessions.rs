//! Gap-fill round trip through the full pipeline.
//!
//! GREEN when:
//! - A crypto daily series with one session removed comes back with exactly
//!   the canonical session set for its range.
//! - The synthesized bar has volume 0 and the prices of the preceding real bar.
//! - A forex daily series with a missing weekday and a weekend row comes back
//!   weekday-only, with the Sunday folded into Friday and the gap filled.

use std::collections::BTreeSet;

use calign_calendar::{ymd, CalendarRegistry};
use calign_sessions::{Bar, BarSeries, SessionManager};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};

fn midnight(d: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap())
}

fn bar_for(i: i64) -> Bar {
    let px = 100_000_000 + i * 1_000;
    Bar::new(px, px + 500, px - 500, px + 250, 1_000 + i)
}

fn daily(start: NaiveDate, days: i64, skip: &[NaiveDate]) -> BarSeries {
    BarSeries::from_rows(
        (0..days)
            .map(|i| (start + Duration::days(i), i))
            .filter(|(d, _)| !skip.contains(d))
            .map(|(d, i)| (midnight(d), bar_for(i))),
    )
    .unwrap()
}

#[test]
fn crypto_single_gap_is_restored() {
    let cals = CalendarRegistry::builtin();
    let m = SessionManager::for_asset_class("crypto", &cals).unwrap();
    let gap = ymd(2024, 1, 15);
    let raw = daily(ymd(2024, 1, 1), 31, &[gap]);
    assert_eq!(raw.len(), 30);

    let out = m.apply_filters(&raw).unwrap();

    let canonical = m.sessions(ymd(2024, 1, 1), ymd(2024, 1, 31)).unwrap();
    let got: BTreeSet<NaiveDate> = out.dates();
    assert_eq!(&got, canonical.as_btree());

    let filled = out.get(&midnight(gap)).unwrap();
    let prev = raw.get(&midnight(ymd(2024, 1, 14))).unwrap();
    assert_eq!(filled.volume, 0);
    assert_eq!(filled.open_micros, prev.open_micros);
    assert_eq!(filled.high_micros, prev.high_micros);
    assert_eq!(filled.low_micros, prev.low_micros);
    assert_eq!(filled.close_micros, prev.close_micros);

    // Real bars are untouched.
    for (ts, bar) in &raw {
        assert_eq!(out.get(ts), Some(bar));
    }
}

#[test]
fn crypto_long_gap_is_filled_not_rejected() {
    let cals = CalendarRegistry::builtin();
    let m = SessionManager::for_asset_class("crypto", &cals).unwrap();
    let skip: Vec<NaiveDate> = (10..=20).map(|d| ymd(2024, 1, d)).collect();
    let raw = daily(ymd(2024, 1, 1), 31, &skip);

    let out = m.apply_filters(&raw).unwrap();
    assert_eq!(out.len(), 31);
    assert!(skip
        .iter()
        .all(|d| out.get(&midnight(*d)).map(|b| b.volume) == Some(0)));
}

#[test]
fn forex_daily_pipeline_lands_on_weekdays() {
    let cals = CalendarRegistry::builtin();
    let m = SessionManager::for_asset_class("forex", &cals).unwrap();

    // Mon 2024-01-01 .. Sun 2024-01-14, Saturdays absent, Wed 2024-01-10 missing.
    let start = ymd(2024, 1, 1);
    let skip: Vec<NaiveDate> = (0..14)
        .map(|i| start + Duration::days(i))
        .filter(|d| d.weekday() == Weekday::Sat)
        .chain([ymd(2024, 1, 10)])
        .collect();
    let raw = daily(start, 14, &skip);

    let out = m.apply_filters(&raw).unwrap();

    let canonical = m.sessions(ymd(2024, 1, 1), ymd(2024, 1, 14)).unwrap();
    assert_eq!(&out.dates(), canonical.as_btree());
    assert_eq!(out.len(), 10);

    // Sunday 2024-01-07 folded into Friday 2024-01-05.
    let fri = raw.get(&midnight(ymd(2024, 1, 5))).unwrap();
    let sun = raw.get(&midnight(ymd(2024, 1, 7))).unwrap();
    let merged = out.get(&midnight(ymd(2024, 1, 5))).unwrap();
    assert_eq!(merged.open_micros, fri.open_micros);
    assert_eq!(merged.close_micros, sun.close_micros);
    assert_eq!(merged.volume, fri.volume + sun.volume);

    // Wednesday forward-filled from Tuesday.
    let tue = raw.get(&midnight(ymd(2024, 1, 9))).unwrap();
    assert_eq!(
        out.get(&midnight(ymd(2024, 1, 10))),
        Some(&Bar::synthetic_from(tue))
    );
}

#[test]
fn empty_series_is_a_noop() {
    let cals = CalendarRegistry::builtin();
    for tag in ["forex", "crypto", "equity"] {
        let m = SessionManager::for_asset_class(tag, &cals).unwrap();
        assert!(m.apply_filters(&BarSeries::new()).unwrap().is_empty());
    }
}
