//! Ingestion and backtest pre-flight agree, and strictness decides whether a
//! disagreement is fatal.
//!
//! GREEN when:
//! - Ingesting a gappy crypto month records the calendar and validates clean.
//! - Pre-flight over a wider range than was ingested fails: an error under
//!   `Fail`, a failed outcome under `Warn`.
//! - A store that cannot answer yields a soft failure, not an error.
//! - A filter failure in any symbol writes nothing.
//! - A manager that contradicts the ingest params is refused before any write.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::anyhow;
use calign_calendar::{ymd, CalendarRegistry, CryptoCalendar, CRYPTO};
use calign_sessions::{
    ingest, preflight, AssetClass, Bar, BarSeries, BundleIndex, DatasetRegistry, Frequency,
    IngestParams, SessionError, SessionManager, SessionSet, SessionStore, Strictness,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};

fn crypto_series(start: NaiveDate, days: i64, skip_every: i64) -> BarSeries {
    BarSeries::from_rows(
        (0..days)
            .filter(|i| i % skip_every != skip_every - 1)
            .map(|i| {
                let d = start + Duration::days(i);
                let ts = Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap());
                (ts, Bar::new(10, 12, 8, 11, 5))
            }),
    )
    .unwrap()
}

fn params(strictness: Strictness) -> IngestParams {
    IngestParams {
        dataset: "crypto-daily".to_string(),
        asset_class: AssetClass::Crypto,
        start: ymd(2024, 1, 1),
        end: ymd(2024, 1, 31),
        frequency: Frequency::Daily,
        strictness,
    }
}

struct OfflineStore;

impl SessionStore for OfflineStore {
    fn load_sessions(&self, _: &str, _: NaiveDate, _: NaiveDate) -> anyhow::Result<SessionSet> {
        Err(anyhow!("bundle store offline"))
    }
}

#[test]
fn ingest_then_preflight_round_trip() {
    let cals = CalendarRegistry::builtin();
    let p = params(Strictness::Fail);
    let manager = p.session_manager(&cals).unwrap();
    let index = BundleIndex::new();

    let mut data = BTreeMap::new();
    data.insert("BTCUSD".to_string(), crypto_series(ymd(2024, 1, 1), 31, 5));
    data.insert("ETHUSD".to_string(), crypto_series(ymd(2024, 1, 1), 31, 4));

    let summary = ingest(&manager, &p, &data, &index, &index).unwrap();
    assert!(summary.outcome.passed, "{}", summary.outcome.message);
    assert_eq!(summary.calendar_id, CRYPTO);
    assert!(summary.symbols.iter().all(|s| s.rows_out == 31));
    assert_eq!(index.lookup("crypto-daily").unwrap().as_deref(), Some(CRYPTO));

    // Backtest side rebuilds its manager from the registry alone.
    let replay = SessionManager::for_named_dataset("crypto-daily", &index, &cals).unwrap();
    let ok = preflight(
        &replay,
        &index,
        "crypto-daily",
        ymd(2024, 1, 1),
        ymd(2024, 1, 31),
        Strictness::Fail,
    )
    .unwrap();
    assert!(ok.passed);

    let err = preflight(
        &replay,
        &index,
        "crypto-daily",
        ymd(2024, 1, 1),
        ymd(2024, 2, 29),
        Strictness::Fail,
    )
    .unwrap_err();
    assert!(matches!(err, SessionError::SessionMismatch(ref m) if m.contains("CRYPTO requires exact sessions")));

    let warned = preflight(
        &replay,
        &index,
        "crypto-daily",
        ymd(2024, 1, 1),
        ymd(2024, 2, 29),
        Strictness::Warn,
    )
    .unwrap();
    assert!(!warned.passed);
    assert_eq!(warned.report.unwrap().missing.len(), 29);
}

#[test]
fn unreachable_store_is_a_soft_failure() {
    let cals = CalendarRegistry::builtin();
    let m = SessionManager::for_asset_class("crypto", &cals).unwrap();
    let out = m.validate_against_stored(&OfflineStore, "x", ymd(2024, 1, 1), ymd(2024, 1, 2));
    assert!(!out.passed);
    assert_eq!(out.message, "validation failed: bundle store offline");
    assert!(out.report.is_none());

    let unknown = m.validate_against_stored(
        &BundleIndex::new(),
        "never-ingested",
        ymd(2024, 1, 1),
        ymd(2024, 1, 2),
    );
    assert!(!unknown.passed);
    assert!(unknown.message.starts_with("validation failed: "));

    // Calendar range errors are downgraded the same way.
    let oob = m.validate_against_stored(&OfflineStore, "x", ymd(1999, 1, 1), ymd(1999, 1, 2));
    assert!(!oob.passed && oob.report.is_none());
}

#[test]
fn warn_strictness_ingest_continues_on_mismatch() {
    let cals = CalendarRegistry::builtin();
    let mut p = params(Strictness::Warn);
    p.end = ymd(2024, 2, 15);
    let manager = p.session_manager(&cals).unwrap();
    let index = BundleIndex::new();

    let mut data = BTreeMap::new();
    data.insert("BTCUSD".to_string(), crypto_series(ymd(2024, 1, 1), 31, 100));

    let summary = ingest(&manager, &p, &data, &index, &index).unwrap();
    assert!(!summary.outcome.passed);

    p.strictness = Strictness::Fail;
    let err = ingest(&manager, &p, &data, &index, &index).unwrap_err();
    assert!(matches!(err, SessionError::SessionMismatch(_)));
}

#[test]
fn filter_failure_writes_nothing() {
    let mut cals = CalendarRegistry::builtin();
    cals.register(Arc::new(CryptoCalendar::with_bounds(
        ymd(2024, 1, 1),
        ymd(2024, 1, 31),
    )));
    let p = params(Strictness::Warn);
    let manager = p.session_manager(&cals).unwrap();
    let index = BundleIndex::new();

    let mut data = BTreeMap::new();
    data.insert("AAA".to_string(), crypto_series(ymd(2024, 1, 1), 10, 100));
    // Runs past the calendar's last session.
    data.insert("ZZZ".to_string(), crypto_series(ymd(2024, 1, 25), 20, 100));

    let err = ingest(&manager, &p, &data, &index, &index).unwrap_err();
    assert!(matches!(err, SessionError::FilterFailure { filter: "calendar_session", .. }));
    assert!(index.datasets().unwrap().is_empty());
}

#[test]
fn manager_contradicting_params_writes_nothing() {
    let cals = CalendarRegistry::builtin();
    let mut p = params(Strictness::Warn);
    p.frequency = Frequency::Intraday;
    let forex = SessionManager::for_asset_class("forex", &cals).unwrap();
    let index = BundleIndex::new();

    let mut data = BTreeMap::new();
    data.insert("BTCUSD".to_string(), crypto_series(ymd(2024, 1, 1), 31, 100));

    let err = ingest(&forex, &p, &data, &index, &index).unwrap_err();
    assert!(matches!(err, SessionError::ParamsMismatch { field: "asset_class", .. }));

    let daily_crypto = SessionManager::for_asset_class("crypto", &cals).unwrap();
    let err = ingest(&daily_crypto, &p, &data, &index, &index).unwrap_err();
    assert!(matches!(err, SessionError::ParamsMismatch { field: "frequency", .. }));
    assert!(index.datasets().unwrap().is_empty());
}
