//! The two call sites that must agree on sessions: ingestion (write side)
//! and backtest pre-flight (read side).
//!
//! Both go through the same [`SessionManager`] and the same
//! `validate_against_stored`, and both turn a failed validation into an error
//! only under [`Strictness::Fail`].

use std::collections::BTreeMap;

use calign_calendar::CalendarRegistry;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bars::{BarSeries, Frequency};
use crate::error::SessionError;
use crate::manager::SessionManager;
use crate::registry::{BundleWriter, SessionStore};
use crate::strategy::{AssetClass, ValidationOutcome};

/// What to do when stored sessions disagree with the canonical set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Log and carry on.
    #[default]
    Warn,
    /// Return [`SessionError::SessionMismatch`].
    Fail,
}

impl std::str::FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Strictness::Warn),
            "fail" => Ok(Strictness::Fail),
            other => Err(format!(
                "invalid strictness '{other}'. expected one of: warn | fail"
            )),
        }
    }
}

/// Everything one ingestion run needs besides the data itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestParams {
    pub dataset: String,
    pub asset_class: AssetClass,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub frequency: Frequency,
    pub strictness: Strictness,
}

impl IngestParams {
    /// Manager for this run's asset class at this run's frequency.
    pub fn session_manager(&self, calendars: &CalendarRegistry) -> Result<SessionManager, SessionError> {
        Ok(SessionManager::for_asset_class(self.asset_class.as_str(), calendars)?
            .with_frequency(self.frequency))
    }

    /// `ParamsMismatch` unless `manager` runs this asset class at this
    /// frequency. The calendar id is not compared: an equity manager may be
    /// bound to any exchange calendar.
    pub fn check_manager(&self, manager: &SessionManager) -> Result<(), SessionError> {
        let bound = manager.strategy().asset_class();
        if bound != self.asset_class {
            return Err(SessionError::ParamsMismatch {
                field: "asset_class",
                params: self.asset_class.as_str(),
                manager: bound.as_str(),
            });
        }
        if manager.frequency() != self.frequency {
            return Err(SessionError::ParamsMismatch {
                field: "frequency",
                params: self.frequency.as_str(),
                manager: manager.frequency().as_str(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub rows_in: usize,
    pub rows_out: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub dataset: String,
    pub calendar_id: String,
    pub symbols: Vec<SymbolSummary>,
    pub outcome: ValidationOutcome,
}

/// Filter every symbol, write the results, record the calendar id and
/// validate what was stored.
///
/// `manager` must agree with `params` on asset class and frequency. All
/// symbols are filtered before anything is written, so a filter failure
/// leaves the writer untouched.
pub fn ingest(
    manager: &SessionManager,
    params: &IngestParams,
    series_by_symbol: &BTreeMap<String, BarSeries>,
    writer: &dyn BundleWriter,
    store: &dyn SessionStore,
) -> Result<IngestSummary, SessionError> {
    params.check_manager(manager)?;

    let mut filtered = Vec::with_capacity(series_by_symbol.len());
    for (symbol, series) in series_by_symbol {
        let out = manager.apply_filters(series)?;
        filtered.push((symbol.as_str(), series.len(), out));
    }

    let write_err = |source| SessionError::Write {
        dataset: params.dataset.clone(),
        source,
    };
    let mut symbols = Vec::with_capacity(filtered.len());
    for (symbol, rows_in, out) in &filtered {
        writer
            .write_series(&params.dataset, symbol, out)
            .map_err(write_err)?;
        symbols.push(SymbolSummary {
            symbol: symbol.to_string(),
            rows_in: *rows_in,
            rows_out: out.len(),
        });
    }
    writer
        .record_calendar(&params.dataset, manager.calendar_id())
        .map_err(write_err)?;

    let outcome =
        manager.validate_against_stored(store, &params.dataset, params.start, params.end);
    enforce(params.strictness, &params.dataset, &outcome)?;

    info!(
        dataset = %params.dataset,
        calendar_id = %manager.calendar_id(),
        symbols = symbols.len(),
        passed = outcome.passed,
        "ingest complete"
    );
    Ok(IngestSummary {
        dataset: params.dataset.clone(),
        calendar_id: manager.calendar_id().to_string(),
        symbols,
        outcome,
    })
}

/// Backtest-side check that a dataset's stored sessions match what the
/// manager would enumerate for `[start, end]`.
pub fn preflight(
    manager: &SessionManager,
    store: &dyn SessionStore,
    dataset: &str,
    start: NaiveDate,
    end: NaiveDate,
    strictness: Strictness,
) -> Result<ValidationOutcome, SessionError> {
    let outcome = manager.validate_against_stored(store, dataset, start, end);
    enforce(strictness, dataset, &outcome)?;
    Ok(outcome)
}

fn enforce(
    strictness: Strictness,
    dataset: &str,
    outcome: &ValidationOutcome,
) -> Result<(), SessionError> {
    if outcome.passed {
        return Ok(());
    }
    match strictness {
        Strictness::Fail => Err(SessionError::SessionMismatch(outcome.message.clone())),
        Strictness::Warn => {
            warn!(dataset, message = %outcome.message, "session mismatch; continuing");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictness_parse_and_default() {
        assert_eq!(Strictness::default(), Strictness::Warn);
        assert_eq!("FAIL".parse::<Strictness>().unwrap(), Strictness::Fail);
        assert!("maybe".parse::<Strictness>().is_err());
    }

    #[test]
    fn manager_must_match_params() {
        let cals = CalendarRegistry::builtin();
        let params = IngestParams {
            dataset: "d".to_string(),
            asset_class: AssetClass::Crypto,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            frequency: Frequency::Intraday,
            strictness: Strictness::Warn,
        };
        assert!(params.check_manager(&params.session_manager(&cals).unwrap()).is_ok());

        let forex = SessionManager::for_asset_class("forex", &cals).unwrap();
        assert!(matches!(
            params.check_manager(&forex),
            Err(SessionError::ParamsMismatch { field: "asset_class", params: "crypto", manager: "forex" })
        ));

        let daily = SessionManager::for_asset_class("crypto", &cals).unwrap();
        assert!(matches!(
            params.check_manager(&daily),
            Err(SessionError::ParamsMismatch { field: "frequency", params: "intraday", manager: "daily" })
        ));
    }

    #[test]
    fn enforce_only_fails_under_fail() {
        let bad = ValidationOutcome::soft_failure("store offline");
        assert!(enforce(Strictness::Warn, "d", &bad).is_ok());
        assert!(matches!(
            enforce(Strictness::Fail, "d", &bad),
            Err(SessionError::SessionMismatch(m)) if m == "validation failed: store offline"
        ));
    }
}
