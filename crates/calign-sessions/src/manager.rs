//! Session manager: the single entry point ingestion and backtest pre-flight
//! both go through.
//!
//! A manager binds one [`SessionStrategy`] to one resolved calendar handle.
//! It is cheap to build, holds no state beyond those two and the bar
//! frequency, and is `Send + Sync` so worker threads can share one.

use std::sync::Arc;

use calign_calendar::{CalendarRegistry, TradingCalendar};
use tracing::{debug, warn};

use crate::bars::{BarSeries, Frequency};
use crate::error::SessionError;
use crate::filters::FilterContext;
use crate::registry::{DatasetRegistry, SessionStore};
use crate::session_set::{SessionSet, UtcDate};
use crate::strategy::{AssetClass, SessionStrategy, ValidationOutcome};

#[derive(Debug, Clone)]
pub struct SessionManager {
    strategy: SessionStrategy,
    calendar: Arc<dyn TradingCalendar>,
    frequency: Frequency,
}

impl SessionManager {
    /// Bind `strategy` to its calendar from `calendars`.
    pub fn for_strategy(
        strategy: SessionStrategy,
        calendars: &CalendarRegistry,
    ) -> Result<Self, SessionError> {
        let calendar = calendars
            .get(strategy.calendar_id())
            .ok_or_else(|| SessionError::UnknownCalendar(strategy.calendar_id().to_string()))?;
        Ok(Self {
            strategy,
            calendar,
            frequency: Frequency::default(),
        })
    }

    pub fn for_asset_class(tag: &str, calendars: &CalendarRegistry) -> Result<Self, SessionError> {
        let class = AssetClass::parse(tag)?;
        Self::for_strategy(SessionStrategy::for_asset_class(class), calendars)
    }

    /// Rebuild the manager a dataset was ingested with, from its recorded
    /// calendar id.
    pub fn for_named_dataset(
        dataset: &str,
        registry: &dyn DatasetRegistry,
        calendars: &CalendarRegistry,
    ) -> Result<Self, SessionError> {
        let calendar_id = registry
            .lookup(dataset)
            .map_err(|source| SessionError::Registry {
                dataset: dataset.to_string(),
                source,
            })?
            .ok_or_else(|| SessionError::DatasetNotFound(dataset.to_string()))?;
        debug!(dataset, calendar_id = %calendar_id, "resolved dataset calendar");
        Self::for_strategy(SessionStrategy::for_calendar_id(&calendar_id), calendars)
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn strategy(&self) -> &SessionStrategy {
        &self.strategy
    }

    pub fn calendar(&self) -> &dyn TradingCalendar {
        self.calendar.as_ref()
    }

    pub fn calendar_id(&self) -> &str {
        self.strategy.calendar_id()
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    /// Canonical sessions in the inclusive range, bounds normalised to UTC
    /// dates first. Deterministic for a given calendar and range.
    pub fn sessions(
        &self,
        start: impl UtcDate,
        end: impl UtcDate,
    ) -> Result<SessionSet, SessionError> {
        let (start, end) = (start.utc_date(), end.utc_date());
        if start > end {
            return Ok(SessionSet::new());
        }
        Ok(self
            .calendar
            .sessions_in_range(start, end)?
            .into_iter()
            .collect())
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Thread `series` through the strategy's filters in order.
    ///
    /// The first failing filter aborts the pipeline; nothing partial is
    /// returned.
    pub fn apply_filters(&self, series: &BarSeries) -> Result<BarSeries, SessionError> {
        if series.is_empty() {
            return Ok(series.clone());
        }
        let ctx = FilterContext {
            calendar: self.calendar.as_ref(),
            calendar_id: self.strategy.calendar_id(),
            frequency: self.frequency,
        };

        let mut current = series.clone();
        for filter in self.strategy.filters() {
            let rows_in = current.len();
            current = filter
                .apply(&current, &ctx)
                .map_err(|source| SessionError::FilterFailure {
                    filter: filter.name(),
                    input: current.summary(),
                    source,
                })?;
            debug!(
                calendar_id = %ctx.calendar_id,
                filter = filter.name(),
                rows_in,
                rows_out = current.len(),
                "filter applied"
            );
        }
        Ok(current)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, expected: &SessionSet, actual: &SessionSet) -> ValidationOutcome {
        self.strategy.validate(expected, actual)
    }

    /// Compare canonical sessions against what `store` holds for `dataset`.
    ///
    /// Any failure obtaining either side becomes a soft failure
    /// (`passed == false`, no report) instead of an error.
    pub fn validate_against_stored(
        &self,
        store: &dyn SessionStore,
        dataset: &str,
        start: impl UtcDate,
        end: impl UtcDate,
    ) -> ValidationOutcome {
        let (start, end) = (start.utc_date(), end.utc_date());

        let expected = match self.sessions(start, end) {
            Ok(s) => s,
            Err(err) => return soft_failure(dataset, &err.to_string()),
        };
        let actual = match store.load_sessions(dataset, start, end) {
            Ok(s) => s,
            Err(err) => return soft_failure(dataset, &format!("{err:#}")),
        };

        let outcome = self.validate(&expected, &actual);
        debug!(
            dataset,
            calendar_id = %self.calendar_id(),
            passed = outcome.passed,
            "validated stored sessions"
        );
        outcome
    }
}

fn soft_failure(dataset: &str, cause: &str) -> ValidationOutcome {
    warn!(dataset, cause, "session validation could not run");
    ValidationOutcome::soft_failure(cause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::Bar;
    use crate::registry::{BundleIndex, BundleWriter};
    use calign_calendar::{ymd, ForexCalendar, CRYPTO, FOREX, XNYS};
    use chrono::{TimeZone, Utc};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn manager_and_strategy_are_shareable() {
        assert_send_sync::<SessionManager>();
        assert_send_sync::<SessionStrategy>();
    }

    #[test]
    fn asset_class_binds_expected_calendar() {
        let cals = CalendarRegistry::builtin();
        for (tag, id) in [("forex", FOREX), ("crypto", CRYPTO), ("equity", XNYS)] {
            let m = SessionManager::for_asset_class(tag, &cals).unwrap();
            assert_eq!(m.calendar_id(), id);
            assert_eq!(m.calendar().calendar_id(), id);
        }
    }

    #[test]
    fn unknown_tag_and_missing_calendar() {
        let cals = CalendarRegistry::builtin();
        assert!(matches!(
            SessionManager::for_asset_class("bonds", &cals),
            Err(SessionError::UnknownAssetClass(_))
        ));
        assert!(matches!(
            SessionManager::for_asset_class("forex", &CalendarRegistry::new()),
            Err(SessionError::UnknownCalendar(id)) if id == FOREX
        ));
    }

    #[test]
    fn named_dataset_uses_recorded_calendar() {
        let cals = CalendarRegistry::builtin();
        let idx = BundleIndex::new();
        idx.record_calendar("fx-daily", FOREX).unwrap();
        let m = SessionManager::for_named_dataset("fx-daily", &idx, &cals).unwrap();
        assert_eq!(m.strategy(), &SessionStrategy::Forex);
        assert!(matches!(
            SessionManager::for_named_dataset("nope", &idx, &cals),
            Err(SessionError::DatasetNotFound(_))
        ));
    }

    #[test]
    fn inverted_range_is_empty_and_out_of_bounds_errors() {
        let m = SessionManager::for_asset_class("crypto", &CalendarRegistry::builtin()).unwrap();
        assert!(m.sessions(ymd(2024, 2, 1), ymd(2024, 1, 1)).unwrap().is_empty());
        assert!(matches!(
            m.sessions(ymd(2000, 1, 1), ymd(2000, 1, 5)),
            Err(SessionError::Calendar(_))
        ));
    }

    #[test]
    fn failing_filter_is_named() {
        let mut cals = CalendarRegistry::builtin();
        cals.register(Arc::new(ForexCalendar::with_bounds(
            ymd(2024, 1, 1),
            ymd(2024, 1, 31),
        )));
        let m = SessionManager::for_asset_class("fx", &cals).unwrap();
        let series = BarSeries::from_rows(vec![
            (Utc.with_ymd_and_hms(2024, 1, 30, 0, 0, 0).unwrap(), Bar::new(1, 1, 1, 1, 1)),
            (Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap(), Bar::new(1, 1, 1, 1, 1)),
        ])
        .unwrap();
        match m.apply_filters(&series) {
            Err(SessionError::FilterFailure { filter, input, .. }) => {
                assert_eq!(filter, "calendar_session");
                assert!(input.starts_with("2 rows"));
            }
            other => panic!("expected FilterFailure, got {other:?}"),
        }
    }
}
