//! Error taxonomy for the session-alignment core.
//!
//! Session-count mismatches are not errors: they come back as a
//! [`crate::ValidationOutcome`]. Only the call sites in [`crate::ingest`]
//! turn a mismatch into [`SessionError::SessionMismatch`], and only when the
//! caller asked for [`crate::Strictness::Fail`].

use calign_calendar::CalendarError;
use thiserror::Error;

use crate::bars::SeriesError;

/// Failure inside a single filter primitive.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("volume overflow consolidating {sunday} into {friday}")]
    VolumeOverflow {
        friday: chrono::NaiveDate,
        sunday: chrono::NaiveDate,
    },

    /// A daily primitive saw more than one bar on a UTC date.
    #[error("{count} bars on {date} but frequency is daily; run intraday data with Frequency::Intraday")]
    FrequencyMismatch {
        date: chrono::NaiveDate,
        count: usize,
    },
}

/// Caller-visible errors of the session manager and its call sites.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown asset class '{0}'. expected one of: forex | crypto | equity")]
    UnknownAssetClass(String),

    #[error("no calendar registered for id '{0}'")]
    UnknownCalendar(String),

    #[error("dataset '{0}' not found in registry")]
    DatasetNotFound(String),

    #[error("registry lookup for dataset '{dataset}' failed")]
    Registry {
        dataset: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// A filter raised; the pipeline result was discarded.
    #[error("filter '{filter}' failed on input {input}")]
    FilterFailure {
        filter: &'static str,
        input: String,
        #[source]
        source: FilterError,
    },

    #[error("writing dataset '{dataset}' failed")]
    Write {
        dataset: String,
        #[source]
        source: anyhow::Error,
    },

    /// Ingest parameters describe a different run than the manager performs.
    #[error("ingest params say {field}={params} but the manager is bound to {field}={manager}")]
    ParamsMismatch {
        field: &'static str,
        params: &'static str,
        manager: &'static str,
    },

    /// Session validation failed under a fail-closed strictness policy.
    #[error("session mismatch: {0}")]
    SessionMismatch(String),
}
