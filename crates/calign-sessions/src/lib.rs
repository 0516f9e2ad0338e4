//! calign-sessions
//!
//! Session alignment core. Decides which timestamps are valid for an asset
//! class and repairs a bar series to match them, so that what ingestion
//! writes is exactly what a backtest later expects to read.
//!
//! - [`SessionStrategy`]: per-asset-class calendar id, filter pipeline and
//!   validation rule.
//! - [`SessionManager`]: binds a strategy to a calendar; enumerates sessions,
//!   applies filters, validates.
//! - [`MismatchReport`]: diff between expected and stored sessions.
//! - [`ingest`] / [`preflight`]: the two call sites that must agree.
//!
//! It does **not** fetch data or own persistence. Storage is reached through
//! the [`DatasetRegistry`], [`SessionStore`] and [`BundleWriter`] traits;
//! [`BundleIndex`] is a small JSON-backed implementation of all three.

pub mod bars;
pub mod error;
pub mod filters;
pub mod flatfile;
pub mod ingest;
pub mod manager;
pub mod registry;
pub mod report;
pub mod session_set;
pub mod strategy;

pub use bars::{Bar, BarSeries, Frequency, SeriesError};
pub use error::{FilterError, SessionError};
pub use filters::{FilterContext, FilterPrimitive};
pub use ingest::{ingest, preflight, IngestParams, IngestSummary, Strictness, SymbolSummary};
pub use manager::SessionManager;
pub use registry::{BundleIndex, BundleWriter, DatasetRecord, DatasetRegistry, SessionStore};
pub use report::{compare, MismatchReport};
pub use session_set::{SessionSet, UtcDate};
pub use strategy::{AssetClass, SessionStrategy, ValidationOutcome};
