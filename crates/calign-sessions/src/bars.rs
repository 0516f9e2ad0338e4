//! OHLCV bar series keyed by UTC timestamp.
//!
//! Prices are integer micros (1 unit = 1_000_000 micros) so forward-fill,
//! max/min and volume sums are exact. A [`BarSeries`] is always UTC, strictly
//! increasing and duplicate-free; the `BTreeMap` key makes that structural.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Bar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub open_micros: i64,
    pub high_micros: i64,
    pub low_micros: i64,
    pub close_micros: i64,
    pub volume: i64,
}

impl Bar {
    pub fn new(
        open_micros: i64,
        high_micros: i64,
        low_micros: i64,
        close_micros: i64,
        volume: i64,
    ) -> Self {
        Self {
            open_micros,
            high_micros,
            low_micros,
            close_micros,
            volume,
        }
    }

    /// Forward-filled copy of `self` with zero volume: "no real trading".
    pub fn synthetic_from(prev: &Bar) -> Self {
        Self { volume: 0, ..*prev }
    }
}

// ---------------------------------------------------------------------------
// Frequency
// ---------------------------------------------------------------------------

/// Granularity of a bar series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One bar per session, stamped at 00:00 UTC of the session date.
    #[default]
    Daily,
    /// Several bars per session (minute, hourly, ...).
    Intraday,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Intraday => "intraday",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "1d" | "day" => Ok(Frequency::Daily),
            "intraday" | "minute" | "1m" => Ok(Frequency::Intraday),
            other => Err(format!(
                "invalid frequency '{other}'. expected one of: daily | intraday"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("duplicate bar timestamp {0}")]
    DuplicateTimestamp(DateTime<Utc>),
}

// ---------------------------------------------------------------------------
// BarSeries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarSeries {
    bars: BTreeMap<DateTime<Utc>, Bar>,
}

impl BarSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from rows in any timezone; timestamps are converted to
    /// UTC on entry. Rows may arrive unordered; duplicates (after conversion)
    /// are rejected.
    pub fn from_rows<Tz, I>(rows: I) -> Result<Self, SeriesError>
    where
        Tz: TimeZone,
        I: IntoIterator<Item = (DateTime<Tz>, Bar)>,
    {
        let mut bars = BTreeMap::new();
        for (ts, bar) in rows {
            let ts = ts.with_timezone(&Utc);
            if bars.insert(ts, bar).is_some() {
                return Err(SeriesError::DuplicateTimestamp(ts));
            }
        }
        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, ts: &DateTime<Utc>) -> Option<&Bar> {
        self.bars.get(ts)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&DateTime<Utc>, &Bar)> {
        self.bars.iter()
    }

    pub fn timestamps(&self) -> impl DoubleEndedIterator<Item = &DateTime<Utc>> {
        self.bars.keys()
    }

    pub fn first_ts(&self) -> Option<DateTime<Utc>> {
        self.bars.keys().next().copied()
    }

    pub fn last_ts(&self) -> Option<DateTime<Utc>> {
        self.bars.keys().next_back().copied()
    }

    /// Inclusive `(min, max)` UTC dates covered by the series.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((
            self.first_ts()?.date_naive(),
            self.last_ts()?.date_naive(),
        ))
    }

    /// Distinct UTC dates that carry at least one bar.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.bars.keys().map(|ts| ts.date_naive()).collect()
    }

    /// Last bar strictly before `ts`.
    pub fn last_before(&self, ts: &DateTime<Utc>) -> Option<(&DateTime<Utc>, &Bar)> {
        self.bars.range(..*ts).next_back()
    }

    /// Keep only bars for which `keep` returns `true`.
    pub(crate) fn retain<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&DateTime<Utc>, &Bar) -> bool,
    {
        self.bars.retain(|ts, bar| keep(ts, bar));
        self
    }

    pub(crate) fn insert(&mut self, ts: DateTime<Utc>, bar: Bar) -> Option<Bar> {
        self.bars.insert(ts, bar)
    }

    pub(crate) fn remove(&mut self, ts: &DateTime<Utc>) -> Option<Bar> {
        self.bars.remove(ts)
    }

    pub(crate) fn get_mut(&mut self, ts: &DateTime<Utc>) -> Option<&mut Bar> {
        self.bars.get_mut(ts)
    }

    /// One-line description used in error context: row count and span.
    pub fn summary(&self) -> String {
        match (self.first_ts(), self.last_ts()) {
            (Some(first), Some(last)) => format!(
                "{} rows [{} .. {}]",
                self.len(),
                first.to_rfc3339(),
                last.to_rfc3339()
            ),
            _ => "0 rows".to_string(),
        }
    }
}

impl fmt::Display for BarSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BarSeries({})", self.summary())
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = (&'a DateTime<Utc>, &'a Bar);
    type IntoIter = std::collections::btree_map::Iter<'a, DateTime<Utc>, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
