//! Ordered, deduplicated sets of UTC session dates.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Ordered set of UTC session dates. Produced by a calendar; never mutated
/// by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionSet {
    dates: BTreeSet<NaiveDate>,
}

impl SessionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.dates.contains(date)
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Ascending iteration.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &NaiveDate> + ExactSizeIterator {
        self.dates.iter()
    }

    /// Dates in `self` that are not in `other`, ascending.
    pub fn difference(&self, other: &SessionSet) -> Vec<NaiveDate> {
        self.dates.difference(&other.dates).copied().collect()
    }

    /// Sub-set restricted to the inclusive range `[start, end]`.
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> SessionSet {
        if start > end {
            return SessionSet::new();
        }
        self.dates.range(start..=end).copied().collect()
    }

    pub fn as_btree(&self) -> &BTreeSet<NaiveDate> {
        &self.dates
    }
}

impl FromIterator<NaiveDate> for SessionSet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<NaiveDate>> for SessionSet {
    fn from(v: Vec<NaiveDate>) -> Self {
        v.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a SessionSet {
    type Item = &'a NaiveDate;
    type IntoIter = std::collections::btree_set::Iter<'a, NaiveDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.dates.iter()
    }
}

// ---------------------------------------------------------------------------
// Bound normalization
// ---------------------------------------------------------------------------

/// A range bound that can be normalized to a timezone-naive UTC date.
///
/// Zoned instants are converted to UTC first and only then stripped to a
/// date, so `2024-01-02T01:00+03:00` is the UTC date 2024-01-01.
pub trait UtcDate {
    fn utc_date(&self) -> NaiveDate;
}

impl UtcDate for NaiveDate {
    fn utc_date(&self) -> NaiveDate {
        *self
    }
}

/// Naive date-times are taken to already be UTC.
impl UtcDate for NaiveDateTime {
    fn utc_date(&self) -> NaiveDate {
        self.date()
    }
}

impl<Tz: TimeZone> UtcDate for DateTime<Tz> {
    fn utc_date(&self) -> NaiveDate {
        self.with_timezone(&Utc).date_naive()
    }
}

impl<T: UtcDate + ?Sized> UtcDate for &T {
    fn utc_date(&self) -> NaiveDate {
        (**self).utc_date()
    }
}
