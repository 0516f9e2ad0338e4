//! Collaborator seams and a file-backed bundle index.
//!
//! The session manager never owns persistence. It reads through
//! [`DatasetRegistry`] and [`SessionStore`]; the ingestion call site writes
//! through [`BundleWriter`]. [`BundleIndex`] implements all three over a
//! caller-owned map that can be saved to and loaded from JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::bars::BarSeries;
use crate::flatfile::write_bars_csv;
use crate::session_set::SessionSet;

/// Dataset name -> recorded calendar id.
pub trait DatasetRegistry: Send + Sync {
    /// `Ok(None)` when no record exists for `dataset`.
    fn lookup(&self, dataset: &str) -> Result<Option<String>>;
}

/// Sessions actually stored for a dataset.
pub trait SessionStore: Send + Sync {
    /// Stored session dates in the inclusive range `[start, end]`.
    fn load_sessions(&self, dataset: &str, start: NaiveDate, end: NaiveDate)
        -> Result<SessionSet>;
}

/// Sink for filtered series.
pub trait BundleWriter: Send + Sync {
    fn write_series(&self, dataset: &str, symbol: &str, series: &BarSeries) -> Result<()>;
    fn record_calendar(&self, dataset: &str, calendar_id: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// BundleIndex
// ---------------------------------------------------------------------------

/// One ingested dataset: its calendar and the session dates last written
/// for each symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub calendar_id: Option<String>,
    pub symbols: BTreeMap<String, SessionSet>,
}

impl DatasetRecord {
    /// Union of every symbol's stored sessions.
    pub fn sessions(&self) -> SessionSet {
        self.symbols
            .values()
            .flat_map(|s| s.iter().copied())
            .collect()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexState {
    datasets: BTreeMap<String, DatasetRecord>,
}

/// Caller-owned record of ingested datasets.
///
/// With a data directory attached (`with_data_dir`), written series are also
/// persisted as `<dir>/<dataset>/<symbol>.csv`.
#[derive(Debug, Default)]
pub struct BundleIndex {
    state: RwLock<IndexState>,
    data_dir: Option<PathBuf>,
}

impl BundleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Load an index written by [`BundleIndex::save`]. A missing file yields an
    /// empty index.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read bundle index failed: {}", path.display()))?;
        let datasets: BTreeMap<String, DatasetRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("parse bundle index failed: {}", path.display()))?;
        Ok(Self {
            state: RwLock::new(IndexState { datasets }),
            data_dir: None,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let state = self.read()?;
        let json = serde_json::to_string_pretty(&state.datasets)
            .context("serialize bundle index failed")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir failed: {}", parent.display()))?;
        }
        fs::write(path, json)
            .with_context(|| format!("write bundle index failed: {}", path.display()))
    }

    pub fn record(&self, dataset: &str) -> Result<Option<DatasetRecord>> {
        Ok(self.read()?.datasets.get(dataset).cloned())
    }

    pub fn datasets(&self) -> Result<Vec<String>> {
        Ok(self.read()?.datasets.keys().cloned().collect())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, IndexState>> {
        self.state
            .read()
            .map_err(|_| anyhow!("bundle index lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, IndexState>> {
        self.state
            .write()
            .map_err(|_| anyhow!("bundle index lock poisoned"))
    }
}

impl DatasetRegistry for BundleIndex {
    fn lookup(&self, dataset: &str) -> Result<Option<String>> {
        Ok(self
            .read()?
            .datasets
            .get(dataset)
            .and_then(|r| r.calendar_id.clone()))
    }
}

impl SessionStore for BundleIndex {
    fn load_sessions(
        &self,
        dataset: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SessionSet> {
        let state = self.read()?;
        let record = state
            .datasets
            .get(dataset)
            .ok_or_else(|| anyhow!("no stored sessions for dataset '{dataset}'"))?;
        Ok(record.sessions().within(start, end))
    }
}

impl BundleWriter for BundleIndex {
    fn write_series(&self, dataset: &str, symbol: &str, series: &BarSeries) -> Result<()> {
        if let Some(dir) = &self.data_dir {
            let path = dir.join(dataset).join(format!("{symbol}.csv"));
            write_bars_csv(&path, series)?;
        }
        let mut state = self.write()?;
        // A rewrite replaces the symbol's dates, matching the overwritten CSV.
        state
            .datasets
            .entry(dataset.to_string())
            .or_default()
            .symbols
            .insert(symbol.to_string(), series.dates().into_iter().collect());
        Ok(())
    }

    fn record_calendar(&self, dataset: &str, calendar_id: &str) -> Result<()> {
        let mut state = self.write()?;
        state
            .datasets
            .entry(dataset.to_string())
            .or_default()
            .calendar_id = Some(calendar_id.to_string());
        Ok(())
    }
}
