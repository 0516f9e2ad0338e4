//! CSV flat-file loader and writer for bar series.
//!
//! ## Column contract
//!
//! | Column      | Example                    | Notes                                  |
//! |-------------|----------------------------|----------------------------------------|
//! | `timestamp` | `2024-01-02T05:00:00Z`     | See [`parse_timestamp`]                |
//! | `open`      | `1.104520`                 | Decimal string, at most 6 places       |
//! | `high`      | `1.105000`                 |                                        |
//! | `low`       | `1.101000`                 |                                        |
//! | `close`     | `1.103300`                 |                                        |
//! | `volume`    | `1200`                     | Integer >= 0                           |
//!
//! Prices never pass through floating point: they are converted to integer
//! micros on read and rendered back from micros on write.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::bars::{Bar, BarSeries};

const MICROS_PER_UNIT: i64 = 1_000_000;
const MAX_DECIMAL_PLACES: usize = 6;

pub const CSV_HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlatFileError {
    #[error("price field '{field}' is empty")]
    EmptyPrice { field: &'static str },

    #[error("price field '{field}' could not be parsed: '{raw}'")]
    InvalidPrice { field: &'static str, raw: String },

    #[error("price field '{field}' has more than 6 decimal places: '{raw}'")]
    TooManyDecimalPlaces { field: &'static str, raw: String },

    #[error("unrecognised timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("OHLC sanity violation: {0}")]
    OhlcViolation(String),

    #[error("volume must be >= 0, got {0}")]
    NegativeVolume(i64),
}

// ---------------------------------------------------------------------------
// Field conversion
// ---------------------------------------------------------------------------

/// Convert a decimal price string to integer micros without floating point.
///
/// Accepts an optional sign and an optional fractional part of at most six
/// digits. Anything needing rounding is rejected.
pub fn price_to_micros(s: &str, field: &'static str) -> Result<i64, FlatFileError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(FlatFileError::EmptyPrice { field });
    }
    let invalid = || FlatFileError::InvalidPrice {
        field,
        raw: s.to_string(),
    };

    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid());
    }
    if frac_part.len() > MAX_DECIMAL_PLACES {
        return Err(FlatFileError::TooManyDecimalPlaces {
            field,
            raw: s.to_string(),
        });
    }

    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };
    let frac_val: i64 = format!("{frac_part:0<width$}", width = MAX_DECIMAL_PLACES)
        .parse()
        .map_err(|_| invalid())?;

    let micros = int_val
        .checked_mul(MICROS_PER_UNIT)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(invalid)?;
    Ok(if negative { -micros } else { micros })
}

/// Render micros as the shortest exact decimal string.
pub fn micros_to_price(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let int = abs / MICROS_PER_UNIT as u64;
    let frac = abs % MICROS_PER_UNIT as u64;
    if frac == 0 {
        return format!("{sign}{int}");
    }
    let frac = format!("{frac:06}");
    format!("{sign}{int}.{}", frac.trim_end_matches('0'))
}

/// Parse a bar timestamp into UTC.
///
/// Accepted forms, in order: RFC 3339 with any offset, `YYYY-MM-DD HH:MM:SS`
/// or `YYYY-MM-DDTHH:MM:SS` (taken as UTC), `YYYY-MM-DD` (00:00 UTC), and
/// integer epoch seconds.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, FlatFileError> {
    let s = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    s.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| FlatFileError::InvalidTimestamp(raw.to_string()))
}

fn validate_ohlc(bar: &Bar) -> Result<(), FlatFileError> {
    let Bar {
        open_micros: o,
        high_micros: h,
        low_micros: l,
        close_micros: c,
        volume,
    } = *bar;
    if volume < 0 {
        return Err(FlatFileError::NegativeVolume(volume));
    }
    if l > h {
        return Err(FlatFileError::OhlcViolation(format!("low ({l}) > high ({h})")));
    }
    if l > o.min(c) || h < o.max(c) {
        return Err(FlatFileError::OhlcViolation(format!(
            "open ({o}) / close ({c}) outside [{l}, {h}]"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: i64,
}

impl CsvRow {
    fn into_bar(self) -> Result<(DateTime<Utc>, Bar), FlatFileError> {
        let ts = parse_timestamp(&self.timestamp)?;
        let bar = Bar::new(
            price_to_micros(&self.open, "open")?,
            price_to_micros(&self.high, "high")?,
            price_to_micros(&self.low, "low")?,
            price_to_micros(&self.close, "close")?,
            self.volume,
        );
        validate_ohlc(&bar)?;
        Ok((ts, bar))
    }
}

/// Read a bar series from any CSV source. All-or-nothing: the first bad row
/// fails the whole read with its 1-based data row number.
pub fn read_bars<R: Read>(reader: R) -> Result<BarSeries> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (i, rec) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = i + 1;
        let rec = rec.with_context(|| format!("csv row {row}: decode failed"))?;
        let parsed = rec
            .into_bar()
            .with_context(|| format!("csv row {row}: invalid bar"))?;
        rows.push(parsed);
    }
    Ok(BarSeries::from_rows(rows)?)
}

pub fn read_bars_csv(path: impl AsRef<Path>) -> Result<BarSeries> {
    let path = path.as_ref();
    let file = fs::File::open(path)
        .with_context(|| format!("open bars csv failed: {}", path.display()))?;
    read_bars(file).with_context(|| format!("read bars csv failed: {}", path.display()))
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

pub fn write_bars<W: Write>(writer: W, series: &BarSeries) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(CSV_HEADER)?;
    for (ts, bar) in series {
        w.write_record([
            ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            micros_to_price(bar.open_micros),
            micros_to_price(bar.high_micros),
            micros_to_price(bar.low_micros),
            micros_to_price(bar.close_micros),
            bar.volume.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Write `series` to `path`, creating parent directories.
pub fn write_bars_csv(path: impl AsRef<Path>, series: &BarSeries) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create dir failed: {}", parent.display()))?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("create bars csv failed: {}", path.display()))?;
    write_bars(file, series).with_context(|| format!("write bars csv failed: {}", path.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
