//! Filter primitives: stateless `(series, calendar, context) -> series`
//! transforms.
//!
//! Every primitive takes the input by reference and returns a new series.
//! A primitive that fails returns `Err` and no partial result escapes.
//!
//! | Primitive              | Daily                         | Intraday                          |
//! |------------------------|-------------------------------|-----------------------------------|
//! | pre-session trim       | no-op                         | drop bars before the session open |
//! | Sunday consolidation   | fold Sunday into Friday       | no-op                             |
//! | calendar-session       | keep session dates only       | keep session dates only           |
//! | gap-fill               | reindex onto session dates    | one bar at each missing open      |

use std::collections::{BTreeMap, BTreeSet};

use calign_calendar::TradingCalendar;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use tracing::{debug, warn};

use crate::bars::{Bar, BarSeries, Frequency};
use crate::error::FilterError;

// ---------------------------------------------------------------------------
// Context + dispatch
// ---------------------------------------------------------------------------

/// What every primitive gets besides the series itself.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub calendar: &'a dyn TradingCalendar,
    pub calendar_id: &'a str,
    pub frequency: Frequency,
}

/// One step of a strategy's filter pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterPrimitive {
    PreSessionTrim,
    SundayConsolidation,
    CalendarSession,
    /// Gaps between real bars longer than `max_gap_days` calendar days are
    /// logged, never rejected.
    GapFill { max_gap_days: i64 },
}

impl FilterPrimitive {
    pub fn name(&self) -> &'static str {
        match self {
            FilterPrimitive::PreSessionTrim => "pre_session_trim",
            FilterPrimitive::SundayConsolidation => "sunday_consolidation",
            FilterPrimitive::CalendarSession => "calendar_session",
            FilterPrimitive::GapFill { .. } => "gap_fill",
        }
    }

    pub fn apply(
        &self,
        series: &BarSeries,
        ctx: &FilterContext<'_>,
    ) -> Result<BarSeries, FilterError> {
        match self {
            FilterPrimitive::PreSessionTrim => pre_session_trim(series, ctx),
            FilterPrimitive::SundayConsolidation => consolidate_sundays(series, ctx),
            FilterPrimitive::CalendarSession => filter_to_sessions(series, ctx),
            FilterPrimitive::GapFill { max_gap_days } => gap_fill(series, ctx, *max_gap_days),
        }
    }
}

// ---------------------------------------------------------------------------
// Pre-session trim
// ---------------------------------------------------------------------------

/// Drop intraday bars that precede their UTC date's session open.
///
/// For a session that wraps midnight, bars stamped before the open on date D
/// belong to D−1's session. Dates that are not sessions lose all their bars,
/// as do dates whose open cannot be resolved (e.g. outside calendar bounds).
/// Daily series pass through unchanged: they are stamped by session date.
pub fn pre_session_trim(
    series: &BarSeries,
    ctx: &FilterContext<'_>,
) -> Result<BarSeries, FilterError> {
    if ctx.frequency == Frequency::Daily {
        return Ok(series.clone());
    }

    let opens: BTreeMap<NaiveDate, Option<DateTime<Utc>>> = series
        .dates()
        .into_iter()
        .map(|date| {
            let open = if ctx.calendar.is_session(date) {
                ctx.calendar.session_open(date).ok()
            } else {
                None
            };
            (date, open)
        })
        .collect();

    let before = series.len();
    let out = series.clone().retain(|ts, _| {
        matches!(opens.get(&ts.date_naive()), Some(Some(open)) if ts >= open)
    });
    debug!(
        calendar_id = %ctx.calendar_id,
        dropped = before - out.len(),
        "pre-session trim"
    );
    Ok(out)
}

// ---------------------------------------------------------------------------
// Sunday-into-Friday consolidation
// ---------------------------------------------------------------------------

/// Fold every Sunday daily bar into the Friday bar two days earlier.
///
/// Friday keeps its open, takes Sunday's close, the pairwise max high and min
/// low, and the summed volume. A Sunday bar without a Friday is dropped and
/// logged. Intraday series pass through unchanged.
pub fn consolidate_sundays(
    series: &BarSeries,
    ctx: &FilterContext<'_>,
) -> Result<BarSeries, FilterError> {
    if ctx.frequency == Frequency::Intraday {
        return Ok(series.clone());
    }

    let by_date: BTreeMap<NaiveDate, DateTime<Utc>> = daily_bars_by_date(series)?
        .into_iter()
        .map(|(date, (ts, _))| (date, ts))
        .collect();

    let sundays: Vec<DateTime<Utc>> = series
        .timestamps()
        .filter(|ts| ts.weekday() == Weekday::Sun)
        .copied()
        .collect();

    let mut out = series.clone();
    for sun_ts in sundays {
        let Some(sunday) = out.remove(&sun_ts) else {
            continue;
        };
        let sunday_date = sun_ts.date_naive();
        let friday_date = sunday_date - Duration::days(2);

        let friday = by_date
            .get(&friday_date)
            .and_then(|fri_ts| out.get_mut(fri_ts));
        let Some(friday) = friday else {
            warn!(
                calendar_id = %ctx.calendar_id,
                sunday = %sunday_date,
                "unmatched Sunday bar dropped: no Friday bar to consolidate into"
            );
            continue;
        };

        let volume = friday.volume.checked_add(sunday.volume).ok_or(
            FilterError::VolumeOverflow {
                friday: friday_date,
                sunday: sunday_date,
            },
        )?;
        friday.close_micros = sunday.close_micros;
        friday.high_micros = friday.high_micros.max(sunday.high_micros);
        friday.low_micros = friday.low_micros.min(sunday.low_micros);
        friday.volume = volume;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Calendar-session filter
// ---------------------------------------------------------------------------

/// Keep only bars whose UTC date is a canonical session for the series' own
/// date range. Idempotent.
pub fn filter_to_sessions(
    series: &BarSeries,
    ctx: &FilterContext<'_>,
) -> Result<BarSeries, FilterError> {
    let Some((start, end)) = series.date_range() else {
        return Ok(series.clone());
    };
    let sessions: BTreeSet<NaiveDate> = ctx
        .calendar
        .sessions_in_range(start, end)?
        .into_iter()
        .collect();

    let before = series.len();
    let out = series
        .clone()
        .retain(|ts, _| sessions.contains(&ts.date_naive()));
    debug!(
        calendar_id = %ctx.calendar_id,
        dropped = before - out.len(),
        "calendar-session filter"
    );
    Ok(out)
}

// ---------------------------------------------------------------------------
// Gap-fill
// ---------------------------------------------------------------------------

/// Reindex onto the canonical session set for the series' range.
///
/// Missing sessions get a bar forward-filled from the nearest prior real bar
/// with zero volume. Sessions before the first real bar have nothing to fill
/// from and stay absent.
///
/// Daily: every output bar is keyed at 00:00 UTC of its session date.
/// Intraday: real bars are kept as-is and each missing session gets one bar
/// at its open instant.
pub fn gap_fill(
    series: &BarSeries,
    ctx: &FilterContext<'_>,
    max_gap_days: i64,
) -> Result<BarSeries, FilterError> {
    let Some((start, end)) = series.date_range() else {
        return Ok(BarSeries::new());
    };
    let sessions = ctx.calendar.sessions_in_range(start, end)?;

    let out = match ctx.frequency {
        Frequency::Daily => gap_fill_daily(series, &sessions, ctx, max_gap_days)?,
        Frequency::Intraday => gap_fill_intraday(series, &sessions, ctx, max_gap_days)?,
    };
    debug!(
        calendar_id = %ctx.calendar_id,
        synthesized = out.len().saturating_sub(series.len()),
        "gap-fill"
    );
    Ok(out)
}

fn gap_fill_daily(
    series: &BarSeries,
    sessions: &[NaiveDate],
    ctx: &FilterContext<'_>,
    max_gap_days: i64,
) -> Result<BarSeries, FilterError> {
    let real: BTreeMap<NaiveDate, Bar> = daily_bars_by_date(series)?
        .into_iter()
        .map(|(date, (_, bar))| (date, bar))
        .collect();

    let mut out = BarSeries::new();
    let mut last_real: Option<(NaiveDate, Bar)> = None;
    let mut run: Vec<NaiveDate> = Vec::new();

    for &date in sessions {
        let key = session_midnight(date);
        if let Some(bar) = real.get(&date) {
            if let (Some((prev_date, _)), false) = (last_real, run.is_empty()) {
                warn_on_large_gap(ctx, prev_date, date, run.len(), max_gap_days);
            }
            run.clear();
            out.insert(key, *bar);
            last_real = Some((date, *bar));
        } else if let Some((_, prev)) = last_real {
            out.insert(key, Bar::synthetic_from(&prev));
            run.push(date);
        }
    }
    if let (Some((prev_date, _)), Some(&last_missing)) = (last_real, run.last()) {
        warn_on_large_gap(ctx, prev_date, last_missing, run.len(), max_gap_days);
    }
    Ok(out)
}

fn gap_fill_intraday(
    series: &BarSeries,
    sessions: &[NaiveDate],
    ctx: &FilterContext<'_>,
    max_gap_days: i64,
) -> Result<BarSeries, FilterError> {
    let present = series.dates();

    let mut out = series.clone();
    let mut last_real_date: Option<NaiveDate> = None;
    let mut run: Vec<NaiveDate> = Vec::new();

    for &date in sessions {
        if present.contains(&date) {
            if let (Some(prev_date), false) = (last_real_date, run.is_empty()) {
                warn_on_large_gap(ctx, prev_date, date, run.len(), max_gap_days);
            }
            run.clear();
            last_real_date = Some(date);
            continue;
        }

        let open = ctx.calendar.session_open(date)?;
        if let Some((_, prev)) = series.last_before(&open) {
            out.insert(open, Bar::synthetic_from(prev));
            run.push(date);
        }
    }
    if let (Some(prev_date), Some(&last_missing)) = (last_real_date, run.last()) {
        warn_on_large_gap(ctx, prev_date, last_missing, run.len(), max_gap_days);
    }
    Ok(out)
}

fn warn_on_large_gap(
    ctx: &FilterContext<'_>,
    from: NaiveDate,
    to: NaiveDate,
    synthesized: usize,
    max_gap_days: i64,
) {
    let gap_days = (to - from).num_days();
    if gap_days > max_gap_days {
        warn!(
            calendar_id = %ctx.calendar_id,
            from = %from,
            to = %to,
            gap_days,
            max_gap_days,
            synthesized,
            "gap exceeds threshold; likely upstream data problem"
        );
    }
}

/// One bar per UTC date, or `FrequencyMismatch` naming the first date that
/// carries more.
fn daily_bars_by_date(
    series: &BarSeries,
) -> Result<BTreeMap<NaiveDate, (DateTime<Utc>, Bar)>, FilterError> {
    let mut by_date = BTreeMap::new();
    for (ts, bar) in series.iter() {
        let date = ts.date_naive();
        if by_date.insert(date, (*ts, *bar)).is_some() {
            let count = series.timestamps().filter(|t| t.date_naive() == date).count();
            return Err(FilterError::FrequencyMismatch { date, count });
        }
    }
    Ok(by_date)
}

fn session_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
