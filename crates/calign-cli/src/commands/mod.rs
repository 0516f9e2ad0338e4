//! Command handler modules for calign.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod ingest;
pub mod sessions;
pub mod validate;

use anyhow::{Context, Result};
use calign_calendar::CalendarRegistry;
use calign_config::{report_unused_keys, AlignmentConfig, UnusedKeyPolicy};
use calign_sessions::{AssetClass, SessionManager, SessionStrategy, Strictness};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse a CLI date bound. RFC 3339 instants are converted to UTC first.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .with_context(|| format!("invalid date '{raw}'. expected YYYY-MM-DD or RFC 3339"))
}

/// Load alignment settings from layered YAML. No paths means all defaults.
/// Unused keys are logged, never fatal.
pub fn load_alignment(config_paths: &[String]) -> Result<AlignmentConfig> {
    if config_paths.is_empty() {
        return Ok(AlignmentConfig::default());
    }
    let loaded = calign_config::load_layered_yaml(config_paths)?;
    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !unused.is_clean() {
        warn!(keys = ?unused.unused_leaf_pointers, "unused config keys");
    }
    info!(config_hash = %loaded.config_hash, "config loaded");
    loaded.alignment()
}

/// Manager for `asset_class` at the configured frequency. Equity binds to
/// the configured exchange calendar.
pub fn build_manager(
    asset_class: &str,
    cfg: &AlignmentConfig,
    calendars: &CalendarRegistry,
) -> Result<SessionManager> {
    let strategy = match AssetClass::parse(asset_class)? {
        AssetClass::Equity => SessionStrategy::Equity {
            calendar_id: cfg.equity_calendar.clone(),
        },
        other => SessionStrategy::for_asset_class(other),
    };
    Ok(SessionManager::for_strategy(strategy, calendars)?.with_frequency(cfg.frequency))
}

pub fn effective_strictness(strict_flag: bool, cfg: &AlignmentConfig) -> Strictness {
    if strict_flag {
        Strictness::Fail
    } else {
        cfg.strictness
    }
}
