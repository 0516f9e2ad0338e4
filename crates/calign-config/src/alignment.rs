use anyhow::{bail, Context, Result};
use calign_sessions::{AssetClass, Frequency, SessionStrategy, Strictness};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-pointer prefixes read by [`AlignmentConfig`]. Anything outside these
/// is reported by `report_unused_keys`.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/frequency",
    "/equity_calendar",
    "/strictness",
    "/report/max_listed",
];

/// Settings for the session-alignment pipeline.
///
/// ```yaml
/// frequency: daily        # daily | intraday
/// equity_calendar: XNYS   # calendar id equity datasets bind to
/// strictness: warn        # warn | fail
/// report:
///   max_listed: 10        # dates listed per section of the markdown report
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub frequency: Frequency,
    pub equity_calendar: String,
    pub strictness: Strictness,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub max_listed: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            frequency: Frequency::Daily,
            equity_calendar: SessionStrategy::for_asset_class(AssetClass::Equity)
                .calendar_id()
                .to_string(),
            strictness: Strictness::Warn,
            report: ReportConfig::default(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { max_listed: 10 }
    }
}

impl AlignmentConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: AlignmentConfig = serde_json::from_value(config_json.clone())
            .context("invalid alignment config")?;
        if cfg.equity_calendar.trim().is_empty() {
            bail!("invalid alignment config: equity_calendar must not be empty");
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_config_takes_defaults() {
        let cfg = AlignmentConfig::from_json(&json!({})).unwrap();
        assert_eq!(cfg, AlignmentConfig::default());
        assert_eq!(cfg.equity_calendar, "XNYS");
        assert_eq!(cfg.report.max_listed, 10);
    }

    #[test]
    fn explicit_values_parse() {
        let cfg = AlignmentConfig::from_json(&json!({
            "frequency": "intraday",
            "strictness": "fail",
            "equity_calendar": "XLON",
            "report": { "max_listed": 3 }
        }))
        .unwrap();
        assert_eq!(cfg.frequency, Frequency::Intraday);
        assert_eq!(cfg.strictness, Strictness::Fail);
        assert_eq!(cfg.equity_calendar, "XLON");
        assert_eq!(cfg.report.max_listed, 3);
    }

    #[test]
    fn bad_enum_value_is_rejected() {
        assert!(AlignmentConfig::from_json(&json!({ "strictness": "maybe" })).is_err());
        assert!(AlignmentConfig::from_json(&json!({ "equity_calendar": " " })).is_err());
    }
}
