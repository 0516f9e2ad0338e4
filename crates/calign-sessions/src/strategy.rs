//! Per-asset-class session policy.
//!
//! A [`SessionStrategy`] fixes three things for an asset class: which
//! calendar it trusts, the ordered filter pipeline that repairs raw bars, and
//! the rule deciding whether an expected and a stored session set agree.
//! Strategies are plain immutable values; share them freely across threads.

use calign_calendar::{CRYPTO, FOREX, XNYS};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::filters::FilterPrimitive;
use crate::report::{compare, MismatchReport};
use crate::session_set::SessionSet;

/// Forex gaps longer than this many calendar days are logged.
pub const FOREX_MAX_GAP_DAYS: i64 = 5;
/// Crypto gaps longer than this many calendar days are logged.
pub const CRYPTO_MAX_GAP_DAYS: i64 = 3;

/// Floor of the Forex count tolerance.
pub const FOREX_MIN_TOLERANCE: usize = 2;
/// Forex count tolerance as a fraction of the expected count, in basis points.
pub const FOREX_TOLERANCE_BPS: usize = 50;

/// How many missing dates a tolerant failure message lists.
const MISSING_SAMPLE_LEN: usize = 5;

// ---------------------------------------------------------------------------
// AssetClass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Forex,
    Crypto,
    Equity,
}

impl AssetClass {
    pub fn parse(tag: &str) -> Result<Self, SessionError> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "forex" | "fx" => Ok(AssetClass::Forex),
            "crypto" => Ok(AssetClass::Crypto),
            "equity" | "equities" | "stock" | "stocks" => Ok(AssetClass::Equity),
            _ => Err(SessionError::UnknownAssetClass(tag.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Forex => "forex",
            AssetClass::Crypto => "crypto",
            AssetClass::Equity => "equity",
        }
    }
}

impl std::str::FromStr for AssetClass {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetClass::parse(s)
    }
}

// ---------------------------------------------------------------------------
// ValidationOutcome
// ---------------------------------------------------------------------------

/// Result of comparing an expected and an actual session set.
///
/// `passed` is the verdict: it applies the strategy's count rule only.
/// `report.is_valid` also rejects any extra date, so a set with one date
/// swapped for another can pass while its report is invalid. Treat the report
/// as diagnostics and gate on `passed`.
///
/// `report` is `None` only for soft failures, where the stored set could not
/// be obtained at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub message: String,
    pub report: Option<MismatchReport>,
}

impl ValidationOutcome {
    pub fn soft_failure(cause: impl std::fmt::Display) -> Self {
        Self {
            passed: false,
            message: format!("validation failed: {cause}"),
            report: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStrategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionStrategy {
    /// 24/5, session wraps midnight UTC; tolerant validation.
    Forex,
    /// 24/7; strict validation.
    Crypto,
    /// Exchange hours with holidays; strict validation.
    Equity { calendar_id: String },
}

impl SessionStrategy {
    /// Strategy for an asset class. Equity binds to `XNYS`.
    pub fn for_asset_class(class: AssetClass) -> Self {
        match class {
            AssetClass::Forex => SessionStrategy::Forex,
            AssetClass::Crypto => SessionStrategy::Crypto,
            AssetClass::Equity => SessionStrategy::Equity {
                calendar_id: XNYS.to_string(),
            },
        }
    }

    /// Map a recorded calendar id back to its strategy. Any id other than the
    /// two continuous calendars is taken to name an exchange.
    pub fn for_calendar_id(calendar_id: &str) -> Self {
        match calendar_id {
            FOREX => SessionStrategy::Forex,
            CRYPTO => SessionStrategy::Crypto,
            other => SessionStrategy::Equity {
                calendar_id: other.to_string(),
            },
        }
    }

    pub fn asset_class(&self) -> AssetClass {
        match self {
            SessionStrategy::Forex => AssetClass::Forex,
            SessionStrategy::Crypto => AssetClass::Crypto,
            SessionStrategy::Equity { .. } => AssetClass::Equity,
        }
    }

    pub fn calendar_id(&self) -> &str {
        match self {
            SessionStrategy::Forex => FOREX,
            SessionStrategy::Crypto => CRYPTO,
            SessionStrategy::Equity { calendar_id } => calendar_id,
        }
    }

    /// Ordered filter pipeline.
    pub fn filters(&self) -> Vec<FilterPrimitive> {
        match self {
            SessionStrategy::Forex => vec![
                FilterPrimitive::PreSessionTrim,
                FilterPrimitive::SundayConsolidation,
                FilterPrimitive::CalendarSession,
                FilterPrimitive::GapFill {
                    max_gap_days: FOREX_MAX_GAP_DAYS,
                },
            ],
            SessionStrategy::Crypto => vec![
                FilterPrimitive::CalendarSession,
                FilterPrimitive::GapFill {
                    max_gap_days: CRYPTO_MAX_GAP_DAYS,
                },
            ],
            SessionStrategy::Equity { .. } => vec![FilterPrimitive::CalendarSession],
        }
    }

    /// Allowed `|expected - actual|` for a given expected count.
    ///
    /// Forex: `floor(max(2, 0.5% of expected))`. Everything else: 0.
    pub fn tolerance(&self, expected_count: usize) -> usize {
        match self {
            SessionStrategy::Forex => {
                (expected_count * FOREX_TOLERANCE_BPS / 10_000).max(FOREX_MIN_TOLERANCE)
            }
            SessionStrategy::Crypto | SessionStrategy::Equity { .. } => 0,
        }
    }

    pub fn validate(&self, expected: &SessionSet, actual: &SessionSet) -> ValidationOutcome {
        let tolerance = self.tolerance(expected.len());
        let report = compare(expected, actual, tolerance);
        let (e, a) = (expected.len(), actual.len());

        let (passed, message) = match self {
            SessionStrategy::Forex => {
                let diff = e.abs_diff(a);
                if diff <= tolerance {
                    (
                        true,
                        format!(
                            "Sessions validated within tolerance: expected {e}, got {a} \
                             (diff {diff} <= {tolerance})"
                        ),
                    )
                } else {
                    let sample: Vec<String> = report
                        .missing
                        .iter()
                        .take(MISSING_SAMPLE_LEN)
                        .map(|d| d.to_string())
                        .collect();
                    (
                        false,
                        format!(
                            "Session count mismatch: expected {e}, got {a} \
                             (diff {diff} > {tolerance}). Missing sample: [{}]",
                            sample.join(", ")
                        ),
                    )
                }
            }
            SessionStrategy::Crypto | SessionStrategy::Equity { .. } => {
                if e == a {
                    (true, format!("Sessions validated: exact match ({e} sessions)"))
                } else {
                    (
                        false,
                        format!(
                            "Session count mismatch: expected {e}, got {a}. {} requires exact sessions",
                            self.calendar_id()
                        ),
                    )
                }
            }
        };

        ValidationOutcome {
            passed,
            message,
            report: Some(report),
        }
    }
}
