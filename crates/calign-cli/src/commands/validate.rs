//! `calign validate`: backtest pre-flight against a bundle index.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use calign_calendar::CalendarRegistry;
use calign_sessions::{preflight, BundleIndex, SessionManager, Strictness};

use super::{effective_strictness, load_alignment, parse_date};

pub struct ValidateArgs {
    pub dataset: String,
    pub index: PathBuf,
    pub start: String,
    pub end: String,
    pub config_paths: Vec<String>,
    pub strict: bool,
    pub report: Option<PathBuf>,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let cfg = load_alignment(&args.config_paths)?;
    let calendars = CalendarRegistry::builtin();
    let index = BundleIndex::load(&args.index)?;
    let manager = SessionManager::for_named_dataset(&args.dataset, &index, &calendars)?
        .with_frequency(cfg.frequency);

    let (start, end) = (parse_date(&args.start)?, parse_date(&args.end)?);
    // Outcome first so the report is written even when strictness then fails.
    let outcome = preflight(&manager, &index, &args.dataset, start, end, Strictness::Warn)?;

    println!(
        "passed={} dataset={} calendar_id={}",
        outcome.passed,
        args.dataset,
        manager.calendar_id()
    );
    println!("message={}", outcome.message);

    if let Some(path) = &args.report {
        let doc = match &outcome.report {
            Some(report) => report.to_document_capped(cfg.report.max_listed),
            None => format!(
                "# Session Validation Report\n\n**Status:** FAIL\n\n{}\n",
                outcome.message
            ),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir failed: {}", parent.display()))?;
        }
        fs::write(path, doc).with_context(|| format!("write report failed: {}", path.display()))?;
        println!("report_path={}", path.display());
    }

    if !outcome.passed && effective_strictness(args.strict, &cfg) == Strictness::Fail {
        anyhow::bail!(
            "SESSION_MISMATCH dataset={}: {}",
            args.dataset,
            outcome.message
        );
    }
    Ok(())
}
