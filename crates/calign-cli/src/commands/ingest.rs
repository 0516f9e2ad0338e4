//! `calign ingest`: CSV -> filter pipeline -> bundle -> validation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use calign_calendar::CalendarRegistry;
use calign_sessions::flatfile::read_bars_csv;
use calign_sessions::{ingest, AssetClass, BundleIndex, IngestParams};

use super::{build_manager, effective_strictness, load_alignment, parse_date};

pub const INDEX_FILE: &str = "index.json";

pub struct IngestArgs {
    pub asset_class: String,
    pub dataset: String,
    pub symbol: String,
    pub bars: PathBuf,
    pub out: PathBuf,
    pub start: String,
    pub end: String,
    pub config_paths: Vec<String>,
    pub strict: bool,
}

pub fn run(args: IngestArgs) -> Result<()> {
    let cfg = load_alignment(&args.config_paths)?;
    let calendars = CalendarRegistry::builtin();
    let manager = build_manager(&args.asset_class, &cfg, &calendars)?;

    let params = IngestParams {
        dataset: args.dataset.clone(),
        asset_class: AssetClass::parse(&args.asset_class)?,
        start: parse_date(&args.start)?,
        end: parse_date(&args.end)?,
        frequency: cfg.frequency,
        strictness: effective_strictness(args.strict, &cfg),
    };

    let series = read_bars_csv(&args.bars)?;
    let mut data = BTreeMap::new();
    data.insert(args.symbol.clone(), series);

    let index_path = args.out.join(INDEX_FILE);
    let index = BundleIndex::load(&index_path)?.with_data_dir(&args.out);

    // Whatever was written is recorded, even when validation then fails.
    let result = ingest(&manager, &params, &data, &index, &index);
    index
        .save(&index_path)
        .with_context(|| format!("save index failed: {}", index_path.display()))?;
    let summary = result.with_context(|| format!("ingest failed for dataset '{}'", args.dataset))?;

    println!(
        "ingest_ok=true dataset={} calendar_id={} passed={}",
        summary.dataset, summary.calendar_id, summary.outcome.passed
    );
    for s in &summary.symbols {
        println!(
            "symbol={} rows_in={} rows_out={}",
            s.symbol, s.rows_in, s.rows_out
        );
    }
    println!("validation={}", summary.outcome.message);
    println!("index_path={}", index_path.display());
    Ok(())
}
