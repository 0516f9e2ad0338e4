//! `calign sessions`: print the canonical session set for an asset class.

use anyhow::{Context, Result};
use calign_calendar::CalendarRegistry;

use super::{build_manager, load_alignment, parse_date};

pub fn run(
    asset_class: &str,
    start: &str,
    end: &str,
    config_paths: &[String],
    json: bool,
) -> Result<()> {
    let cfg = load_alignment(config_paths)?;
    let calendars = CalendarRegistry::builtin();
    let manager = build_manager(asset_class, &cfg, &calendars)?;

    let sessions = manager.sessions(parse_date(start)?, parse_date(end)?)?;

    if json {
        let out = serde_json::to_string(&sessions).context("serialize sessions failed")?;
        println!("{out}");
        return Ok(());
    }

    println!(
        "calendar_id={} sessions={}",
        manager.calendar_id(),
        sessions.len()
    );
    if let (Some(first), Some(last)) = (sessions.first(), sessions.last()) {
        println!("first={first} last={last}");
    }
    Ok(())
}
