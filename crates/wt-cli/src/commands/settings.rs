//! Config command: read and write ledger settings.

use std::io::Write;

use anyhow::{Result, bail};
use wt_core::{Ledger, WEEKLY_LIMIT_KEY};
use wt_db::Database;

pub fn get<W: Write, L: Ledger>(
    writer: &mut W,
    ledger: &L,
    key: &str,
    default: &str,
) -> Result<()> {
    let value = ledger.setting(key, default)?;
    writeln!(writer, "{value}")?;
    Ok(())
}

/// Stores `key = value`. The weekly limit must be a non-negative number of hours.
pub fn set<W: Write, L: Ledger>(
    writer: &mut W,
    ledger: &mut L,
    key: &str,
    value: &str,
) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        bail!("setting key cannot be empty");
    }
    if key == WEEKLY_LIMIT_KEY {
        match value.trim().parse::<f64>() {
            Ok(hours) if hours.is_finite() && hours >= 0.0 => {}
            _ => bail!(
                "{WEEKLY_LIMIT_KEY} must be a non-negative number of hours, got '{value}'"
            ),
        }
    }
    ledger.set_setting(key, value)?;
    tracing::debug!(key, "setting stored");
    writeln!(writer, "{key} = {value}")?;
    Ok(())
}

pub fn list<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let settings = db.list_settings()?;
    if settings.is_empty() {
        writeln!(writer, "No settings stored.")?;
        return Ok(());
    }
    for (key, value) in settings {
        writeln!(writer, "{key} = {value}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn get_falls_back_to_default() {
        let db = Database::open_in_memory().unwrap();
        let mut buf = Vec::new();
        get(&mut buf, &db, "webhook.url", "unset").unwrap();
        assert_snapshot!(output(buf), @"unset");
    }

    #[test]
    fn set_then_get_and_list() {
        let mut db = Database::open_in_memory().unwrap();
        set(&mut Vec::new(), &mut db, "webhook.url", "https://hooks.example.com/wt").unwrap();
        set(&mut Vec::new(), &mut db, "webhook.enabled", "true").unwrap();
        set(&mut Vec::new(), &mut db, "webhook.enabled", "false").unwrap();

        let mut buf = Vec::new();
        get(&mut buf, &db, "webhook.enabled", "").unwrap();
        assert_snapshot!(output(buf), @"false");

        let mut buf = Vec::new();
        list(&mut buf, &db).unwrap();
        assert_snapshot!(output(buf), @r"
        webhook.enabled = false
        webhook.url = https://hooks.example.com/wt
        ");
    }

    #[test]
    fn set_validates_weekly_limit() {
        let mut db = Database::open_in_memory().unwrap();
        let err = set(&mut Vec::new(), &mut db, WEEKLY_LIMIT_KEY, "forty").unwrap_err();
        assert_eq!(
            err.to_string(),
            "weekly_limit_hours must be a non-negative number of hours, got 'forty'"
        );
        assert!(set(&mut Vec::new(), &mut db, WEEKLY_LIMIT_KEY, "-1").is_err());

        let mut buf = Vec::new();
        set(&mut buf, &mut db, WEEKLY_LIMIT_KEY, "37.5").unwrap();
        assert_snapshot!(output(buf), @"weekly_limit_hours = 37.5");
    }

    #[test]
    fn list_empty() {
        let db = Database::open_in_memory().unwrap();
        let mut buf = Vec::new();
        list(&mut buf, &db).unwrap();
        assert_snapshot!(output(buf), @"No settings stored.");
    }
}
