//! Prefix validator backed by a regular expression.
//!
//! Settings (namespace `pattern`): `enabled` and optional `regex`. Without a
//! regex, prefixes must look like issue keys (`PROJ-123`).

use regex::Regex;
use thiserror::Error;
use wt_core::{Ledger, LedgerError, NamespacedSettings, Tracker, TrackerError, Validation};

pub const NAME: &str = "pattern";

/// Issue-key shape: uppercase project key, dash, number.
pub const ISSUE_KEY_PATTERN: &str = r"^[A-Z][A-Z0-9]+-[0-9]+$";

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid prefix pattern: {0}")]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Rejects prefixes that do not match a pattern.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    pattern: Regex,
}

impl PatternValidator {
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Builds the validator from `pattern.*` settings; `None` when disabled.
    pub fn from_settings<L: Ledger>(
        settings: &NamespacedSettings<'_, L>,
    ) -> Result<Option<Self>, PatternError> {
        if !settings.enabled()? {
            return Ok(None);
        }
        let pattern = settings
            .get_opt("regex")?
            .unwrap_or_else(|| ISSUE_KEY_PATTERN.to_string());
        Self::new(&pattern).map(Some)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Tracker for PatternValidator {
    fn name(&self) -> &str {
        NAME
    }

    fn validate(&mut self, prefix: &str) -> Result<Validation, TrackerError> {
        if self.pattern.is_match(prefix) {
            Ok(Validation::accept())
        } else {
            Ok(Validation::reject(format!(
                "'{prefix}' does not match {}",
                self.pattern.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wt_db::Database;

    #[test]
    fn issue_keys_accept_and_reject() {
        let mut validator = PatternValidator::new(ISSUE_KEY_PATTERN).unwrap();
        for prefix in ["PROJ-12", "AB2-7"] {
            assert!(validator.validate(prefix).unwrap().accepted, "{prefix}");
        }
        for prefix in ["proj-12", "PROJ", "P-1", "PROJ-12 fix"] {
            assert!(!validator.validate(prefix).unwrap().accepted, "{prefix}");
        }
    }

    #[test]
    fn rejection_names_the_pattern() {
        let mut validator = PatternValidator::new("^ops/").unwrap();
        let verdict = validator.validate("meeting").unwrap();
        assert_eq!(verdict.note.as_deref(), Some("'meeting' does not match ^ops/"));
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let err = PatternValidator::new("([").unwrap_err();
        assert!(err.to_string().starts_with("invalid prefix pattern"));
    }

    #[test]
    fn from_settings_defaults_to_issue_keys() {
        let mut db = Database::open_in_memory().unwrap();
        db.set_setting("pattern.enabled", "yes").unwrap();
        let settings = NamespacedSettings::new(&mut db, NAME);
        let validator = PatternValidator::from_settings(&settings).unwrap().unwrap();
        assert_eq!(validator.as_str(), ISSUE_KEY_PATTERN);
    }

    #[test]
    fn from_settings_uses_configured_regex() {
        let mut db = Database::open_in_memory().unwrap();
        db.set_setting("pattern.enabled", "true").unwrap();
        db.set_setting("pattern.regex", "^[a-z]+$").unwrap();
        let settings = NamespacedSettings::new(&mut db, NAME);
        let mut validator = PatternValidator::from_settings(&settings).unwrap().unwrap();
        assert!(validator.validate("review").unwrap().accepted);
    }

    #[test]
    fn from_settings_is_none_when_disabled() {
        let mut db = Database::open_in_memory().unwrap();
        let settings = NamespacedSettings::new(&mut db, NAME);
        assert!(PatternValidator::from_settings(&settings).unwrap().is_none());
    }
}
