//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Weekly limit used when the ledger has no `weekly_limit_hours` setting.
pub const DEFAULT_WEEKLY_LIMIT_HOURS: f64 = 40.0;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Fallback weekly limit in hours.
    pub default_weekly_limit_hours: f64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("default_weekly_limit_hours", &self.default_weekly_limit_hours)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("wt.db"),
            default_weekly_limit_hours: DEFAULT_WEEKLY_LIMIT_HOURS,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WT_*)
        figment = figment.merge(Env::prefixed("WT_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for wt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wt"))
}

/// Returns the platform-specific data directory for wt.
///
/// On Linux: `~/.local/share/wt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("wt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_wt() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "wt");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("wt.db"));
        assert!((config.default_weekly_limit_hours - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("wt.toml");
        std::fs::write(
            &path,
            "database_path = \"/tmp/other.db\"\ndefault_weekly_limit_hours = 32.5\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
        assert!((config.default_weekly_limit_hours - 32.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_rejects_non_numeric_limit() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("wt.toml");
        std::fs::write(&path, "default_weekly_limit_hours = \"lots\"\n").unwrap();

        assert!(Config::load_from(Some(&path)).is_err());
    }
}
