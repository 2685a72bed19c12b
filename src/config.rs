//! Loader configuration
//!
//! Settings come from a TOML file (by default `$HOME/.asnhistory/asnhistory.toml`,
//! created with a commented template on first run) overlaid with
//! `ASNHISTORY_`-prefixed environment variables.

use anyhow::Result;
use config::Config;
use std::collections::HashMap;
use std::path::Path;

use crate::error::LoaderError;

pub struct LoaderConfig {
    /// Directory holding the loader's own state (the SQLite store)
    pub data_dir: String,

    /// Root directory under which collector dump trees live
    /// (`<dump_dir>/ripe/<collector>/**/bview.*.gz`)
    pub dump_dir: String,

    /// Seconds to sleep between orchestrator passes (default: 30)
    pub sleep_secs: u64,
}

const EMPTY_CONFIG: &str = r#"### asnhistory configuration file

### directory for the loader's state database
# data_dir = "~/.asnhistory"

### root directory of the collector dump trees
### (expects <dump_dir>/ripe/<collector>/**/bview.<YYYYMMDD>.<HHMM>.gz)
# dump_dir = "~/.asnhistory/dumps"

### seconds between load passes
# sleep_secs = 30
"#;

impl Default for LoaderConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{home_dir}/.asnhistory"),
            dump_dir: format!("{home_dir}/.asnhistory/dumps"),
            sleep_secs: 30,
        }
    }
}

impl LoaderConfig {
    /// Create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<LoaderConfig> {
        let mut builder = Config::builder();

        let home_dir = dirs::home_dir()
            .ok_or_else(|| LoaderError::config("could not find home directory"))?
            .to_str()
            .ok_or_else(|| LoaderError::config("could not convert home directory path to string"))?
            .to_owned();

        let config_dir = format!("{home_dir}/.asnhistory");

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path.to_str().ok_or_else(|| {
                        LoaderError::config("could not convert config path to string")
                    })?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        LoaderError::config(format!("unable to create config file: {e}"))
                    })?;
                }
            }
            None => {
                std::fs::create_dir_all(config_dir.as_str()).map_err(|e| {
                    LoaderError::config(format!("unable to create config directory: {e}"))
                })?;
                let p = format!("{config_dir}/asnhistory.toml");
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        LoaderError::config(format!("unable to create config file {p}: {e}"))
                    })?;
                }
            }
        }

        // Environment overlay, e.g. ASNHISTORY_DUMP_DIR=/srv/dumps
        builder = builder.add_source(config::Environment::with_prefix("ASNHISTORY"));

        let settings = builder
            .build()
            .map_err(|e| LoaderError::config(format!("failed to build configuration: {e}")))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| LoaderError::config(format!("failed to deserialize configuration: {e}")))?;

        let data_dir = match config.get("data_dir") {
            Some(p) => p.trim_end_matches('/').to_string(),
            None => {
                let dir = format!("{home_dir}/.asnhistory");
                std::fs::create_dir_all(dir.as_str()).map_err(|e| {
                    LoaderError::config(format!("unable to create data directory: {e}"))
                })?;
                dir
            }
        };

        let dump_dir = config
            .get("dump_dir")
            .map(|p| p.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{data_dir}/dumps"));

        let sleep_secs = config
            .get("sleep_secs")
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(LoaderConfig {
            data_dir,
            dump_dir,
            sleep_secs,
        })
    }

    /// Path to the SQLite snapshot store
    pub fn sqlite_path(&self) -> String {
        format!("{}/asnhistory.sqlite3", self.data_dir.trim_end_matches('/'))
    }

    /// Dump tree for one collector
    pub fn collector_dump_dir(&self, collector: &str) -> String {
        format!("{}/ripe/{collector}", self.dump_dir.trim_end_matches('/'))
    }

    /// Sleep between passes as a Duration
    pub fn sleep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sleep_secs)
    }

    /// Fail startup when the collector's dump tree is absent. The dump tree
    /// is maintained by an external fetcher; running without it would make
    /// every pass a silent no-op.
    pub fn validate_collector_dir(&self, collector: &str) -> Result<String> {
        let dir = self.collector_dump_dir(collector);
        if !Path::new(&dir).exists() {
            return Err(LoaderError::config(format!("dump directory does not exist: {dir}")).into());
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.sleep_secs, 30);
        assert!(config.data_dir.ends_with(".asnhistory"));
    }

    #[test]
    fn test_paths() {
        let config = LoaderConfig {
            data_dir: "/test/dir".to_string(),
            dump_dir: "/srv/dumps".to_string(),
            sleep_secs: 30,
        };

        assert_eq!(config.sqlite_path(), "/test/dir/asnhistory.sqlite3");
        assert_eq!(config.collector_dump_dir("rrc00"), "/srv/dumps/ripe/rrc00");
    }

    #[test]
    fn test_missing_dump_dir_is_config_error() {
        let config = LoaderConfig {
            data_dir: "/test/dir".to_string(),
            dump_dir: "/nonexistent".to_string(),
            sleep_secs: 30,
        };
        let err = config.validate_collector_dir("rrc00").err().unwrap();
        assert!(err.to_string().starts_with("config:"));
    }

    #[test]
    fn test_sleep_interval() {
        let config = LoaderConfig {
            data_dir: "/test".to_string(),
            dump_dir: "/test/dumps".to_string(),
            sleep_secs: 15,
        };
        assert_eq!(config.sleep_interval(), std::time::Duration::from_secs(15));
    }
}
