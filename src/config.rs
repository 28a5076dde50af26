/* src/config.rs */

use crate::error::{Result, ZoneError};
use fancy_log::{LogLevel, log};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_TEMPLATE: &str = r#"
# Seconds between health probes of the primary zone backend.
health_check_seconds = 30

# Primary zone file. Defaults to zones.toml next to this file.
# zones_path = "/var/lib/zone-tree/zones.toml"

# Used while the primary zone file is unavailable.
# fallback_zones_path = "/mnt/replica/zones.toml"

# Expand/collapse state and view preferences.
# preferences_path = "/var/lib/zone-tree/preferences.json"
"#;

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    zones_path: Option<PathBuf>,
    fallback_zones_path: Option<PathBuf>,
    preferences_path: Option<PathBuf>,
    health_check_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub zones_path: PathBuf,
    pub fallback_zones_path: Option<PathBuf>,
    pub preferences_path: PathBuf,
    pub health_check_interval: Duration,
}

impl AppConfig {
    /// Loads config from `CONFIG_PATH` or `~/zone-tree/config.toml`, creating
    /// the latter from a template when missing. Env vars override file values.
    pub fn load_or_create_default() -> Result<Self> {
        let config_path = match env::var("CONFIG_PATH").ok().filter(|s| !s.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => dirs::home_dir()
                .ok_or_else(|| ZoneError::validation("could not find home directory"))?
                .join("zone-tree")
                .join("config.toml"),
        };

        if !config_path.exists() {
            log(
                LogLevel::Warn,
                &format!(
                    "Config file not found. Creating default at {:?}",
                    config_path
                ),
            );
            if let Some(parent_dir) = config_path.parent() {
                fs::create_dir_all(parent_dir)?;
            }
            fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;
        }

        log(
            LogLevel::Info,
            &format!("Loading config from {:?}", config_path),
        );
        let config_str = fs::read_to_string(&config_path)?;
        let file: ConfigFile = toml::from_str(&config_str)?;

        Self::resolve(file, &config_path, |key| env::var(key).ok())
    }

    fn resolve(
        file: ConfigFile,
        config_path: &Path,
        env_var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let from_env = |key: &str| env_var(key).filter(|s| !s.is_empty()).map(PathBuf::from);

        let health_check_seconds = match env_var("HEALTH_CHECK_SECONDS").filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ZoneError::validation(format!("HEALTH_CHECK_SECONDS {raw:?} is not a number"))
            })?,
            None => file.health_check_seconds.unwrap_or(30),
        };
        if health_check_seconds == 0 {
            return Err(ZoneError::validation(
                "health_check_seconds must be greater than zero",
            ));
        }

        Ok(AppConfig {
            zones_path: from_env("ZONES_PATH")
                .or(file.zones_path)
                .unwrap_or_else(|| base_dir.join("zones.toml")),
            fallback_zones_path: from_env("FALLBACK_ZONES_PATH").or(file.fallback_zones_path),
            preferences_path: from_env("PREFERENCES_PATH")
                .or(file.preferences_path)
                .unwrap_or_else(|| base_dir.join("preferences.json")),
            health_check_interval: Duration::from_secs(health_check_seconds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn template_parses_with_defaults() {
        let file: ConfigFile = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        let cfg = AppConfig::resolve(file, Path::new("/etc/zone-tree/config.toml"), |_| None)
            .unwrap();
        assert_eq!(cfg.zones_path, PathBuf::from("/etc/zone-tree/zones.toml"));
        assert_eq!(
            cfg.preferences_path,
            PathBuf::from("/etc/zone-tree/preferences.json")
        );
        assert_eq!(cfg.fallback_zones_path, None);
        assert_eq!(cfg.health_check_interval, Duration::from_secs(30));
    }

    #[test]
    fn env_overrides_file() {
        let file = ConfigFile {
            zones_path: Some("/a/zones.toml".into()),
            health_check_seconds: Some(5),
            ..Default::default()
        };
        let vars: HashMap<&str, &str> = [
            ("ZONES_PATH", "/b/zones.toml"),
            ("FALLBACK_ZONES_PATH", "/c/zones.toml"),
            ("HEALTH_CHECK_SECONDS", "60"),
        ]
        .into_iter()
        .collect();
        let cfg = AppConfig::resolve(file, Path::new("/etc/zone-tree/config.toml"), |k| {
            vars.get(k).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(cfg.zones_path, PathBuf::from("/b/zones.toml"));
        assert_eq!(cfg.fallback_zones_path, Some(PathBuf::from("/c/zones.toml")));
        assert_eq!(cfg.health_check_interval, Duration::from_secs(60));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let file = ConfigFile {
            health_check_seconds: Some(0),
            ..Default::default()
        };
        assert!(AppConfig::resolve(file, Path::new("config.toml"), |_| None).is_err());
    }

    #[test]
    fn empty_interval_variable_is_ignored() {
        let vars = HashMap::from([("HEALTH_CHECK_SECONDS", "")]);
        let lookup = |key: &str| vars.get(key).map(|v| v.to_string());

        let file = ConfigFile {
            health_check_seconds: Some(12),
            ..Default::default()
        };
        let config = AppConfig::resolve(file, Path::new("config.toml"), lookup).unwrap();
        assert_eq!(config.health_check_interval, Duration::from_secs(12));

        let config =
            AppConfig::resolve(ConfigFile::default(), Path::new("config.toml"), lookup).unwrap();
        assert_eq!(config.health_check_interval, Duration::from_secs(30));
    }
}
