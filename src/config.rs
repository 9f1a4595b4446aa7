use chrono::Duration;
use chrono_tz::Tz;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind, Result};

const CONFIG_PATH_ENV_VAR: &str = "DATEBOOK_CONFIG_FILE";

pub(crate) fn find_configfile_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();

    if let Ok(path) = env::var(CONFIG_PATH_ENV_VAR) {
        locations.push(PathBuf::from(path));
    }

    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("datebook").join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".datebook.toml"));
    }

    locations
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub events_file: Option<PathBuf>,
    pub timezone: Option<String>,
    pub notification_headsup_minutes: u32,
    pub notification_grace_minutes: u32,
    pub reload_interval_secs: u64,
    pub busy_symbol: char,
    pub today_symbol: char,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            events_file: None,
            timezone: None,
            notification_headsup_minutes: 15,
            notification_grace_minutes: 15,
            reload_interval_secs: 60,
            busy_symbol: '+',
            today_symbol: '*',
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        // catch unknown time zones at load time
        config.tz()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)?;
        let mut config = Config::from_toml_str(&content).map_err(|err| {
            let msg = format!(
                "{} (in '{}')",
                err.message.as_deref().unwrap_or_default(),
                path.display()
            );
            err.with_msg(&msg)
        })?;

        // relative events files are resolved against the config directory
        let resolved = match (&config.events_file, path.parent()) {
            (Some(events_file), Some(dir)) if events_file.is_relative() => {
                Some(dir.join(events_file))
            }
            _ => None,
        };
        if resolved.is_some() {
            config.events_file = resolved;
        }

        Ok(config)
    }

    pub fn tz(&self) -> Result<Tz> {
        match &self.timezone {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| Error::new(ErrorKind::TimezoneError, &e.to_string())),
            None => Ok(Tz::UTC),
        }
    }

    pub fn headsup(&self) -> Duration {
        Duration::minutes(self.notification_headsup_minutes.into())
    }

    pub fn grace(&self) -> Duration {
        Duration::minutes(self.notification_grace_minutes.into())
    }

    pub fn reload_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reload_interval_secs.max(1))
    }
}

/// Loads the config file given on the command line, or the first one found
/// in the default locations. Falls back to the default configuration.
pub fn load_suitable_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::load(path);
    }

    match find_configfile_locations().iter().find(|p| p.is_file()) {
        Some(path) => {
            log::info!("Using config file '{}'", path.display());
            Config::load(path)
        }
        None => {
            log::info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.notification_headsup_minutes, 15);
        assert_eq!(config.headsup(), Duration::minutes(15));
        assert_eq!(config.tz().unwrap(), Tz::UTC);
        assert_eq!(config.busy_symbol, '+');
        assert!(config.events_file.is_none());
    }

    #[test]
    fn parses_all_keys() {
        let config = Config::from_toml_str(
            r##"
            events_file = "/home/me/events.toml"
            timezone = "Europe/Berlin"
            notification_headsup_minutes = 5
            notification_grace_minutes = 30
            reload_interval_secs = 10
            busy_symbol = "#"
            today_symbol = "@"
            "##,
        )
        .unwrap();

        assert_eq!(
            config.events_file.as_deref(),
            Some(Path::new("/home/me/events.toml"))
        );
        assert_eq!(config.tz().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(config.headsup(), Duration::minutes(5));
        assert_eq!(config.grace(), Duration::minutes(30));
        assert_eq!(config.reload_interval(), std::time::Duration::from_secs(10));
        assert_eq!(config.busy_symbol, '#');
        assert_eq!(config.today_symbol, '@');
    }

    #[test]
    fn rejects_unknown_timezone() {
        let err = Config::from_toml_str("timezone = \"Mars/Olympus\"").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TimezoneError));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Config::from_toml_str("tick_rate = 5").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ConfigParse));
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = load_suitable_config(Some(Path::new("/nonexistent/datebook.toml"))).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::IOError(_)));
    }
}
