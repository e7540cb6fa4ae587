use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{
    DEFAULT_MAP_CENTER, DEFAULT_MAP_ZOOM, DEFAULT_SEARCH_DEBOUNCE_MS, FOCUS_ZOOM,
};
use crate::error::{Result, RosterError};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const ENV_API_BASE_URL: &str = "ROSTER_API_BASE_URL";
pub const ENV_GAZETTEER_PATH: &str = "ROSTER_GAZETTEER_PATH";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub map: MapConfig,
    pub roster: RosterConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub places_path: String,
    pub roster_path: String,
    pub zones_path: String,
    pub users_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api_votantes".to_string(),
            places_path: "/mncpio_list.php".to_string(),
            roster_path: "/votantes_list.php".to_string(),
            zones_path: "/zonas_list.php".to_string(),
            users_path: "/usuarios_list.php".to_string(),
        }
    }
}

impl BackendConfig {
    /// Joins `base_url` and an endpoint path without doubling or dropping the slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub focus_zoom: u8,
    pub initial_center: [f64; 2],
    pub initial_zoom: u8,
    /// Alternative gazetteer file; the built-in table is used when unset
    pub gazetteer_path: Option<PathBuf>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            focus_zoom: FOCUS_ZOOM,
            initial_center: [DEFAULT_MAP_CENTER.0, DEFAULT_MAP_CENTER.1],
            initial_zoom: DEFAULT_MAP_ZOOM,
            gazetteer_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosterConfig {
    pub search_debounce_ms: u64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
        }
    }
}

impl Config {
    /// Loads `config.toml` from the working directory.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads a config file, falling back to defaults when it does not exist, then applies
    /// environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                RosterError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            let config = Self::from_toml_str(&content)?;
            info!("Loaded configuration from {}", path.display());
            config
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Config::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            env::var(ENV_API_BASE_URL).ok(),
            env::var(ENV_GAZETTEER_PATH).ok(),
        );
    }

    fn apply_overrides(&mut self, base_url: Option<String>, gazetteer_path: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.backend.base_url = url;
        }
        if let Some(path) = gazetteer_path.filter(|p| !p.trim().is_empty()) {
            self.map.gazetteer_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(RosterError::Config("backend.base_url must not be empty".to_string()));
        }
        if self.map.focus_zoom == 0 {
            return Err(RosterError::Config("map.focus_zoom must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.map.focus_zoom, 9);
        assert_eq!(config.roster.search_debounce_ms, DEFAULT_SEARCH_DEBOUNCE_MS);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[backend]\nbase_url = \"https://example.test/api/\"\n\n[roster]\nsearch_debounce_ms = 150"
        )
        .unwrap();
        let config = Config::from_toml_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(config.backend.base_url, "https://example.test/api/");
        assert_eq!(config.backend.roster_path, "/votantes_list.php");
        assert_eq!(config.roster.search_debounce_ms, 150);
        assert_eq!(config.map, MapConfig::default());
        assert_eq!(
            config.backend.endpoint(&config.backend.places_path),
            "https://example.test/api/mncpio_list.php"
        );
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = Config::default();
        config.apply_overrides(
            Some("http://override/api".to_string()),
            Some("/tmp/places.toml".to_string()),
        );
        assert_eq!(config.backend.base_url, "http://override/api");
        assert_eq!(config.map.gazetteer_path, Some(PathBuf::from("/tmp/places.toml")));

        config.apply_overrides(Some("  ".to_string()), None);
        assert_eq!(config.backend.base_url, "http://override/api");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_toml_str("[map]\nfocus_zoom = \"close\"").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_zoom() {
        let mut config = Config::default();
        config.map.focus_zoom = 0;
        assert!(config.validate().is_err());
    }
}
