//! Layered configuration loading with figment.
//!
//! Sources, from lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. Values passed to [`ConfigLoader::merge`]
//! 3. Profile-specific file (`hearth.{profile}.toml`)
//! 4. Main file (`hearth.toml`, falling back to `config.toml`)
//! 5. Environment variables (`HEARTH_*`)
//!
//! Nested keys are separated by `__` in variable names:
//!
//! - `HEARTH_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `HEARTH_PLUGINS__INIT_TIMEOUT_MS=3000` → `plugins.init_timeout_ms = 3000`
//!
//! The `toml-config` (default) and `yaml-config` features control which
//! file formats are searched. With both enabled, both are loaded.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::HearthConfig;

const ENV_PREFIX: &str = "HEARTH_";
const PROFILE_VAR: &str = "HEARTH_PROFILE";
const APP_DIR: &str = "hearth";

#[cfg(feature = "toml-config")]
const TOML_NAMES: &[&str] = &["hearth.toml", "config.toml"];
#[cfg(feature = "yaml-config")]
const YAML_NAMES: &[&str] = &["hearth.yaml", "hearth.yml", "config.yaml", "config.yml"];

/// Deployment profile selecting `hearth.{profile}.*` overlay files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Parses a profile name; `dev`/`prod` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `HEARTH_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder assembling a [`HearthConfig`] from files, environment and code.
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .profile("production")
///     .file("/etc/hearth/hearth.toml")
///     .load()?;
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader using `HEARTH_PROFILE` and environment overrides.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to search for configuration files.
    ///
    /// Without any search path, the current directory and the user
    /// configuration directory (`~/.config/hearth` on Linux) are searched.
    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Layers `config` over the built-in defaults.
    ///
    /// Files and environment variables still take precedence.
    pub fn merge(mut self, config: HearthConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Merges all sources and extracts the configuration.
    pub fn load(self) -> ConfigResult<HearthConfig> {
        let profile = self.profile.clone();
        let config: HearthConfig = self.figment()?.extract().map_err(Box::new)?;

        debug!(
            profile = %profile,
            level = %config.logging.level,
            categories = ?config.plugins.categories,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Builds the merged figment without extracting it.
    pub fn figment(mut self) -> ConfigResult<Figment> {
        let overrides = std::mem::take(&mut self.overrides);
        let mut figment = Figment::from(Serialized::defaults(HearthConfig::default())).merge(overrides);

        figment = match &self.config_file {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading configuration file");
                merge_file(figment, path)?
            }
            Some(path) => return Err(ConfigError::FileNotFound(path.clone())),
            None => self.search_files(figment),
        };

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment overrides");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment)
    }

    fn effective_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(APP_DIR));
        }
        paths
    }

    fn search_files(&self, mut figment: Figment) -> Figment {
        #[allow(unused_mut)]
        let mut found = false;
        #[allow(unused_variables)]
        let paths = self.effective_search_paths();

        #[cfg(feature = "toml-config")]
        {
            let (merged, hit) = self.merge_first(figment, &paths, TOML_NAMES, |fig, path| {
                fig.merge(Toml::file(path))
            });
            figment = merged;
            found |= hit;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (merged, hit) = self.merge_first(figment, &paths, YAML_NAMES, |fig, path| {
                fig.merge(Yaml::file(path))
            });
            figment = merged;
            found |= hit;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }

    /// Merges the first base file found, preceded by its profile overlay.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn merge_first<F>(
        &self,
        mut figment: Figment,
        paths: &[PathBuf],
        names: &[&str],
        merge: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for dir in paths {
            for name in names {
                let Some((stem, ext)) = name.rsplit_once('.') else {
                    continue;
                };

                let overlay = dir.join(format!("{stem}.{}.{ext}", self.profile));
                if overlay.exists() {
                    debug!(path = %overlay.display(), "Loading profile configuration");
                    figment = merge(figment, &overlay);
                }

                let base = dir.join(name);
                if base.exists() {
                    info!(path = %base.display(), "Loading configuration file");
                    return (merge(figment, &base), true);
                }
            }
        }
        (figment, false)
    }
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<HearthConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, with environment overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<HearthConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::config::schema::LogLevel;

    fn load_in(jail: &Jail, loader: ConfigLoader) -> Result<HearthConfig, figment::Error> {
        loader
            .search_path(jail.directory())
            .load()
            .map_err(|e| e.to_string().into())
    }

    #[test]
    fn test_defaults_without_sources() {
        Jail::expect_with(|jail| {
            let config = load_in(jail, ConfigLoader::new().without_env())?;
            assert_eq!(config, HearthConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }

    #[test]
    fn test_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("HEARTH_PROFILE", "production");
            assert_eq!(Profile::from_env(), Profile::Production);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "hearth.toml",
                r#"
                [logging]
                level = "warn"

                [plugins]
                dir = "units"
                categories = ["storage", "greeters"]
                "#,
            )?;
            jail.set_env("HEARTH_LOGGING__LEVEL", "debug");
            jail.set_env("HEARTH_PLUGINS__INIT_TIMEOUT_MS", "1500");

            let config = load_in(jail, ConfigLoader::new())?;
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.plugins.dir, PathBuf::from("units"));
            assert_eq!(config.plugins.categories, vec!["storage", "greeters"]);
            assert_eq!(config.plugins.init_timeout_ms, Some(1500));
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_overlay_is_overridden_by_base() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "hearth.production.toml",
                "[plugins]\nextension = \"unit\"\ncategories = [\"prod\"]\n",
            )?;
            jail.create_file("hearth.toml", "[plugins]\ncategories = [\"base\"]\n")?;

            let config = load_in(jail, ConfigLoader::new().without_env().profile("prod"))?;
            assert_eq!(config.plugins.extension, "unit");
            assert_eq!(config.plugins.categories, vec!["base"]);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_merge_sits_below_files() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[logging]\nlevel = \"error\"\n")?;

            let mut overrides = HearthConfig::default();
            overrides.logging.level = LogLevel::Trace;
            overrides.plugins.extension = "plug".into();

            let config = load_in(jail, ConfigLoader::new().without_env().merge(overrides))?;
            assert_eq!(config.logging.level, LogLevel::Error);
            assert_eq!(config.plugins.extension, "plug");
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .without_env()
            .file("/nonexistent/hearth.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("hearth.ini", "level = debug")?;
            let result = ConfigLoader::new().without_env().file("hearth.ini").load();
            assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"));
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_invalid_value_is_extract_error() {
        Jail::expect_with(|jail| {
            jail.create_file("hearth.toml", "[logging]\nlevel = \"loud\"\n")?;
            let result = ConfigLoader::new().without_env().search_path(jail.directory()).load();
            assert!(matches!(result, Err(ConfigError::Extract(_))));
            Ok(())
        });
    }
}
