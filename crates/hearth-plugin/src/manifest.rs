//! Plugin unit manifests.
//!
//! A plugin unit is a TOML file in a category directory:
//!
//! ```toml
//! initializer = "greeter"   # name registered in the catalog
//! enabled = true            # optional, defaults to true
//!
//! [config]                  # optional, handed to the plugin
//! greeting = "hi"
//! ```

use std::io;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Toml};
use serde::Deserialize;
use thiserror::Error;

/// Errors reading a plugin manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid manifest '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },
}

/// Parsed contents of one plugin unit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PluginManifest {
    /// Catalog name of the initializer to run.  Units without one are skipped.
    #[serde(default)]
    pub initializer: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Plugin-specific settings, exposed through
    /// [`PluginContext::get_config`](crate::PluginContext::get_config).
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl PluginManifest {
    /// Parses manifest text.
    pub fn parse(content: &str) -> Result<Self, figment::Error> {
        Figment::from(Toml::string(content)).extract()
    }

    /// Reads and parses the manifest at `path`.
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }
}
