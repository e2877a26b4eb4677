//! Engine limits and bootstrap topology, read from TOML.
//!
//! ```toml
//! max_depth = 256
//! diagnostic_capacity = 128
//!
//! [relations]          # child -> parents
//! mail = ["main_menu"]
//!
//! [reverse_relations]  # parent -> children
//! main_menu = ["tasks"]
//!
//! [[badges]]
//! key = "main_menu"
//! kind = "count"
//! groups = ["hud"]
//! ```

use crate::{node::BadgeKind, BadgeError};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

pub const DEFAULT_MAX_DEPTH: usize = 256;
pub const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Deepest ancestor a single refresh may reach.
    pub max_depth: usize,
    /// Number of recent diagnostics retained by the graph.
    pub diagnostic_capacity: usize,
    /// child -> parents
    pub relations: BTreeMap<String, Vec<String>>,
    /// parent -> children
    pub reverse_relations: BTreeMap<String, Vec<String>>,
    /// Static badges registered when the graph is built.
    pub badges: Vec<BadgeConfig>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            diagnostic_capacity: DEFAULT_DIAGNOSTIC_CAPACITY,
            relations: BTreeMap::new(),
            reverse_relations: BTreeMap::new(),
            badges: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeConfig {
    pub key: String,
    #[serde(default)]
    pub kind: BadgeKind,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl GraphConfig {
    pub fn from_toml_str(content: &str) -> Result<GraphConfig, BadgeError> {
        let config: GraphConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<GraphConfig, BadgeError> {
        tracing::debug!("Reading graph config from {:?}", path.as_ref());
        GraphConfig::from_toml_str(&read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> Result<String, BadgeError> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), BadgeError> {
        if self.max_depth == 0 {
            return Err(BadgeError::Config(
                "max_depth must allow at least one level of propagation".to_string(),
            ));
        }
        if let Some(badge) = self.badges.iter().find(|badge| badge.key.is_empty()) {
            return Err(BadgeError::Config(format!(
                "badge keys must not be empty (groups: {:?})",
                badge.groups
            )));
        }
        Ok(())
    }
}

/// Source of a [`GraphConfig`] owned by the host.
pub trait GraphConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<GraphConfig, BadgeError>;
    fn set_config(&self, config: &GraphConfig) -> Result<(), BadgeError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<GraphConfig, BadgeError> {
        if !self.path.exists() {
            tracing::debug!(
                "Config file {:?} not found, using the default graph config.",
                &self.path
            );
            return Ok(GraphConfig::default());
        }
        GraphConfig::load(&self.path)
    }

    fn set_config(&self, config: &GraphConfig) -> Result<(), BadgeError> {
        tracing::debug!("Writing graph config to: {:?}", &self.path);
        config.validate()?;
        write(&self.path, config.to_toml_string()?)?;
        Ok(())
    }
}
