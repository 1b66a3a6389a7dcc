//! Build configuration, loadable from TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tb_core::errors::{ErrorInfo, TbError};

/// Options controlling [`Model::build`](crate::Model::build).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Use double precision even when no modifier asks for it.
    #[serde(default)]
    pub force_double: bool,
    /// Remove sites left dangling by site-state modifiers.
    #[serde(default = "ModelConfig::default_trim_dangling")]
    pub trim_dangling: bool,
    /// Overrides the lattice's minimum neighbour count when trimming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_neighbors: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            force_double: false,
            trim_dangling: Self::default_trim_dangling(),
            min_neighbors: None,
        }
    }
}

impl ModelConfig {
    const fn default_trim_dangling() -> bool {
        true
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, TbError> {
        toml::from_str(contents).map_err(|err| {
            TbError::Config(ErrorInfo::new("model.config-parse", err.to_string()))
        })
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self, TbError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            TbError::Config(
                ErrorInfo::new("model.config-read", format!("failed to read config: {err}"))
                    .with_context("path", path.display()),
            )
        })?;
        Self::from_toml_str(&contents).map_err(|err| err.with_context("path", path.display()))
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, TbError> {
        toml::to_string_pretty(self).map_err(|err| {
            TbError::Config(ErrorInfo::new("model.config-serialize", err.to_string()))
        })
    }
}
