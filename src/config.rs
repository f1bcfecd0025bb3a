use crate::constants::canonical_source_id;
use crate::error::{GridError, Result};
use crate::pipeline::processing::mapper::{FuelTags, LabelDictionary};
use crate::pipeline::schema::SourceProfile;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    /// Per-operator overrides keyed by operator id (`ERCOT`, `MISO`).
    pub sources: HashMap<String, SourceOverrides>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_name: String,
    /// Default `EnvFilter` level for this crate; `RUST_LOG` still wins.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "iso_scraper.log".to_string(),
            level: "info".to_string(),
        }
    }
}

/// Label and fuel-tag entries that replace an operator's built-ins field by field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceOverrides {
    pub labels: LabelDictionary,
    pub fuel_tags: FuelTags,
}

impl SourceOverrides {
    pub fn apply(&self, profile: &mut SourceProfile) {
        profile.labels.merge(self.labels.clone());
        profile.fuel_tags.merge(self.fuel_tags.clone());
    }
}

impl Config {
    /// Read `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let config_content = fs::read_to_string(path).map_err(|e| {
            GridError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if let Some(unknown) = config
            .sources
            .keys()
            .find(|id| canonical_source_id(id).is_none())
        {
            return Err(GridError::Config(format!(
                "[sources.{}] does not name a known source",
                unknown
            )));
        }
        Ok(config)
    }

    /// Overrides for `source_id`, matched case-insensitively.
    pub fn overrides_for(&self, source_id: &str) -> Option<&SourceOverrides> {
        self.sources
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(source_id))
            .map(|(_, o)| o)
    }
}
