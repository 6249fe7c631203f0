//! Application configuration, loaded from a TOML file under the user
//! config directory.
//!
//! Follows a fail-safe approach: a missing config file degrades to
//! defaults instead of preventing startup, and a missing catalog file is
//! replaced by the built-in starter catalog on first run.

use crate::catalog::DEFAULT_CATALOG_TOML;
use crate::resolver::engine::EngineSettings;
use crate::resolver::knob::ResolverSettings;
use crate::sampler::sampler_handle::SamplerSettings;
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_DIR: &str = "knobdeck";
pub const CONFIG_FILE: &str = "config.toml";
pub const CATALOG_FILE: &str = "catalog.toml";

/// Top-level configuration file schema
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct KnobdeckConfig {
    #[serde(default)]
    pub sampler: SamplerSection,

    #[serde(default)]
    pub resolver: ResolverSection,

    #[serde(default)]
    pub engine: EngineSection,

    /// Explicit catalog file location; defaults next to the config file
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SamplerSection {
    pub processing_interval_ms: u64,
    pub expected_knobs: usize,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            processing_interval_ms: 130,
            expected_knobs: 12,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ResolverSection {
    pub hysteresis_margin: u16,
    pub deadband: u16,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            hysteresis_margin: 20,
            deadband: 5,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct EngineSection {
    pub slots: usize,
    pub pagination_interval_ms: Option<u64>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            slots: 3,
            pagination_interval_ms: Some(100),
        }
    }
}

impl KnobdeckConfig {
    pub fn sampler_settings(&self) -> SamplerSettings {
        SamplerSettings {
            processing_interval_ms: self.sampler.processing_interval_ms,
            expected_knobs: self.sampler.expected_knobs,
        }
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            hysteresis_margin: self.resolver.hysteresis_margin,
            deadband: self.resolver.deadband,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            slots: self.engine.slots,
            pagination_interval_ms: self.engine.pagination_interval_ms,
        }
    }

    /// Cross-section consistency checks that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let needed = self.engine.slots * crate::resolver::chain::KNOBS_PER_SLOT;
        if self.sampler.expected_knobs < needed {
            return Err(eyre!(
                "{} slots need {} knob values per line, sampler delivers {}",
                self.engine.slots,
                needed,
                self.sampler.expected_knobs
            ));
        }
        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        let mut base = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        base.push(CONFIG_DIR);
        base
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join(CATALOG_FILE))
    }

    /// Loads the config file, falling back to defaults when it is missing
    pub async fn load_or_default() -> Result<Self> {
        let path = Self::config_path();

        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| eyre!("Failed to check config file {}: {}", path.display(), e))?
        {
            warn!(
                "Config file {} does not exist, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Writes the built-in starter catalog when no catalog file exists yet
pub async fn ensure_default_catalog(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path)
        .await
        .map_err(|e| eyre!("Failed to check catalog file {}: {}", path.display(), e))?
    {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| eyre!("Failed to create {}: {}", parent.display(), e))?;
    }

    tokio::fs::write(path, DEFAULT_CATALOG_TOML)
        .await
        .map_err(|e| eyre!("Failed to write starter catalog {}: {}", path.display(), e))?;

    info!("Wrote starter catalog to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: KnobdeckConfig = toml::from_str("").unwrap();
        assert_eq!(config.sampler.expected_knobs, 12);
        assert_eq!(config.resolver.hysteresis_margin, 20);
        assert_eq!(config.engine.slots, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: KnobdeckConfig = toml::from_str(
            r#"
[resolver]
hysteresis_margin = 35
deadband = 8
"#,
        )
        .unwrap();
        assert_eq!(config.resolver.hysteresis_margin, 35);
        assert_eq!(config.resolver.deadband, 8);
        assert_eq!(config.sampler.processing_interval_ms, 130);
    }

    #[test]
    fn too_few_knobs_for_slots_is_invalid() {
        let config: KnobdeckConfig = toml::from_str(
            r#"
[sampler]
processing_interval_ms = 130
expected_knobs = 8

[engine]
slots = 3
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
