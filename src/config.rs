use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::audio::analysis::AnalysisConfig;
use crate::channels::visibility::ChannelFlags;
use crate::export::payload::GENERATOR_TAG;
use crate::refine::settings::RefinementSettings;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub export: ExportConfig,
    /// Per-channel overrides keyed by channel id.
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_generator")]
    pub generator: String,
    /// Script template rendered next to the JSON export.
    #[serde(default)]
    pub script: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelConfig {
    #[serde(flatten)]
    pub settings: RefinementSettings,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub mute: Option<bool>,
    #[serde(default)]
    pub solo: Option<bool>,
}

impl ChannelConfig {
    /// Overlay the configured toggles on `current`.
    pub fn flags(&self, current: ChannelFlags) -> ChannelFlags {
        ChannelFlags {
            visible: self.visible.unwrap_or(current.visible),
            mute: self.mute.unwrap_or(current.mute),
            solo: self.solo.unwrap_or(current.solo),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            generator: default_generator(),
            script: None,
        }
    }
}

fn default_generator() -> String { GENERATOR_TAG.into() }

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate().context("[analysis]")?;
        for (id, channel) in &self.channels {
            channel
                .settings
                .validate()
                .with_context(|| format!("[channels.{}]", id))?;
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Explicit path, else `./stemotion.toml`, else the per-user config file.
pub fn find_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    let local = PathBuf::from("stemotion.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("stemotion").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("stemotion").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::settings::Quantize;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.export.generator, GENERATOR_TAG);
        assert!(config.channels.is_empty());
    }

    #[test]
    fn parses_channel_overrides() {
        let config: Config = toml::from_str(
            r#"
            [analysis]
            fps = 24
            bpm = 174.0

            [channels.energy]
            gain = 2.5
            smooth = 0.3
            quantize = 8
            mute = true

            [channels.drums_transient]
            solo = true
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.analysis.fps, 24.0);
        assert_eq!(config.analysis.time_signature, 4);

        let energy = &config.channels["energy"];
        assert_eq!(energy.settings.gain, 2.5);
        assert_eq!(energy.settings.quantize, Quantize::Eighth);
        assert!(energy.settings.clip);
        let flags = energy.flags(ChannelFlags::default());
        assert!(flags.mute && flags.visible && !flags.solo);

        let drums = &config.channels["drums_transient"];
        assert_eq!(drums.settings, RefinementSettings::default());
        assert!(drums.flags(ChannelFlags::default()).solo);
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let config: Config = toml::from_str("[channels.low]\ngate = 3.0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("channels.low"));

        let config: Config = toml::from_str("[analysis]\nfps = 0").unwrap();
        assert!(config.validate().is_err());
    }
}
