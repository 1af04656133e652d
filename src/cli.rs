use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stemotion", about = "Turn a mix and its stems into frame-rate motion channels")]
pub struct Cli {
    /// Master mix (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Additional stem files, analyzed after the master in the given order
    #[arg(long = "stem")]
    pub stems: Vec<PathBuf>,

    /// Output JSON file
    #[arg(short, long, default_value = "motion.json")]
    pub output: PathBuf,

    /// Output frames per second
    #[arg(long, default_value_t = 30.0)]
    pub fps: f64,

    /// Tempo used for beat/bar phase and quantize
    #[arg(long, default_value_t = 120.0)]
    pub bpm: f64,

    /// Beats per bar
    #[arg(long, default_value_t = 4)]
    pub time_signature: u32,

    /// Config file (defaults to ./stemotion.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Channel edit, e.g. `energy.gain=2` or `drums_transient.solo=true`
    #[arg(long = "set", value_name = "ID.FIELD=VALUE")]
    pub edits: Vec<String>,

    /// Also render an animation script from this template
    #[arg(short, long)]
    pub script: Option<String>,

    /// Script output path (defaults to the JSON path with the template's extension)
    #[arg(long)]
    pub script_output: Option<PathBuf>,

    /// Template parameter override, e.g. `scale=50`
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// List available script templates and exit
    #[arg(long)]
    pub list_templates: bool,

    /// Print every channel with its display state after analysis
    #[arg(long)]
    pub list_channels: bool,
}

/// One `--set` argument.
#[derive(Debug, PartialEq)]
pub struct ChannelEdit {
    pub channel: String,
    pub field: String,
    pub value: String,
}

impl ChannelEdit {
    pub fn parse(arg: &str) -> Result<Self> {
        let (key, value) = arg
            .split_once('=')
            .with_context(|| format!("Expected ID.FIELD=VALUE, got '{}'", arg))?;
        let (channel, field) = key
            .rsplit_once('.')
            .with_context(|| format!("Expected ID.FIELD before '=', got '{}'", key))?;
        if channel.is_empty() || field.is_empty() {
            anyhow::bail!("Empty channel id or field in '{}'", arg);
        }
        Ok(Self {
            channel: channel.trim().to_string(),
            field: field.trim().to_string(),
            value: value.trim().to_string(),
        })
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.field.as_str(), "visible" | "mute" | "solo")
    }

    pub fn flag_value(&self) -> Result<bool> {
        match self.value.as_str() {
            "true" | "1" | "on" => Ok(true),
            "false" | "0" | "off" => Ok(false),
            other => anyhow::bail!("'{}' is not a boolean for {}.{}", other, self.channel, self.field),
        }
    }
}

pub fn parse_params(params: &[String]) -> HashMap<String, String> {
    params
        .iter()
        .filter_map(|s| {
            let mut parts = s.splitn(2, '=');
            let key = parts.next()?.to_string();
            let val = parts.next()?.to_string();
            Some((key, val))
        })
        .collect()
}
