use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::channels::session::Session;

pub const GENERATOR_TAG: &str = concat!("stemotion ", env!("CARGO_PKG_VERSION"));

/// Digits kept after the decimal point in exported values.
pub const EXPORT_DECIMALS: i32 = 4;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportMeta {
    pub fps: f64,
    pub bpm: f64,
    pub duration_frames: usize,
    pub generator_tag: String,
}

/// The exported artifact: metadata plus every channel's processed track keyed by id.
#[derive(Debug, Serialize)]
pub struct ExportPayload {
    pub meta: ExportMeta,
    pub channels: BTreeMap<String, Vec<f64>>,
}

impl ExportPayload {
    pub fn from_session(session: &Session, generator: &str) -> Self {
        let config = session.config();
        let channels = session
            .channels()
            .iter()
            .map(|c| {
                let values = c.processed_values().iter().map(|&v| round_value(v)).collect();
                (c.id.clone(), values)
            })
            .collect();

        Self {
            meta: ExportMeta {
                fps: config.fps,
                bpm: config.bpm,
                duration_frames: session.duration_frames(),
                generator_tag: generator.to_string(),
            },
            channels,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize export payload")
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create export file: {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)
            .with_context(|| format!("Failed to write export file: {}", path.display()))?;
        log::info!(
            "Exported {} channels ({} frames) to {}",
            self.channels.len(),
            self.meta.duration_frames,
            path.display()
        );
        Ok(())
    }
}

/// Round half away from zero to `EXPORT_DECIMALS` places.
pub fn round_value(value: f32) -> f64 {
    let scale = 10f64.powi(EXPORT_DECIMALS);
    // go through the shortest decimal form so 0.12345f32 rounds as written
    let decimal: f64 = value.to_string().parse().unwrap_or(value as f64);
    (decimal * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::AnalysisConfig;
    use crate::audio::features::{ChannelCategory, RawChannelData};
    use crate::refine::settings::RefinementSettings;

    fn track(id: &str, values: Vec<f32>) -> RawChannelData {
        RawChannelData {
            id: id.into(),
            display_name: id.into(),
            source_id: "master".into(),
            category: ChannelCategory::Energy,
            values,
        }
    }

    #[test]
    fn rounds_to_four_decimals() {
        assert_eq!(round_value(0.123456), 0.1235);
        assert_eq!(round_value(0.12345), 0.1235);
        assert_eq!(round_value(1.0), 1.0);
        assert_eq!(round_value(0.4), 0.4);
        assert_eq!(round_value(0.0), 0.0);
    }

    #[test]
    fn payload_uses_processed_values() {
        let mut session = Session::new(
            AnalysisConfig::default(),
            vec![track("low", vec![0.2, 0.9]), track("energy", vec![0.33333, 0.5])],
        )
        .unwrap();
        session
            .update_settings("low", RefinementSettings { invert: true, ..Default::default() })
            .unwrap();
        session.set_mute("energy", true).unwrap();

        let payload = ExportPayload::from_session(&session, "test");
        assert_eq!(payload.meta.duration_frames, 2);
        assert_eq!(payload.channels["low"], vec![0.8, 0.1]);
        // muted channels are still exported
        assert_eq!(payload.channels["energy"], vec![0.3333, 0.5]);
    }

    #[test]
    fn json_shape() {
        let session = Session::new(AnalysisConfig::default(), vec![track("energy", vec![0.5])]).unwrap();
        let json = ExportPayload::from_session(&session, GENERATOR_TAG).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["meta"]["fps"], 30.0);
        assert_eq!(value["meta"]["bpm"], 120.0);
        assert_eq!(value["meta"]["durationFrames"], 1);
        assert!(value["meta"]["generatorTag"].as_str().unwrap().starts_with("stemotion"));
        let mut keys: Vec<&String> = value["meta"].as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, ["bpm", "durationFrames", "fps", "generatorTag"]);
        assert_eq!(value["channels"]["energy"][0], 0.5);
    }
}
