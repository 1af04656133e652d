use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// Sample-and-hold resolution, in notes per whole bar of 4/4.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Quantize {
    #[default]
    Off,
    Quarter,
    Eighth,
    Sixteenth,
}

impl Quantize {
    pub fn divisions(self) -> u32 {
        match self {
            Quantize::Off => 0,
            Quantize::Quarter => 4,
            Quantize::Eighth => 8,
            Quantize::Sixteenth => 16,
        }
    }

    /// Hold length in frames, `framesPerBeat / (divisions / 4)`. `None` when off.
    pub fn block_frames(self, frames_per_beat: f64) -> Option<f64> {
        match self.divisions() {
            0 => None,
            d => Some(frames_per_beat * 4.0 / d as f64),
        }
    }
}

impl TryFrom<u32> for Quantize {
    type Error = MotionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Quantize::Off),
            4 => Ok(Quantize::Quarter),
            8 => Ok(Quantize::Eighth),
            16 => Ok(Quantize::Sixteenth),
            other => Err(MotionError::invalid(format!(
                "quantize must be one of 0, 4, 8, 16, got {}",
                other
            ))),
        }
    }
}

impl From<Quantize> for u32 {
    fn from(q: Quantize) -> u32 {
        q.divisions()
    }
}

/// Per-channel transform parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementSettings {
    /// 0..=5
    pub gain: f32,
    /// -1..=1
    pub offset: f32,
    /// 0..=1, 0 disables smoothing
    pub smooth: f32,
    /// 0..=1, values strictly below are zeroed
    pub gate: f32,
    pub clip: bool,
    pub invert: bool,
    pub quantize: Quantize,
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
            smooth: 0.0,
            gate: 0.0,
            clip: true,
            invert: false,
            quantize: Quantize::Off,
        }
    }
}

impl RefinementSettings {
    pub fn validate(&self) -> Result<(), MotionError> {
        check_range("gain", self.gain, 0.0, 5.0)?;
        check_range("offset", self.offset, -1.0, 1.0)?;
        check_range("smooth", self.smooth, 0.0, 1.0)?;
        check_range("gate", self.gate, 0.0, 1.0)?;
        Ok(())
    }

    /// Apply one `field=value` edit, as typed on the command line.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), MotionError> {
        let number = || {
            value
                .parse::<f32>()
                .map_err(|_| MotionError::invalid(format!("'{}' is not a number for {}", value, field)))
        };
        let flag = || match value {
            "true" | "1" | "on" => Ok(true),
            "false" | "0" | "off" => Ok(false),
            _ => Err(MotionError::invalid(format!("'{}' is not a boolean for {}", value, field))),
        };

        match field {
            "gain" => self.gain = number()?,
            "offset" => self.offset = number()?,
            "smooth" => self.smooth = number()?,
            "gate" => self.gate = number()?,
            "clip" => self.clip = flag()?,
            "invert" => self.invert = flag()?,
            "quantize" => {
                let divisions = value
                    .parse::<u32>()
                    .map_err(|_| MotionError::invalid(format!("'{}' is not a quantize value", value)))?;
                self.quantize = Quantize::try_from(divisions)?;
            }
            other => return Err(MotionError::invalid(format!("unknown setting '{}'", other))),
        }
        self.validate()
    }

    /// Identity of these settings for cache lookups. Bitwise on floats, so
    /// `0.0` and `-0.0` are distinct keys.
    pub fn cache_key(&self) -> SettingsKey {
        SettingsKey {
            gain: self.gain.to_bits(),
            offset: self.offset.to_bits(),
            smooth: self.smooth.to_bits(),
            gate: self.gate.to_bits(),
            clip: self.clip,
            invert: self.invert,
            quantize: self.quantize,
        }
    }
}

/// Exact bit patterns of every setting; equal keys mean equal settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SettingsKey {
    gain: u32,
    offset: u32,
    smooth: u32,
    gate: u32,
    clip: bool,
    invert: bool,
    quantize: Quantize,
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<(), MotionError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(MotionError::invalid(format!(
            "{} must be within [{}, {}], got {}",
            name, min, max, value
        )))
    }
}
