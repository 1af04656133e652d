use serde::Serialize;

/// One-pole low-pass coefficient used to split the signal into low/high parts.
pub const LOWPASS_ALPHA: f32 = 0.15;
/// RMS of the low-passed signal reaches 1.0 at 0.2.
pub const LOW_GAIN: f32 = 5.0;
/// RMS of the high-passed residual reaches 1.0 at 0.125.
pub const HIGH_GAIN: f32 = 8.0;
/// Full-band RMS reaches 1.0 at 0.25.
pub const ENERGY_GAIN: f32 = 4.0;
/// Share of low and high removed from energy to estimate the mid band.
pub const MID_BLEED: f32 = 0.4;
/// Mean |L - R| reaches 1.0 at 0.25.
pub const WIDTH_GAIN: f32 = 4.0;
/// Frame-to-frame energy rise that saturates the transient track.
pub const TRANSIENT_GAIN: f32 = 4.0;
/// Guards the brightness ratio against silent frames.
pub const BRIGHTNESS_EPSILON: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelCategory {
    Energy,
    Rhythmic,
    Phase,
    Creative,
}

impl ChannelCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelCategory::Energy => "energy",
            ChannelCategory::Rhythmic => "rhythmic",
            ChannelCategory::Phase => "phase",
            ChannelCategory::Creative => "creative",
        }
    }
}

/// The fixed set of tracks produced per source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Energy,
    Low,
    Mid,
    High,
    Transient,
    Brightness,
    Width,
    BeatPhase,
    BarPhase,
}

impl FeatureKind {
    /// Tracks computed for every source, in output order.
    pub const SIGNAL: [FeatureKind; 7] = [
        FeatureKind::Energy,
        FeatureKind::Low,
        FeatureKind::Mid,
        FeatureKind::High,
        FeatureKind::Transient,
        FeatureKind::Brightness,
        FeatureKind::Width,
    ];

    pub fn key(self) -> &'static str {
        match self {
            FeatureKind::Energy => "energy",
            FeatureKind::Low => "low",
            FeatureKind::Mid => "mid",
            FeatureKind::High => "high",
            FeatureKind::Transient => "transient",
            FeatureKind::Brightness => "brightness",
            FeatureKind::Width => "width",
            FeatureKind::BeatPhase => "beat_phase",
            FeatureKind::BarPhase => "bar_phase",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FeatureKind::Energy => "Energy",
            FeatureKind::Low => "Low",
            FeatureKind::Mid => "Mid",
            FeatureKind::High => "High",
            FeatureKind::Transient => "Transients",
            FeatureKind::Brightness => "Brightness",
            FeatureKind::Width => "Stereo Width",
            FeatureKind::BeatPhase => "Beat Phase",
            FeatureKind::BarPhase => "Bar Phase",
        }
    }

    pub fn category(self) -> ChannelCategory {
        match self {
            FeatureKind::Energy | FeatureKind::Low | FeatureKind::Mid | FeatureKind::High => {
                ChannelCategory::Energy
            }
            FeatureKind::Transient => ChannelCategory::Rhythmic,
            FeatureKind::BeatPhase | FeatureKind::BarPhase => ChannelCategory::Phase,
            FeatureKind::Brightness | FeatureKind::Width => ChannelCategory::Creative,
        }
    }
}

/// A raw feature track. Never mutated after extraction.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChannelData {
    pub id: String,
    pub display_name: String,
    pub source_id: String,
    pub category: ChannelCategory,
    /// One value per output frame, all in [0, 1].
    pub values: Vec<f32>,
}
