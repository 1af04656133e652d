use serde::Deserialize;

use super::features::{
    FeatureKind, RawChannelData, BRIGHTNESS_EPSILON, ENERGY_GAIN, HIGH_GAIN, LOWPASS_ALPHA,
    LOW_GAIN, MID_BLEED, TRANSIENT_GAIN, WIDTH_GAIN,
};
use super::source::{AudioSource, SourceRole};
use crate::error::MotionError;

/// Process-wide analysis parameters. Changing any field invalidates every raw track.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    #[serde(default = "default_time_signature")]
    pub time_signature: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            bpm: default_bpm(),
            time_signature: default_time_signature(),
        }
    }
}

fn default_fps() -> f64 { 30.0 }
fn default_bpm() -> f64 { 120.0 }
fn default_time_signature() -> u32 { 4 }

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), MotionError> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(MotionError::invalid(format!("fps must be positive, got {}", self.fps)));
        }
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(MotionError::invalid(format!("bpm must be positive, got {}", self.bpm)));
        }
        if self.time_signature == 0 {
            return Err(MotionError::invalid("time signature numerator must be at least 1"));
        }
        Ok(())
    }
}

/// `ceil(duration * fps)`, snapping products that are integral up to float noise.
pub fn frame_count(duration: f64, fps: f64) -> usize {
    let exact = duration * fps;
    if !exact.is_finite() || exact <= 0.0 {
        return 0;
    }
    let nearest = exact.round();
    if (exact - nearest).abs() < 1e-9 * nearest.max(1.0) {
        nearest as usize
    } else {
        exact.ceil() as usize
    }
}

/// Extract every raw feature track of one source in a single sequential pass.
///
/// The low-pass state runs continuously across frame boundaries, so frames
/// cannot be computed independently.
pub fn extract(source: &AudioSource, config: &AnalysisConfig) -> Result<Vec<RawChannelData>, MotionError> {
    config.validate()?;
    if source.sample_rate == 0 {
        return Err(MotionError::invalid(format!(
            "source '{}' has a sample rate of 0",
            source.name
        )));
    }

    let total_samples = source.total_samples();
    let total_frames = if total_samples == 0 {
        0
    } else {
        frame_count(source.duration, config.fps)
    };
    let samples_per_frame = (source.sample_rate as f64 / config.fps).floor() as usize;

    let left = source.channels.first().map(Vec::as_slice).unwrap_or(&[]);
    let right = if source.is_stereo() { Some(source.channels[1].as_slice()) } else { None };

    let mut energy = Vec::with_capacity(total_frames);
    let mut low = Vec::with_capacity(total_frames);
    let mut mid = Vec::with_capacity(total_frames);
    let mut high = Vec::with_capacity(total_frames);
    let mut transient = Vec::with_capacity(total_frames);
    let mut brightness = Vec::with_capacity(total_frames);
    let mut width = Vec::with_capacity(total_frames);

    let mut lp_state = 0.0f32;
    let mut prev_energy = 0.0f32;

    for frame in 0..total_frames {
        let start = (frame * samples_per_frame).min(total_samples);
        let end = ((frame + 1) * samples_per_frame).min(total_samples);
        let len = end - start;

        let mut sum_low = 0.0f64;
        let mut sum_high = 0.0f64;
        let mut sum_raw = 0.0f64;
        let mut sum_side = 0.0f64;

        for i in start..end {
            let mono = match right {
                Some(r) => (left[i] + r[i]) * 0.5,
                None => left[i],
            };
            lp_state += (mono - lp_state) * LOWPASS_ALPHA;
            let residual = mono - lp_state;

            sum_low += (lp_state as f64) * (lp_state as f64);
            sum_high += (residual as f64) * (residual as f64);
            sum_raw += (mono as f64) * (mono as f64);
            if let Some(r) = right {
                sum_side += (left[i] - r[i]).abs() as f64;
            }
        }

        // A short final frame divides by its own length
        let (rms_low, rms_high, rms_raw, mean_side) = if len == 0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let n = len as f64;
            (
                (sum_low / n).sqrt() as f32,
                (sum_high / n).sqrt() as f32,
                (sum_raw / n).sqrt() as f32,
                (sum_side / n) as f32,
            )
        };

        let frame_low = (rms_low * LOW_GAIN).min(1.0);
        let frame_high = (rms_high * HIGH_GAIN).min(1.0);
        let frame_energy = (rms_raw * ENERGY_GAIN).min(1.0);
        let frame_mid = (frame_energy - MID_BLEED * frame_low - MID_BLEED * frame_high).max(0.0);
        let frame_brightness =
            (2.0 * rms_high / (rms_low + rms_high + BRIGHTNESS_EPSILON)).min(1.0);
        let frame_width = if right.is_some() { (mean_side * WIDTH_GAIN).min(1.0) } else { 0.0 };
        let frame_transient = if frame == 0 {
            0.0
        } else {
            ((frame_energy - prev_energy) * TRANSIENT_GAIN).clamp(0.0, 1.0)
        };

        energy.push(frame_energy);
        low.push(frame_low);
        mid.push(frame_mid);
        high.push(frame_high);
        transient.push(frame_transient);
        brightness.push(frame_brightness);
        width.push(frame_width);
        prev_energy = frame_energy;
    }

    let mut tracks: Vec<(FeatureKind, Vec<f32>)> = vec![
        (FeatureKind::Energy, energy),
        (FeatureKind::Low, low),
        (FeatureKind::Mid, mid),
        (FeatureKind::High, high),
        (FeatureKind::Transient, transient),
        (FeatureKind::Brightness, brightness),
        (FeatureKind::Width, width),
    ];

    if source.role == SourceRole::Master {
        let (beat, bar) = phase_tracks(total_frames, config);
        tracks.push((FeatureKind::BeatPhase, beat));
        tracks.push((FeatureKind::BarPhase, bar));
    }

    log::info!(
        "Extracted {} tracks from '{}' ({} frames, {} samples/frame)",
        tracks.len(),
        source.name,
        total_frames,
        samples_per_frame
    );

    Ok(tracks
        .into_iter()
        .map(|(kind, values)| channel_for(source, kind, values))
        .collect())
}

/// Beat and bar phase in [0, 1) for every frame, derived from tempo alone.
pub fn phase_tracks(total_frames: usize, config: &AnalysisConfig) -> (Vec<f32>, Vec<f32>) {
    let seconds_per_beat = 60.0 / config.bpm;
    let beats_per_bar = config.time_signature.max(1) as f64;

    let mut beat_phase = Vec::with_capacity(total_frames);
    let mut bar_phase = Vec::with_capacity(total_frames);
    for frame in 0..total_frames {
        let t = frame as f64 / config.fps;
        let beats = t / seconds_per_beat;
        beat_phase.push(unit_phase(beats));
        bar_phase.push(unit_phase(beats / beats_per_bar));
    }
    (beat_phase, bar_phase)
}

fn unit_phase(x: f64) -> f32 {
    let p = x.rem_euclid(1.0) as f32;
    // f32 rounding can land exactly on 1.0
    if p >= 1.0 { 0.0 } else { p }
}

fn channel_for(source: &AudioSource, kind: FeatureKind, values: Vec<f32>) -> RawChannelData {
    let (id, display_name) = match source.role {
        SourceRole::Master => (kind.key().to_string(), kind.display_name().to_string()),
        SourceRole::Stem => (
            format!("{}_{}", source.id, kind.key()),
            format!("{} {}", source.name, kind.display_name()),
        ),
    };
    RawChannelData {
        id,
        display_name,
        source_id: source.id.clone(),
        category: kind.category(),
        values,
    }
}
