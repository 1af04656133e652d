use super::settings::RefinementSettings;
use crate::error::MotionError;

/// At `smooth = 1` the filter keeps 95% of its state per frame.
pub const MAX_SMOOTH_RETENTION: f32 = 0.95;

/// Reshape a raw track into its display/export form.
///
/// Stages run in a fixed order: gate, gain/offset, smoothing, quantize,
/// clip, invert. The first three stream over the track with one filter state
/// reset at every call. Quantize is a second pass over the smoothed track
/// that holds the first sample of each beat-subdivision block, followed by
/// clip and invert on the held value.
pub fn refine(
    raw: &[f32],
    settings: &RefinementSettings,
    bpm: f64,
    fps: f64,
) -> Result<Vec<f32>, MotionError> {
    let smoothed = smooth_pass(raw, settings);
    let output = hold_pass(&smoothed, settings, bpm, fps);

    if output.len() != raw.len() {
        return Err(MotionError::LengthMismatch {
            expected: raw.len(),
            actual: output.len(),
        });
    }
    Ok(output)
}

fn smooth_pass(raw: &[f32], settings: &RefinementSettings) -> Vec<f32> {
    let alpha = 1.0 - settings.smooth.max(0.0).sqrt() * MAX_SMOOTH_RETENTION;
    let mut state = 0.0f32;

    raw.iter()
        .map(|&sample| {
            let gated = if sample < settings.gate { 0.0 } else { sample };
            let shaped = (gated + settings.offset) * settings.gain;
            state = state * (1.0 - alpha) + shaped * alpha;
            state
        })
        .collect()
}

fn hold_pass(smoothed: &[f32], settings: &RefinementSettings, bpm: f64, fps: f64) -> Vec<f32> {
    let frames_per_beat = 60.0 / bpm * fps;
    let block = settings
        .quantize
        .block_frames(frames_per_beat)
        .filter(|b| b.is_finite() && *b > 0.0);

    let mut current_block = usize::MAX;
    let mut held = 0.0f32;

    smoothed
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let value = match block {
                Some(len) => {
                    let idx = (i as f64 / len).floor() as usize;
                    if idx != current_block {
                        current_block = idx;
                        held = value;
                    }
                    held
                }
                None => value,
            };
            finish(value, settings)
        })
        .collect()
}

fn finish(value: f32, settings: &RefinementSettings) -> f32 {
    let clipped = if settings.clip { value.clamp(0.0, 1.0) } else { value.max(0.0) };
    if settings.invert {
        // Unclipped values above 1 would invert below zero
        (1.0 - clipped).max(0.0)
    } else {
        clipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::settings::Quantize;

    const BPM: f64 = 120.0;
    const FPS: f64 = 30.0;

    fn settings() -> RefinementSettings {
        RefinementSettings::default()
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < 1e-6, "frame {}: {} != {}", i, a, e);
        }
    }

    #[test]
    fn gain_then_clip() {
        let s = RefinementSettings { gain: 2.0, ..settings() };
        let out = refine(&[0.2, 0.8, 0.5], &s, BPM, FPS).unwrap();
        assert_close(&out, &[0.4, 1.0, 1.0]);
    }

    #[test]
    fn gate_zeroes_below_threshold() {
        let s = RefinementSettings { gate: 0.5, ..settings() };
        let out = refine(&[0.3, 0.6], &s, BPM, FPS).unwrap();
        assert_close(&out, &[0.0, 0.6]);
    }

    #[test]
    fn invert_after_clip() {
        let s = RefinementSettings { invert: true, ..settings() };
        let out = refine(&[0.2, 0.9], &s, BPM, FPS).unwrap();
        assert_close(&out, &[0.8, 0.1]);
    }

    #[test]
    fn identity_settings_clamp_raw() {
        let raw = [0.0, 0.25, 1.0, 1.7, -0.3, 0.999];
        let out = refine(&raw, &settings(), BPM, FPS).unwrap();
        let expected: Vec<f32> = raw.iter().map(|v| v.clamp(0.0, 1.0)).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn gate_applies_before_offset() {
        // 0.3 is gated even though 0.3 + 0.5 would clear the threshold
        let s = RefinementSettings { gate: 0.4, offset: 0.5, ..settings() };
        let out = refine(&[0.3, 0.4], &s, BPM, FPS).unwrap();
        assert_close(&out, &[0.5, 0.9]);
    }

    #[test]
    fn unclipped_output_is_never_negative() {
        let s = RefinementSettings { clip: false, offset: -0.2, gain: 3.0, ..settings() };
        let out = refine(&[0.0, 0.5, 1.0], &s, BPM, FPS).unwrap();
        assert!(out.iter().all(|v| *v >= 0.0));
        assert!(out[2] > 1.0);
    }

    #[test]
    fn clipped_output_in_unit_range() {
        let s = RefinementSettings { gain: 5.0, offset: 0.3, smooth: 0.4, ..settings() };
        let raw: Vec<f32> = (0..200).map(|i| ((i as f32) * 0.37).sin().abs()).collect();
        let out = refine(&raw, &s, BPM, FPS).unwrap();
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn unclipped_invert_stays_in_unit_range() {
        let s = RefinementSettings { clip: false, invert: true, gain: 4.0, ..settings() };
        let out = refine(&[0.1, 0.9], &s, BPM, FPS).unwrap();
        assert_close(&out, &[0.6, 0.0]);
    }

    #[test]
    fn double_invert_returns_clipped_value() {
        let s = RefinementSettings { invert: true, ..settings() };
        let raw = [-0.2, 0.0, 0.33, 0.75, 1.4];
        let once = refine(&raw, &s, BPM, FPS).unwrap();
        let twice = refine(&once, &s, BPM, FPS).unwrap();
        let clipped: Vec<f32> = raw.iter().map(|v| v.clamp(0.0, 1.0)).collect();
        assert_close(&twice, &clipped);
    }

    #[test]
    fn full_smoothing_lags() {
        let s = RefinementSettings { smooth: 1.0, ..settings() };
        let out = refine(&[1.0; 10], &s, BPM, FPS).unwrap();
        assert!((out[0] - 0.05).abs() < 1e-6);
        assert!(out.windows(2).all(|w| w[1] > w[0]));
        assert!(out[9] < 0.5);
    }

    #[test]
    fn smoothing_state_resets_per_call() {
        let s = RefinementSettings { smooth: 0.5, ..settings() };
        let a = refine(&[1.0, 1.0, 0.0], &s, BPM, FPS).unwrap();
        let b = refine(&[1.0, 1.0, 0.0], &s, BPM, FPS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn quantize_holds_first_sample_of_each_block() {
        // 15 frames per beat; quarter notes hold for 15 frames
        let raw: Vec<f32> = (0..45).map(|i| i as f32 / 45.0).collect();
        let s = RefinementSettings { quantize: Quantize::Quarter, ..settings() };
        let out = refine(&raw, &s, BPM, FPS).unwrap();
        assert!(out[..15].iter().all(|v| *v == raw[0]));
        assert!(out[15..30].iter().all(|v| *v == raw[15]));
        assert!(out[30..].iter().all(|v| *v == raw[30]));
    }

    #[test]
    fn quantize_handles_fractional_blocks() {
        // sixteenths are 3.75 frames long: blocks start at 0, 4, 8, 12, 15
        let raw: Vec<f32> = (0..16).map(|i| i as f32 / 16.0).collect();
        let s = RefinementSettings { quantize: Quantize::Sixteenth, ..settings() };
        let out = refine(&raw, &s, BPM, FPS).unwrap();
        let starts: Vec<usize> = (0..out.len()).filter(|&i| i == 0 || out[i] != out[i - 1]).collect();
        assert_eq!(starts, vec![0, 4, 8, 12, 15]);
    }

    #[test]
    fn quantize_after_smoothing() {
        let s = RefinementSettings { smooth: 1.0, quantize: Quantize::Quarter, ..settings() };
        let out = refine(&[1.0; 20], &s, BPM, FPS).unwrap();
        assert!((out[14] - 0.05).abs() < 1e-6);
        assert!(out[15] > 0.05);
    }

    #[test]
    fn length_preserved_for_any_settings() {
        let raw: Vec<f32> = (0..101).map(|i| (i % 7) as f32 / 7.0).collect();
        for quantize in [Quantize::Off, Quantize::Quarter, Quantize::Eighth, Quantize::Sixteenth] {
            for &smooth in &[0.0, 0.5, 1.0] {
                for &clip in &[true, false] {
                    let s = RefinementSettings { quantize, smooth, clip, ..settings() };
                    assert_eq!(refine(&raw, &s, BPM, FPS).unwrap().len(), raw.len());
                }
            }
        }
        assert!(refine(&[], &settings(), BPM, FPS).unwrap().is_empty());
    }
}
