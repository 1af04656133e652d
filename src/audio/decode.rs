use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::MotionError;

/// Decoded PCM, one dense sequence per channel (at most two).
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub duration: f64,
}

impl DecodedAudio {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let len = channels.iter().map(Vec::len).min().unwrap_or(0);
        let duration = if sample_rate > 0 {
            len as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            channels,
            sample_rate,
            duration,
        }
    }
}

pub fn decode_audio(path: &Path) -> Result<DecodedAudio, MotionError> {
    let source_name = path.display().to_string();
    let fail = |message: String| MotionError::Decode {
        source_name: source_name.clone(),
        message,
    };

    let file = std::fs::File::open(path).map_err(|e| fail(format!("cannot open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| fail(format!("unsupported format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| fail("no audio tracks found".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| fail("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| fail(format!("no decoder: {}", e)))?;

    let mut left: Vec<f32> = Vec::new();
    let mut right: Vec<f32> = Vec::new();
    let mut channel_count = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(fail(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(fail(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        if channel_count == 0 {
            channel_count = channels;
            if channels > 2 {
                log::warn!(
                    "{}: {} channels, keeping the first two",
                    source_name,
                    channels
                );
            }
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for frame in sample_buf.samples().chunks(channels) {
            left.push(frame[0]);
            if channels > 1 {
                right.push(frame[1]);
            }
        }
    }

    let channels = if channel_count > 1 {
        vec![left, right]
    } else {
        vec![left]
    };
    let audio = DecodedAudio::new(channels, sample_rate);

    log::info!(
        "Decoded {}: {} channel(s), {}Hz, {:.1}s",
        source_name,
        audio.channels.len(),
        sample_rate,
        audio.duration
    );

    Ok(audio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("stemotion-{}-{}", std::process::id(), name));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// 16-bit PCM WAV from interleaved samples.
    fn wav(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let block_align = channels * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn stereo_wav_splits_left_and_right() {
        let interleaved: Vec<i16> = (0..100).flat_map(|_| [16384i16, -16384]).collect();
        let path = temp_file("stereo.wav", &wav(2, 8000, &interleaved));
        let audio = decode_audio(&path);
        std::fs::remove_file(&path).ok();

        let audio = audio.unwrap();
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.channels.len(), 2);
        assert_eq!(audio.channels[0].len(), 100);
        assert!(audio.channels[0].iter().all(|&s| s == 0.5));
        assert!(audio.channels[1].iter().all(|&s| s == -0.5));
        assert!((audio.duration - 0.0125).abs() < 1e-12);
    }

    #[test]
    fn mono_wav_has_one_channel() {
        let path = temp_file("mono.wav", &wav(1, 8000, &[0, 8192, -8192, 0]));
        let audio = decode_audio(&path);
        std::fs::remove_file(&path).ok();

        let audio = audio.unwrap();
        assert_eq!(audio.channels, vec![vec![0.0, 0.25, -0.25, 0.0]]);
    }

    #[test]
    fn truncated_header_is_a_decode_error() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&12u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        let path = temp_file("truncated.wav", &bytes);
        let result = decode_audio(&path);
        std::fs::remove_file(&path).ok();

        match result {
            Err(MotionError::Decode { source_name, .. }) => assert!(source_name.ends_with("truncated.wav")),
            other => panic!("expected a decode error, got {:?}", other.map(|a| a.channels.len())),
        }
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let path = std::env::temp_dir().join("stemotion-does-not-exist.wav");
        assert!(matches!(decode_audio(&path), Err(MotionError::Decode { .. })));
    }
}
