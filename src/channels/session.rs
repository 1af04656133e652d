use rayon::prelude::*;
use std::collections::HashMap;

use crate::audio::analysis::AnalysisConfig;
use crate::audio::features::RawChannelData;
use crate::error::MotionError;
use crate::refine::pipeline::refine;
use crate::refine::queue::RefineQueue;
use crate::refine::settings::RefinementSettings;

use super::state::{CacheKey, ChannelState};
use super::visibility::{resolve_visibility, ChannelFlags};

/// Raw tracks of one analysis run plus the per-channel state built on them.
#[derive(Debug)]
pub struct Session {
    config: AnalysisConfig,
    raw: Vec<RawChannelData>,
    channels: Vec<ChannelState>,
    index: HashMap<String, usize>,
}

impl Session {
    /// Build channel states with default settings for every raw track.
    pub fn new(config: AnalysisConfig, raw: Vec<RawChannelData>) -> Result<Self, MotionError> {
        config.validate()?;

        let mut index = HashMap::with_capacity(raw.len());
        for (i, track) in raw.iter().enumerate() {
            if index.insert(track.id.clone(), i).is_some() {
                return Err(MotionError::invalid(format!("duplicate channel id '{}'", track.id)));
            }
        }

        let channels = raw
            .par_iter()
            .map(|track| ChannelState::new(track, &config))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!("Session ready with {} channels", channels.len());

        Ok(Self {
            config,
            raw,
            channels,
            index,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn channels(&self) -> &[ChannelState] {
        &self.channels
    }

    pub fn raw_channels(&self) -> &[RawChannelData] {
        &self.raw
    }

    pub fn channel(&self, id: &str) -> Option<&ChannelState> {
        self.index.get(id).map(|&i| &self.channels[i])
    }

    pub fn raw(&self, id: &str) -> Option<&RawChannelData> {
        self.index.get(id).map(|&i| &self.raw[i])
    }

    /// Frame count shared by every track (the longest source wins).
    pub fn duration_frames(&self) -> usize {
        self.raw.iter().map(|t| t.values.len()).max().unwrap_or(0)
    }

    /// Apply one settings edit synchronously.
    pub fn update_settings(&mut self, id: &str, settings: RefinementSettings) -> Result<bool, MotionError> {
        let i = self.position(id)?;
        let recomputed = self.channels[i].apply_settings(&self.raw[i], settings, &self.config)?;
        if recomputed {
            log::debug!("Refined '{}' ({} frames)", id, self.raw[i].values.len());
        }
        Ok(recomputed)
    }

    /// Drain the queue and refine each edited channel once, in parallel.
    /// If any edit is invalid nothing is applied and the queue is left as it was.
    pub fn apply_queue(&mut self, queue: &mut RefineQueue) -> Result<usize, MotionError> {
        let mut edits = Vec::with_capacity(queue.len());
        for (id, settings) in queue.iter() {
            let i = self.position(id)?;
            settings.validate().map_err(|e| match e {
                MotionError::InvalidConfiguration(msg) => {
                    MotionError::invalid(format!("channel '{}': {}", id, msg))
                }
                other => other,
            })?;
            if !self.channels[i].is_current(settings, &self.config) {
                edits.push((i, *settings));
            }
        }
        queue.drain();

        let config = self.config;
        let raw = &self.raw;
        let refined = edits
            .par_iter()
            .map(|&(i, settings)| {
                refine(&raw[i].values, &settings, config.bpm, config.fps)
                    .map(|values| (i, settings, values))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let count = refined.len();
        for (i, settings, values) in refined {
            let key = CacheKey::new(&settings, &config);
            self.channels[i].install(settings, key, values)?;
        }
        log::debug!("Applied {} queued edits", count);
        Ok(count)
    }

    pub fn set_flags(&mut self, id: &str, flags: ChannelFlags) -> Result<(), MotionError> {
        let i = self.position(id)?;
        self.channels[i].flags = flags;
        Ok(())
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) -> Result<(), MotionError> {
        let i = self.position(id)?;
        self.channels[i].flags.visible = visible;
        Ok(())
    }

    pub fn set_mute(&mut self, id: &str, mute: bool) -> Result<(), MotionError> {
        let i = self.position(id)?;
        self.channels[i].flags.mute = mute;
        Ok(())
    }

    pub fn set_solo(&mut self, id: &str, solo: bool) -> Result<(), MotionError> {
        let i = self.position(id)?;
        self.channels[i].flags.solo = solo;
        Ok(())
    }

    /// Effective visibility of every channel, in channel order.
    pub fn visibility(&self) -> Vec<bool> {
        resolve_visibility(self.channels.iter().map(|c| c.flags))
    }

    /// Channels the presentation layer should draw right now.
    pub fn visible_channels(&self) -> Vec<&ChannelState> {
        self.channels
            .iter()
            .zip(self.visibility())
            .filter_map(|(c, shown)| shown.then_some(c))
            .collect()
    }

    fn position(&self, id: &str) -> Result<usize, MotionError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| MotionError::UnknownChannel(id.to_string()))
    }
}
