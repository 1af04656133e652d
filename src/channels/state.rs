use crate::audio::analysis::AnalysisConfig;
use crate::audio::features::{ChannelCategory, RawChannelData};
use crate::error::MotionError;
use crate::refine::pipeline::refine;
use crate::refine::settings::{RefinementSettings, SettingsKey};

use super::visibility::ChannelFlags;

/// Identity of one processed projection: the settings plus the tempo grid
/// quantize depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheKey {
    settings: SettingsKey,
    bpm_bits: u64,
    fps_bits: u64,
}

impl CacheKey {
    pub fn new(settings: &RefinementSettings, config: &AnalysisConfig) -> Self {
        Self {
            settings: settings.cache_key(),
            bpm_bits: config.bpm.to_bits(),
            fps_bits: config.fps.to_bits(),
        }
    }
}

/// Processed values memoized under the key they were computed for.
#[derive(Clone, Debug)]
struct ProcessedCache {
    key: CacheKey,
    values: Vec<f32>,
}

/// UI-facing state of one channel. The raw track plus `settings` are the
/// source of truth; `processed_values` is a projection of them.
#[derive(Clone, Debug)]
pub struct ChannelState {
    pub id: String,
    pub flags: ChannelFlags,
    pub color_tag: &'static str,
    settings: RefinementSettings,
    cache: ProcessedCache,
}

impl ChannelState {
    /// State with default settings, processed immediately.
    pub fn new(raw: &RawChannelData, config: &AnalysisConfig) -> Result<Self, MotionError> {
        let settings = RefinementSettings::default();
        let values = refine(&raw.values, &settings, config.bpm, config.fps)?;
        Ok(Self {
            id: raw.id.clone(),
            flags: ChannelFlags::default(),
            color_tag: color_for(raw.category),
            settings,
            cache: ProcessedCache {
                key: CacheKey::new(&settings, config),
                values,
            },
        })
    }

    pub fn settings(&self) -> &RefinementSettings {
        &self.settings
    }

    pub fn processed_values(&self) -> &[f32] {
        &self.cache.values
    }

    pub fn cache_key(&self) -> CacheKey {
        self.cache.key
    }

    /// Whether the cached projection was computed for `settings` under `config`.
    pub fn is_current(&self, settings: &RefinementSettings, config: &AnalysisConfig) -> bool {
        self.cache.key == CacheKey::new(settings, config)
    }

    /// Replace the settings and recompute synchronously. Returns false when
    /// the cache already matched and nothing was recomputed.
    pub fn apply_settings(
        &mut self,
        raw: &RawChannelData,
        settings: RefinementSettings,
        config: &AnalysisConfig,
    ) -> Result<bool, MotionError> {
        settings.validate()?;
        if self.is_current(&settings, config) {
            self.settings = settings;
            return Ok(false);
        }
        let values = refine(&raw.values, &settings, config.bpm, config.fps)?;
        self.install(settings, CacheKey::new(&settings, config), values)?;
        Ok(true)
    }

    /// Store values that were refined elsewhere (e.g. on a worker thread).
    pub(crate) fn install(
        &mut self,
        settings: RefinementSettings,
        key: CacheKey,
        values: Vec<f32>,
    ) -> Result<(), MotionError> {
        if values.len() != self.cache.values.len() {
            return Err(MotionError::LengthMismatch {
                expected: self.cache.values.len(),
                actual: values.len(),
            });
        }
        self.settings = settings;
        self.cache = ProcessedCache { key, values };
        Ok(())
    }
}

pub fn color_for(category: ChannelCategory) -> &'static str {
    match category {
        ChannelCategory::Energy => "#ff6b35",
        ChannelCategory::Rhythmic => "#f7c548",
        ChannelCategory::Phase => "#4ecdc4",
        ChannelCategory::Creative => "#a06cd5",
    }
}
