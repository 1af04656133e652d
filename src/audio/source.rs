use serde::Serialize;

use super::decode::DecodedAudio;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    Master,
    Stem,
}

/// One decoded input. Immutable after registration.
#[derive(Clone, Debug)]
pub struct AudioSource {
    /// Stable key, also the channel id prefix for stems.
    pub id: String,
    pub name: String,
    pub role: SourceRole,
    pub sample_rate: u32,
    pub duration: f64,
    /// One (mono) or two (left, right) sample sequences in [-1, 1].
    pub channels: Vec<Vec<f32>>,
}

impl AudioSource {
    pub fn is_stereo(&self) -> bool {
        self.channels.len() >= 2
    }

    pub fn total_samples(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }
}

/// Holds the decoded sources of a session. The first registered source is
/// the master, every later one a stem.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<AudioSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, audio: DecodedAudio) -> &AudioSource {
        let role = if self.sources.iter().any(|s| s.role == SourceRole::Master) {
            SourceRole::Stem
        } else {
            SourceRole::Master
        };

        let id = match role {
            SourceRole::Master => "master".to_string(),
            SourceRole::Stem => self.unique_id(&slugify(name)),
        };

        self.sources.push(AudioSource {
            id,
            name: name.to_string(),
            role,
            sample_rate: audio.sample_rate,
            duration: audio.duration,
            channels: audio.channels,
        });
        &self.sources[self.sources.len() - 1]
    }

    pub fn remove(&mut self, id: &str) -> Option<AudioSource> {
        let idx = self.sources.iter().position(|s| s.id == id)?;
        Some(self.sources.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&AudioSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AudioSource> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn unique_id(&self, base: &str) -> String {
        // "master" is reserved so stem ids never shadow master channels
        let taken = |id: &str| id == "master" || self.sources.iter().any(|s| s.id == id);
        if !taken(base) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Lowercase ASCII identifier derived from a display name, e.g. "Lead Vox.wav" -> "lead_vox_wav".
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "stem".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(len: usize) -> DecodedAudio {
        DecodedAudio::new(vec![vec![0.0; len]], 44100)
    }

    #[test]
    fn first_source_is_master() {
        let mut registry = SourceRegistry::new();
        assert_eq!(registry.register("Mix", mono(10)).role, SourceRole::Master);
        let stem = registry.register("Drums", mono(10));
        assert_eq!(stem.role, SourceRole::Stem);
        assert_eq!(stem.id, "drums");
    }

    #[test]
    fn duplicate_stem_names_get_unique_ids() {
        let mut registry = SourceRegistry::new();
        registry.register("mix", mono(1));
        registry.register("Bass", mono(1));
        let second = registry.register("bass", mono(1)).id.clone();
        assert_eq!(second, "bass_2");
        let master_named = registry.register("master", mono(1)).id.clone();
        assert_eq!(master_named, "master_2");
    }

    #[test]
    fn removing_master_lets_next_import_become_master() {
        let mut registry = SourceRegistry::new();
        registry.register("mix", mono(1));
        assert!(registry.remove("master").is_some());
        assert!(registry.is_empty());
        assert_eq!(registry.register("other", mono(1)).role, SourceRole::Master);
    }

    #[test]
    fn slugify_names() {
        assert_eq!(slugify("Lead Vox.wav"), "lead_vox_wav");
        assert_eq!(slugify("  --  "), "stem");
        assert_eq!(slugify("Kick&Snare"), "kick_snare");
    }

    #[test]
    fn duration_uses_shortest_channel() {
        let audio = DecodedAudio::new(vec![vec![0.0; 44100], vec![0.0; 22050]], 44100);
        assert!((audio.duration - 0.5).abs() < 1e-12);
    }
}
