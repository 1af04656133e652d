use std::collections::BTreeMap;

use super::settings::RefinementSettings;

/// Pending settings edits, at most one per channel.
///
/// A newer edit for a channel replaces the queued one; superseded edits are
/// dropped, never recomputed.
#[derive(Debug, Default)]
pub struct RefineQueue {
    pending: BTreeMap<String, RefinementSettings>,
    superseded: usize,
}

impl RefineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `settings` for `channel_id`. Returns true when an older edit was discarded.
    pub fn submit(&mut self, channel_id: &str, settings: RefinementSettings) -> bool {
        let replaced = self.pending.insert(channel_id.to_string(), settings).is_some();
        if replaced {
            self.superseded += 1;
            log::debug!("Coalesced edit for '{}'", channel_id);
        }
        replaced
    }

    pub fn pending(&self, channel_id: &str) -> Option<&RefinementSettings> {
        self.pending.get(channel_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Edits discarded since the queue was created.
    pub fn superseded(&self) -> usize {
        self.superseded
    }

    /// Pending edits, ordered by channel id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RefinementSettings)> {
        self.pending.iter().map(|(id, settings)| (id.as_str(), settings))
    }

    /// Hand out the latest edit per channel, ordered by channel id.
    pub fn drain(&mut self) -> Vec<(String, RefinementSettings)> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_edit_wins() {
        let mut queue = RefineQueue::new();
        for gain in [1.5, 2.0, 2.5] {
            queue.submit("energy", RefinementSettings { gain, ..Default::default() });
        }
        queue.submit("low", RefinementSettings::default());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.superseded(), 2);

        let edits = queue.drain();
        assert_eq!(edits[0].0, "energy");
        assert_eq!(edits[0].1.gain, 2.5);
        assert_eq!(edits[1].0, "low");
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_on_empty_queue() {
        let mut queue = RefineQueue::new();
        assert!(queue.drain().is_empty());
        assert!(!queue.submit("mid", RefinementSettings::default()));
        assert!(queue.pending("mid").is_some());
    }
}
