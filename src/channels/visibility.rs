use serde::{Deserialize, Serialize};

/// Eye / mute / solo toggles of one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFlags {
    pub visible: bool,
    pub mute: bool,
    pub solo: bool,
}

impl Default for ChannelFlags {
    fn default() -> Self {
        Self {
            visible: true,
            mute: false,
            solo: false,
        }
    }
}

/// Whether one channel renders, given whether any channel in the set is soloed.
///
/// The eye flag always wins. While anything is soloed mute is ignored and
/// only soloed channels show.
pub fn effective_visibility(flags: ChannelFlags, any_solo: bool) -> bool {
    if !flags.visible {
        false
    } else if any_solo {
        flags.solo
    } else {
        !flags.mute
    }
}

/// Resolve every channel's effective visibility, in input order.
pub fn resolve_visibility<I>(flags: I) -> Vec<bool>
where
    I: IntoIterator<Item = ChannelFlags>,
    I::IntoIter: Clone,
{
    let iter = flags.into_iter();
    let any_solo = iter.clone().any(|f| f.solo);
    iter.map(|f| effective_visibility(f, any_solo)).collect()
}
