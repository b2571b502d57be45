use std::collections::BTreeMap;

use crate::synth::{notes::KeyId, voice::Voice};

/// Live voices keyed by the key that triggered them.
///
/// Holds at most one voice per key. Only sounding voices live here: a voice
/// leaves the registry the moment its key is released, even though its
/// graph keeps fading out for a while afterwards.
///
/// There is no cap on how many keys can sound at once.
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: BTreeMap<KeyId, Voice>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a new voice may be started for `key`.
    pub fn try_acquire(&self, key: KeyId) -> bool {
        !self.voices.contains_key(&key)
    }

    /// Insert a voice under its own key, handing back any voice it displaced.
    pub fn register(&mut self, voice: Voice) -> Option<Voice> {
        self.voices.insert(voice.key(), voice)
    }

    /// Remove and return the voice for `key`. Unknown keys are a no-op.
    pub fn release(&mut self, key: KeyId) -> Option<Voice> {
        self.voices.remove(&key)
    }

    pub fn get(&self, key: KeyId) -> Option<&Voice> {
        self.voices.get(&key)
    }

    /// Keys with a sounding voice, in key order.
    pub fn active_ids(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.voices.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.values()
    }

    pub fn count(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::node::NodeId, synth::builder::VoiceGraph};

    fn voice(key: KeyId) -> Voice {
        let graph = VoiceGraph {
            oscillators: vec![NodeId(1)],
            envelope: NodeId(2),
            auxiliary: Vec::new(),
        };
        Voice::new(key, 440.0, graph, 0.0)
    }

    #[test]
    fn one_voice_per_key() {
        let mut registry = VoiceRegistry::new();
        assert!(registry.try_acquire('Z'));
        assert!(registry.register(voice('Z')).is_none());
        assert!(!registry.try_acquire('Z'));
        assert!(registry.try_acquire('X'));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn release_of_unknown_key_is_a_no_op() {
        let mut registry = VoiceRegistry::new();
        registry.register(voice('Z'));
        assert!(registry.release('Q').is_none());
        assert_eq!(registry.count(), 1);

        assert!(registry.release('Z').is_some());
        assert!(registry.release('Z').is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn no_cap_on_concurrent_voices() {
        let mut registry = VoiceRegistry::new();
        for key in crate::synth::notes::KEYBOARD {
            registry.register(voice(key));
        }
        assert_eq!(registry.count(), 24);
    }

    #[test]
    fn active_ids_are_sorted() {
        let mut registry = VoiceRegistry::new();
        for key in ['Z', 'C', 'N'] {
            registry.register(voice(key));
        }
        assert_eq!(registry.active_ids().collect::<Vec<_>>(), vec!['C', 'N', 'Z']);
    }
}
