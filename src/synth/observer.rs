use crate::synth::{notes::KeyId, registry::VoiceRegistry};

/// Snapshot of which keys are sounding, for visualizers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActiveVoices {
    voices: Vec<(KeyId, f32)>,
}

impl ActiveVoices {
    pub fn from_registry(registry: &VoiceRegistry) -> Self {
        Self {
            voices: registry
                .iter()
                .map(|voice| (voice.key(), voice.frequency()))
                .collect(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.voices.iter().map(|&(key, _)| key)
    }

    /// `(key, frequency)` pairs in key order.
    pub fn voices(&self) -> &[(KeyId, f32)] {
        &self.voices
    }

    pub fn contains(&self, key: KeyId) -> bool {
        self.voices.iter().any(|&(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Arithmetic mean of the sounding frequencies, `None` when silent.
    pub fn mean_frequency(&self) -> Option<f32> {
        if self.voices.is_empty() {
            return None;
        }
        let sum: f32 = self.voices.iter().map(|&(_, f)| f).sum();
        Some(sum / self.voices.len() as f32)
    }
}

/// Hook called after every note-on and note-off that changed the active set.
pub trait VoiceObserver: Send {
    fn voices_changed(&mut self, active: &ActiveVoices);
}

impl<F> VoiceObserver for F
where
    F: FnMut(&ActiveVoices) + Send,
{
    fn voices_changed(&mut self, active: &ActiveVoices) {
        self(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(ActiveVoices::default().mean_frequency(), None);
    }

    #[test]
    fn mean_frequency_averages_voices() {
        let active = ActiveVoices {
            voices: vec![('N', 440.0), ('Y', 880.0)],
        };
        assert_eq!(active.mean_frequency(), Some(660.0));
        assert!(active.contains('Y'));
        assert_eq!(active.ids().collect::<Vec<_>>(), vec!['N', 'Y']);
    }
}
