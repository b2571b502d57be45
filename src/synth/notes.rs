/*
Keyboard Layout
===============

Two rows of a computer keyboard laid out like two piano octaves, starting at
middle C (MIDI 60):

    upper octave   2 3   5 6 7          C#5 D#5   F#5 G#5 A#5
                  Q W E R T Y U        C5 D5 E5 F5 G5 A5 B5

    lower octave   S D   G H J          C#4 D#4   F#4 G#4 A#4
                  Z X C V B N M        C4 D4 E4 F4 G4 A4 B4

Frequencies are equal-tempered with A4 (MIDI 69, the N key) at 440 Hz:

    frequency = 440 · 2^((note − 69) / 12)

Anything else on the keyboard is not a note and resolves to `None`.
*/

/// Identifier of a playable key: its upper-case keyboard label.
pub type KeyId = char;

/// Number of playable keys.
pub const KEY_COUNT: usize = 24;

const LOWEST_NOTE: u8 = 60;

/// Key labels in ascending pitch order, C4 through B5.
pub const KEYBOARD: [KeyId; KEY_COUNT] = [
    'Z', 'S', 'X', 'D', 'C', 'V', 'G', 'B', 'H', 'N', 'J', 'M', // C4..B4
    'Q', '2', 'W', '3', 'E', 'R', '5', 'T', '6', 'Y', '7', 'U', // C5..B5
];

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// MIDI note number for a key, if it is one of the playable keys.
pub fn key_to_midi(key: KeyId) -> Option<u8> {
    KEYBOARD
        .iter()
        .position(|&k| k == key)
        .map(|index| LOWEST_NOTE + index as u8)
}

/// Frequency for a key, if it is one of the playable keys.
pub fn key_frequency(key: KeyId) -> Option<f32> {
    key_to_midi(key).map(midi_note_to_freq)
}

/// Whether the key sits on a black piano key.
pub fn is_black_key(key: KeyId) -> bool {
    key_to_midi(key).is_some_and(|note| matches!(note % 12, 1 | 3 | 6 | 8 | 10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_is_concert_a() {
        assert_eq!(key_frequency('N'), Some(440.0));
        assert_eq!(key_frequency('Y'), Some(880.0));
    }

    #[test]
    fn z_is_middle_c() {
        let c4 = key_frequency('Z').unwrap();
        assert!((c4 - 261.6256).abs() < 1e-3, "got {c4}");
        let b5 = key_frequency('U').unwrap();
        assert!((b5 - 987.7666).abs() < 1e-2, "got {b5}");
    }

    #[test]
    fn unmapped_keys_resolve_to_none() {
        assert_eq!(key_frequency('A'), None);
        assert_eq!(key_frequency('z'), None);
        assert_eq!(key_frequency(' '), None);
    }

    #[test]
    fn black_keys_match_piano_layout() {
        let black: Vec<KeyId> = KEYBOARD.into_iter().filter(|&k| is_black_key(k)).collect();
        assert_eq!(black, vec!['S', 'D', 'G', 'H', 'J', '2', '3', '5', '6', '7']);
    }

    #[test]
    fn every_key_is_distinct() {
        let mut keys = KEYBOARD.to_vec();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), KEY_COUNT);
    }
}
