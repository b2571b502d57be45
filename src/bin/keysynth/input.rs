//! Keyboard input thread: turns terminal key events into synth messages
//!
//! Terminals without the keyboard enhancement protocol never report key
//! releases, only auto-repeated presses. There a key counts as held while
//! repeats keep arriving and is released once they stop for `HOLD_TIMEOUT`.

use std::{
    collections::HashMap,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rtrb::Producer;
use tracing::warn;

use keysynth::synth::{key_frequency, KeyId, SynthMessage};

use super::panel::Panel;

/// Longer than a typical initial key-repeat delay
pub const HOLD_TIMEOUT: Duration = Duration::from_millis(600);

const POLL: Duration = Duration::from_millis(10);

pub fn spawn(
    tx: Producer<SynthMessage>,
    quit: Arc<AtomicBool>,
    key_release: bool,
    panel: Panel,
) -> JoinHandle<io::Result<()>> {
    thread::spawn(move || {
        let mut input = KeyInput::new(tx, key_release, panel);
        let result = (|| -> io::Result<()> {
            while !quit.load(Ordering::Relaxed) {
                if event::poll(POLL)? && input.handle_event(event::read()?, Instant::now()) {
                    break;
                }
                input.expire(Instant::now());
            }
            Ok(())
        })();
        quit.store(true, Ordering::Relaxed);
        result
    })
}

pub struct KeyInput {
    tx: Producer<SynthMessage>,
    key_release: bool,
    held: HashMap<KeyId, Instant>,
    panel: Panel,
}

impl KeyInput {
    pub fn new(tx: Producer<SynthMessage>, key_release: bool, panel: Panel) -> Self {
        Self {
            tx,
            key_release,
            held: HashMap::new(),
            panel,
        }
    }

    /// Returns `true` when the user asked to quit.
    pub fn handle_event(&mut self, event: Event, now: Instant) -> bool {
        match event {
            Event::Key(key) => return self.handle_key(key, now),
            // Stuck-note prevention
            Event::FocusLost => {
                self.held.clear();
                self.send(SynthMessage::Panic);
            }
            _ => {}
        }
        false
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        let quit = key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
        if quit {
            return true;
        }

        if let Some(note) = note_key(key.code) {
            match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => {
                    if self.held.insert(note, now).is_none() {
                        self.send(SynthMessage::NoteOn { key: note });
                    }
                }
                KeyEventKind::Release => {
                    if self.held.remove(&note).is_some() {
                        self.send(SynthMessage::NoteOff { key: note });
                    }
                }
            }
            return false;
        }

        if key.kind != KeyEventKind::Release {
            if let Some(change) = self.panel.handle_key(key.code) {
                self.send(SynthMessage::Param(change));
            }
        }
        false
    }

    /// Release keys whose repeats stopped arriving.
    pub fn expire(&mut self, now: Instant) {
        if self.key_release {
            return;
        }
        let expired: Vec<KeyId> = self
            .held
            .iter()
            .filter(|&(_, &seen)| now.duration_since(seen) >= HOLD_TIMEOUT)
            .map(|(&key, _)| key)
            .collect();
        for key in expired {
            self.held.remove(&key);
            self.send(SynthMessage::NoteOff { key });
        }
    }

    fn send(&mut self, message: SynthMessage) {
        if self.tx.push(message).is_err() {
            warn!(?message, "control queue full, dropping message");
        }
    }
}

fn note_key(code: KeyCode) -> Option<KeyId> {
    match code {
        KeyCode::Char(c) => {
            let key = c.to_ascii_uppercase();
            key_frequency(key).map(|_| key)
        }
        _ => None,
    }
}
