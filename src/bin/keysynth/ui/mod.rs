//! TUI module for keysynth
//!
//! Draws the on-screen keyboard, the voice visualizer and an oscilloscope of
//! the output.

mod keyboard;
mod status;
mod visualizer;
mod waveform;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use rtrb::Consumer;

use keysynth::synth::ActiveVoices;

pub use status::Status;

use keyboard::render_keyboard;
use status::render_status;
use visualizer::render_visualizer;
use waveform::render_waveform;

/// Audio visualization buffer size
pub const VIS_BUFFER_SIZE: usize = 1024;

pub struct UiApp {
    /// Output samples from the audio callback
    audio_rx: Consumer<f32>,
    /// Active-voice snapshots from the synth's observer hook
    voices_rx: Consumer<ActiveVoices>,
    active: ActiveVoices,
    audio_buffer: Vec<f32>,
    sample_rate: f32,
    key_release: bool,
}

impl UiApp {
    pub fn new(
        audio_rx: Consumer<f32>,
        voices_rx: Consumer<ActiveVoices>,
        sample_rate: f32,
        key_release: bool,
    ) -> Self {
        Self {
            audio_rx,
            voices_rx,
            active: ActiveVoices::default(),
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            sample_rate,
            key_release,
        }
    }

    /// Pull whatever the audio callback and the observer produced since the
    /// last frame.
    pub fn poll(&mut self) {
        while let Ok(sample) = self.audio_rx.pop() {
            self.audio_buffer.push(sample);
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }

        // Keep only the latest snapshot
        while let Ok(active) = self.voices_rx.pop() {
            self.active = active;
        }
    }

    pub fn render(&self, frame: &mut Frame, status: &Status) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Status bar
                Constraint::Min(8),    // Visualizer
                Constraint::Length(8), // Keyboard
                Constraint::Length(8), // Waveform
                Constraint::Length(1), // Help bar
            ])
            .split(frame.area());

        render_status(frame, chunks[0], status, self.sample_rate);
        render_visualizer(frame, chunks[1], &self.active);
        render_keyboard(frame, chunks[2], &self.active);
        render_waveform(frame, chunks[3], &self.audio_buffer);

        let release_hint = if self.key_release { "" } else { "  (keys auto-release)" };
        let help = Paragraph::new(format!(
            " [Esc] Quit  [F1-F3] Mode  [ [ ] ] Waveform  [-/=] Partials  [Tab] Knob  [,/.] Adjust{release_hint}"
        ))
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[4]);
    }
}
