//! Status bar widget - current sound settings, knob values and voice counts

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use keysynth::{
    graph::GraphBackend,
    synth::{teardown::WallClock, SynthMode, SynthParameters},
    PolySynth,
};

use crate::panel::Knob;

/// What the status bar shows, copied out of the synth each frame
pub struct Status {
    pub params: SynthParameters,
    pub selected: Knob,
    pub active: usize,
    pub fading: usize,
    pub master_level: f32,
}

impl Status {
    pub fn from_synth<B: GraphBackend, C: WallClock>(
        synth: &PolySynth<B, C>,
        selected: Knob,
    ) -> Self {
        Self {
            params: *synth.params(),
            selected,
            active: synth.active_count(),
            fading: synth.pending_teardowns(),
            master_level: synth.config().master_level,
        }
    }

    fn knob_span(&self, knob: Knob) -> Span<'static> {
        let value = knob.value(&self.params, self.master_level);
        let text = match knob {
            Knob::AmFrequency | Knob::FmFrequency => format!("{} {:.0}", knob.label(), value),
            _ => format!("{} {:.2}", knob.label(), value),
        };

        let style = if knob == self.selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else if knob.mode().is_some_and(|mode| mode != self.params.mode) {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        Span::styled(text, style)
    }
}

pub fn render_status(frame: &mut Frame, area: Rect, status: &Status, sample_rate: f32) {
    let block = Block::default().title(" keysynth ").borders(Borders::ALL);
    let params = &status.params;

    let mut spans = vec![
        Span::styled(
            format!(" {}  ", params.mode.name().to_uppercase()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{}  ", params.waveform.name()),
            Style::default().fg(Color::White),
        ),
    ];
    if params.mode == SynthMode::Additive {
        spans.push(Span::styled(
            format!("{} partials  ", params.additive_partials),
            Style::default().fg(Color::White),
        ));
    }
    spans.extend([
        Span::styled(
            format!("Voices: {}  ", status.active),
            Style::default().fg(if status.active > 0 {
                Color::Green
            } else {
                Color::Yellow
            }),
        ),
        Span::styled(
            format!("Fading: {}  ", status.fading),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("{:.1}kHz  ", sample_rate / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("Master: {:.2}", status.master_level),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    let mut knobs = vec![Span::raw(" ")];
    for knob in Knob::ALL {
        knobs.push(status.knob_span(knob));
        knobs.push(Span::raw("  "));
    }

    let paragraph = Paragraph::new(vec![Line::from(spans), Line::from(knobs)]).block(block);
    frame.render_widget(paragraph, area);
}
