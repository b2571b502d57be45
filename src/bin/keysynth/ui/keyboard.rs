//! On-screen keyboard widget - two octaves, held keys highlighted

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use keysynth::synth::{notes::is_black_key, ActiveVoices, KEYBOARD};

/// Characters per key cell
const CELL: usize = 4;

pub fn render_keyboard(frame: &mut Frame, area: Rect, active: &ActiveVoices) {
    let block = Block::default().title(" Keyboard ").borders(Borders::ALL);

    let mut lines = Vec::new();
    // Each octave is a black-key row above a white-key row
    for octave in KEYBOARD.chunks(12) {
        let (black, white) = rows(octave, active);
        lines.push(Line::from(black));
        lines.push(Line::from(white));
        lines.push(Line::default());
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn rows(octave: &[char], active: &ActiveVoices) -> (Vec<Span<'static>>, Vec<Span<'static>>) {
    let mut black = vec![Span::raw(" ".repeat(CELL / 2))];
    let mut white = Vec::new();

    for (i, &key) in octave.iter().enumerate() {
        let held = active.contains(key);
        if is_black_key(key) {
            let style = if held {
                Style::default().fg(Color::Black).bg(Color::Magenta)
            } else {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            };
            black.push(Span::styled(format!(" {key}  "), style));
        } else {
            let style = if held {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Black).bg(Color::Gray)
            };
            white.push(Span::styled(format!(" {key} "), style));
            white.push(Span::raw(" "));

            // Gap in the black row where the piano has none (after E and B)
            let next_is_white = octave.get(i + 1).map_or(true, |&next| !is_black_key(next));
            if next_is_white {
                black.push(Span::raw(" ".repeat(CELL)));
            }
        }
    }
    (black, white)
}
