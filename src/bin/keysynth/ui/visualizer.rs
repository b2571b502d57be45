//! Voice visualizer - a colored glow sized by how many notes are held
//!
//!   hue      mean frequency 260 Hz → 1000 Hz maps 200° (blue) → 20° (orange)
//!   size     200 + 80 per voice, in nominal 8×16 px terminal cells
//!   opacity  min(0.7, 0.2 + 0.6 per voice), drawn as brightness
//!
//! The glow fades out towards its edge like a radial gradient.

use ratatui::{
    layout::Rect,
    style::Color,
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Circle},
        Block, Borders,
    },
    Frame,
};

use keysynth::synth::ActiveVoices;

const MIN_FREQ: f32 = 260.0;
const MAX_FREQ: f32 = 1000.0;
const RINGS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub hue: f32,
    pub size: f32,
    pub opacity: f32,
}

impl Glow {
    /// `None` when nothing is sounding.
    pub fn from_voices(active: &ActiveVoices) -> Option<Self> {
        let mean = active.mean_frequency()?;
        let count = active.len() as f32;
        Some(Self {
            hue: freq_to_hue(mean),
            size: 200.0 + count * 80.0,
            opacity: (0.2 + count * 0.6).min(0.7),
        })
    }
}

fn freq_to_hue(freq: f32) -> f32 {
    let t = ((freq - MIN_FREQ) / (MAX_FREQ - MIN_FREQ)).clamp(0.0, 1.0);
    200.0 - t * 180.0
}

/// HSL (degrees, fractions) to 8-bit RGB.
fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}

pub fn render_visualizer(frame: &mut Frame, area: Rect, active: &ActiveVoices) {
    let block = Block::default().title(" Voices ").borders(Borders::ALL);
    let inner = block.inner(area);
    let half_width = inner.width as f64 * 4.0;
    let half_height = inner.height as f64 * 8.0;

    let glow = Glow::from_voices(active);
    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([-half_width, half_width])
        .y_bounds([-half_height, half_height])
        .paint(move |ctx| {
            let Some(glow) = glow else {
                return;
            };
            let (r, g, b) = hsl_to_rgb(glow.hue, 0.8, 0.6);
            let radius = glow.size as f64 / 2.0;

            // Outermost ring first so brighter inner rings paint over it
            for ring in (0..RINGS).rev() {
                let fraction = (ring + 1) as f32 / RINGS as f32;
                // Transparent from 70% of the radius outwards
                let intensity = glow.opacity * (1.0 - fraction / 0.7).max(0.08);
                let shade = |v: u8| (v as f32 * intensity).round() as u8;
                ctx.draw(&Circle {
                    x: 0.0,
                    y: 0.0,
                    radius: radius * fraction as f64,
                    color: Color::Rgb(shade(r), shade(g), shade(b)),
                });
            }
        });

    frame.render_widget(canvas, area);
}
