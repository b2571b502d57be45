//! KeySynth - audio setup and the control loop

use std::{
    io::stdout,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::{
    event::{
        DisableFocusChange, EnableFocusChange, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use rtrb::RingBuffer;
use tracing::{info, warn};

use keysynth::{
    synth::{ActiveVoices, SynthMessage},
    EngineConfig, PolySynth, RenderGraph, SharedGraph, MAX_BLOCK_SIZE,
};

use super::{
    input,
    panel::{KnobCursor, Panel},
    ui::{Status, UiApp, VIS_BUFFER_SIZE},
};

/// How often the control loop drains input, runs teardowns and redraws
const FRAME: Duration = Duration::from_millis(16);

/// Main application
pub struct KeySynth {
    config: EngineConfig,
}

impl KeySynth {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Run the application (takes over the terminal, plays audio)
    pub fn run(self) -> EyreResult<()> {
        // Set up audio
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let graph = SharedGraph::new(RenderGraph::new(sample_rate));
        let mut synth =
            PolySynth::new(graph.clone(), self.config).wrap_err("failed to set up output stage")?;

        // Visualizer feed: active-voice snapshots from the observer hook
        let (mut voices_tx, voices_rx) = RingBuffer::<ActiveVoices>::new(64);
        synth.set_observer(move |active: &ActiveVoices| {
            let _ = voices_tx.push(active.clone());
        });

        // Oscilloscope feed
        let (mut audio_tx, audio_rx) = RingBuffer::<f32>::new(VIS_BUFFER_SIZE * 4);
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut render_buf[..frames_to_render];
                    graph.render(block);

                    // Copy to output (mono to all channels)
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = s;
                        }
                        let _ = audio_tx.push(s);
                    }

                    frames_written += frames_to_render;
                }
            },
            |err| warn!(%err, "audio stream error"),
            None,
        )?;
        stream.play()?;
        info!(sample_rate, channels, "audio running");

        // Without release events keys can only time out
        let key_release = supports_keyboard_enhancement().unwrap_or(false);
        let mut terminal = ratatui::init();
        if key_release {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        execute!(stdout(), EnableFocusChange)?;

        let (msg_tx, mut msg_rx) = RingBuffer::<SynthMessage>::new(256);
        let quit = Arc::new(AtomicBool::new(false));
        let cursor = KnobCursor::default();
        let panel = Panel::new(&self.config, cursor.clone());
        let input = input::spawn(msg_tx, Arc::clone(&quit), key_release, panel);

        let mut ui = UiApp::new(audio_rx, voices_rx, sample_rate, key_release);
        let result = (|| -> EyreResult<()> {
            while !quit.load(Ordering::Relaxed) {
                synth.process_messages(&mut msg_rx);
                synth.tick();

                ui.poll();
                let status = Status::from_synth(&synth, cursor.get());
                terminal.draw(|frame| ui.render(frame, &status))?;

                std::thread::sleep(FRAME);
            }
            Ok(())
        })();

        quit.store(true, Ordering::Relaxed);
        synth.panic();

        if key_release {
            let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout(), DisableFocusChange);
        ratatui::restore();

        match input.join() {
            Ok(input_result) => input_result.wrap_err("input thread failed")?,
            Err(_) => return Err(eyre!("input thread panicked")),
        }
        result
    }
}
