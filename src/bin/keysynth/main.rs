//! keysynth - play the computer keyboard like two octaves of piano
//!
//! Run with: cargo run
//!
//! Set `KEYSYNTH_LOG=keysynth.log` to write engine logs to a file; the
//! terminal itself belongs to the UI.

mod app;
mod input;
mod panel;
mod ui;

use std::{env, fs::File, sync::Mutex};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use keysynth::EngineConfig;
use tracing::Level;

use app::KeySynth;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    init_logging()?;

    KeySynth::new(EngineConfig::default()).run()
}

fn init_logging() -> EyreResult<()> {
    let Some(path) = env::var_os("KEYSYNTH_LOG") else {
        return Ok(());
    };
    let file = File::create(&path)
        .wrap_err_with(|| format!("failed to create log file {}", path.to_string_lossy()))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(Level::DEBUG)
        .init();
    Ok(())
}
