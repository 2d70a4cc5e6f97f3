use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use mirage_core::{GenderMode, ThemeKind};

use crate::config::Config;

/// Real-time stylised face mesh visualiser.
///
/// Flags override the matching MIRAGE_* environment variables.
#[derive(Parser, Debug, Default)]
#[command(name = "mirage", version, about, long_about = None)]
pub struct Args {
    /// Output width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Landmark frame rate (0 = unpaced)
    #[arg(long)]
    pub fps: Option<u32>,

    /// Colour theme (matrix, cyber_punk, golden_data)
    #[arg(long)]
    pub theme: Option<ThemeKind>,

    /// Avatar morph mode (neutral, female, male)
    #[arg(long)]
    pub gender: Option<GenderMode>,

    /// Stop after N frames (0 = run until Ctrl-C)
    #[arg(long)]
    pub frames: Option<u64>,

    /// Write PNG frames and the session log here
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write every Nth frame
    #[arg(long, value_name = "N")]
    pub output_every: Option<u64>,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Replay landmarks from a JSON-lines recording
    #[arg(long, value_name = "FILE")]
    pub landmarks: Option<PathBuf>,

    /// Load the full tessellation from a JSON edge list
    #[arg(long, value_name = "FILE")]
    pub tessellation: Option<PathBuf>,

    /// Run without the audio source
    #[arg(long)]
    pub no_audio: bool,

    /// Seconds between automatic analyses
    #[arg(long, value_name = "SECS")]
    pub analysis_interval: Option<u64>,
}

impl Args {
    pub fn apply(self, config: &mut Config) {
        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(v) = self.height {
            config.height = v;
        }
        if let Some(v) = self.fps {
            config.fps = v;
        }
        if let Some(v) = self.theme {
            config.theme = v;
        }
        if let Some(v) = self.gender {
            config.gender = v;
        }
        if let Some(v) = self.frames {
            config.frames = v;
        }
        if self.output_dir.is_some() {
            config.output_dir = self.output_dir;
        }
        if let Some(v) = self.output_every {
            config.output_every = v.max(1);
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.landmarks.is_some() {
            config.landmarks = self.landmarks;
        }
        if self.tessellation.is_some() {
            config.tessellation = self.tessellation;
        }
        if self.no_audio {
            config.audio = false;
        }
        if let Some(secs) = self.analysis_interval {
            config.analysis_interval = Duration::from_secs(secs.max(1));
        }
    }
}
