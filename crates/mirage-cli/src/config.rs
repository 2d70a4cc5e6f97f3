use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mirage_core::{GenderMode, ThemeKind};

/// Runtime configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Output surface size in pixels (default 1280x720).
    pub width: u32,
    pub height: u32,
    /// Frame rate the landmark source is paced at; 0 runs unpaced.
    pub fps: u32,
    pub theme: ThemeKind,
    pub gender: GenderMode,
    /// Stop after this many frames; 0 runs until interrupted.
    pub frames: u64,
    /// Directory for PNG frames and the final log; unset disables output.
    pub output_dir: Option<PathBuf>,
    /// Write every Nth frame.
    pub output_every: u64,
    /// Seed for glitch, noise and phrase randomness; unset seeds from entropy.
    pub seed: Option<u64>,
    pub analysis_interval: Duration,
    pub analysis_cooldown: Duration,
    /// JSON-lines landmark recording; unset uses the synthetic face.
    pub landmarks: Option<PathBuf>,
    /// JSON edge list for the full tessellation.
    pub tessellation: Option<PathBuf>,
    /// Whether to open the audio source.
    pub audio: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from `MIRAGE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        Self {
            width: env_parse(&lookup, "MIRAGE_WIDTH", 1280),
            height: env_parse(&lookup, "MIRAGE_HEIGHT", 720),
            fps: env_parse(&lookup, "MIRAGE_FPS", 30),
            theme: env_parse(&lookup, "MIRAGE_THEME", ThemeKind::Matrix),
            gender: env_parse(&lookup, "MIRAGE_GENDER", GenderMode::Neutral),
            frames: env_parse(&lookup, "MIRAGE_FRAMES", 0),
            output_dir: path("MIRAGE_OUTPUT_DIR"),
            output_every: env_parse(&lookup, "MIRAGE_OUTPUT_EVERY", 1u64).max(1),
            seed: lookup("MIRAGE_SEED").and_then(|v| v.parse().ok()),
            analysis_interval: Duration::from_secs(env_parse(
                &lookup,
                "MIRAGE_ANALYSIS_INTERVAL_SECS",
                8,
            )),
            analysis_cooldown: Duration::from_secs(env_parse(
                &lookup,
                "MIRAGE_ANALYSIS_COOLDOWN_SECS",
                2,
            )),
            landmarks: path("MIRAGE_LANDMARKS"),
            tessellation: path("MIRAGE_TESSELLATION"),
            audio: lookup("MIRAGE_AUDIO").map(|v| v != "0").unwrap_or(true),
        }
    }
}

fn env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!((c.width, c.height, c.fps), (1280, 720, 30));
        assert_eq!(c.theme, ThemeKind::Matrix);
        assert_eq!(c.gender, GenderMode::Neutral);
        assert_eq!(c.frames, 0);
        assert_eq!(c.output_dir, None);
        assert_eq!(c.output_every, 1);
        assert_eq!(c.analysis_interval, Duration::from_secs(8));
        assert_eq!(c.analysis_cooldown, Duration::from_secs(2));
        assert!(c.audio);
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("MIRAGE_WIDTH", "640"),
            ("MIRAGE_THEME", "golden"),
            ("MIRAGE_GENDER", "female"),
            ("MIRAGE_SEED", "42"),
            ("MIRAGE_AUDIO", "0"),
            ("MIRAGE_OUTPUT_DIR", "/tmp/mirage"),
        ]);
        assert_eq!(c.width, 640);
        assert_eq!(c.theme, ThemeKind::GoldenData);
        assert_eq!(c.gender, GenderMode::FemaleLean);
        assert_eq!(c.seed, Some(42));
        assert!(!c.audio);
        assert_eq!(c.output_dir, Some(PathBuf::from("/tmp/mirage")));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let c = config(&[
            ("MIRAGE_FPS", "fast"),
            ("MIRAGE_THEME", "vapor"),
            ("MIRAGE_OUTPUT_EVERY", "0"),
            ("MIRAGE_LANDMARKS", ""),
        ]);
        assert_eq!(c.fps, 30);
        assert_eq!(c.theme, ThemeKind::Matrix);
        assert_eq!(c.output_every, 1);
        assert_eq!(c.landmarks, None);
    }
}
