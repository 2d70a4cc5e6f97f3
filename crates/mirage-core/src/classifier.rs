//! Per-frame effect signals: audio level, warning mode and glitch mode.
//!
//! The warning signal is a mouth-aperture heuristic (lip gap relative to face
//! height). It is not expression or emotion recognition.

use crate::landmark::{index, LandmarkSet};
use crate::random::RandomSource;
use crate::state::FrameState;

/// Mouth gap / face height ratio above which warning mode engages.
pub const WARNING_APERTURE_RATIO: f32 = 0.1;
/// Nose displacement per frame (normalized units) that counts as a motion spike.
pub const MOTION_VELOCITY_THRESHOLD: f32 = 0.04;
/// Countdown armed by a motion spike.
pub const MOTION_GLITCH_FRAMES: u32 = 4;
/// Per-frame probability of a spontaneous glitch.
pub const RANDOM_GLITCH_CHANCE: f32 = 0.005;
/// Audio level above which a glitch is forced.
pub const AUDIO_SPIKE_LEVEL: f32 = 1.2;
/// Countdown range for chance and audio triggered glitches.
pub const RANDOM_GLITCH_FRAMES: (u32, u32) = (3, 7);
/// Maximum jitter offset in pixels while glitching.
pub const JITTER_X: f32 = 20.0;
pub const JITTER_Y: f32 = 4.0;

const AUDIO_NOISE_FLOOR: f32 = 10.0;
const AUDIO_SCALE: f32 = 100.0;

/// Signals recomputed every frame and never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedFrameSignals {
    pub audio_level: f32,
    pub is_warning: bool,
    pub is_glitch: bool,
    /// Pixel offset of the glitch pass.
    pub jitter: (f32, f32),
    /// Glitch countdown this frame before its decrement (0 when idle).
    pub glitch_countdown: u32,
}

/// Reduce a frequency-magnitude spectrum to a scalar audio level.
///
/// Mean bin magnitude minus a noise floor of 10, divided by 100. Unbounded
/// above: loud input exceeds 1.0.
pub fn audio_level(spectrum: &[u8]) -> f32 {
    if spectrum.is_empty() {
        return 0.0;
    }
    let sum: u32 = spectrum.iter().map(|&b| u32::from(b)).sum();
    let mean = sum as f32 / spectrum.len() as f32;
    (mean - AUDIO_NOISE_FLOOR).max(0.0) / AUDIO_SCALE
}

/// Mouth aperture heuristic. False when the face height is degenerate.
pub fn detect_warning(landmarks: &LandmarkSet) -> bool {
    let (Some(upper), Some(lower), Some(top), Some(chin)) = (
        landmarks.get(index::UPPER_LIP),
        landmarks.get(index::LOWER_LIP),
        landmarks.get(index::FOREHEAD),
        landmarks.get(index::CHIN),
    ) else {
        return false;
    };
    let mouth_gap = upper.point().distance(lower.point());
    let face_height = top.point().distance(chin.point());
    face_height > 0.0 && mouth_gap / face_height > WARNING_APERTURE_RATIO
}

/// Classify one frame and advance the frame state.
///
/// `landmarks` must already be validated; `None` is a tracking miss, which
/// forgets the previous nose so re-acquisition cannot look like a motion spike.
/// Random draws happen in a fixed order: chance, countdown (if triggered),
/// jitter x, jitter y (if glitching).
pub fn classify(
    landmarks: Option<&LandmarkSet>,
    audio_level: f32,
    state: &mut FrameState,
    rng: &mut dyn RandomSource,
) -> DerivedFrameSignals {
    let mut signals = DerivedFrameSignals {
        audio_level,
        ..Default::default()
    };

    let Some((landmarks, nose)) = landmarks.and_then(|l| l.nose().map(|n| (l, n))) else {
        if state.previous_nose.take().is_some() {
            tracing::debug!("face lost, motion reference cleared");
        }
        return signals;
    };

    signals.is_warning = detect_warning(landmarks);

    if let Some(previous) = state.previous_nose {
        let velocity = nose.distance(previous);
        if velocity > MOTION_VELOCITY_THRESHOLD {
            tracing::debug!(velocity, "motion spike, glitch armed");
            state.glitch_frames_remaining = MOTION_GLITCH_FRAMES;
        }
    }
    state.previous_nose = Some(nose);

    let chance = rng.unit() < RANDOM_GLITCH_CHANCE;
    if chance || audio_level > AUDIO_SPIKE_LEVEL {
        let (lo, hi) = RANDOM_GLITCH_FRAMES;
        state.glitch_frames_remaining = rng.int_inclusive(lo, hi);
        tracing::debug!(
            chance,
            audio_level,
            frames = state.glitch_frames_remaining,
            "glitch re-armed"
        );
    }

    if state.is_glitch_armed() {
        signals.is_glitch = true;
        signals.glitch_countdown = state.glitch_frames_remaining;
        state.glitch_frames_remaining -= 1;
        signals.jitter = (rng.centered(JITTER_X), rng.centered(JITTER_Y));
    }

    signals
}
