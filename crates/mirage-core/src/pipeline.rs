//! Frame pipeline: validate → classify → transform → render.
//!
//! Owns the only cross-frame state (motion reference and glitch countdown) and
//! the random source, so a seeded pipeline replays identically.

use crate::classifier::{self, DerivedFrameSignals};
use crate::geometry;
use crate::landmark::LandmarkSet;
use crate::random::RandomSource;
use crate::render::{RenderFrame, Renderer};
use crate::state::FrameState;
use crate::surface::Surface;
use crate::theme::{GenderMode, ThemeKind};
use crate::topology::MeshTopology;

/// Everything the pipeline needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// Latest face from the tracker; `None` when no face is present.
    pub landmarks: Option<&'a LandmarkSet>,
    /// Latest frequency magnitudes; `None` when audio is unavailable.
    pub spectrum: Option<&'a [u8]>,
    pub theme: ThemeKind,
    pub gender: GenderMode,
    pub time_ms: f64,
}

/// Summary of a processed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub signals: DerivedFrameSignals,
    pub face_present: bool,
}

pub struct FacePipeline<S: Surface, R: RandomSource> {
    state: FrameState,
    renderer: Renderer<S>,
    rng: R,
    topology: MeshTopology,
    frames: u64,
    last_warning: bool,
    last_face: bool,
}

impl<S: Surface, R: RandomSource> FacePipeline<S, R> {
    pub fn new(surface: S, topology: MeshTopology, rng: R) -> Self {
        Self {
            state: FrameState::new(),
            renderer: Renderer::new(surface),
            rng,
            topology,
            frames: 0,
            last_warning: false,
            last_face: false,
        }
    }

    pub fn surface(&self) -> &S {
        self.renderer.surface()
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    pub fn topology(&self) -> &MeshTopology {
        &self.topology
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame. Invalid landmark sets are logged and drawn as "no face".
    pub fn process(&mut self, input: FrameInput<'_>) -> FrameReport {
        self.frames += 1;

        let landmarks = input.landmarks.filter(|set| match set.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(frame = self.frames, error = %e, "discarding landmark set");
                false
            }
        });

        let audio_level = input.spectrum.map_or(0.0, classifier::audio_level);
        let signals = classifier::classify(landmarks, audio_level, &mut self.state, &mut self.rng);

        let geometry = landmarks.map(|set| {
            geometry::transform(
                set,
                input.gender,
                audio_level,
                signals.is_warning,
                &mut self.rng,
            )
        });

        self.renderer.render(&RenderFrame {
            theme: input.theme.theme(),
            signals: &signals,
            geometry: geometry.as_ref(),
            topology: &self.topology,
            spectrum: input.spectrum,
            time_ms: input.time_ms,
        });

        let face_present = landmarks.is_some();
        if face_present != self.last_face {
            tracing::debug!(frame = self.frames, face_present, "tracking changed");
            self.last_face = face_present;
        }
        if signals.is_warning != self.last_warning {
            tracing::debug!(frame = self.frames, warning = signals.is_warning, "warning mode changed");
            self.last_warning = signals.is_warning;
        }

        FrameReport {
            frame: self.frames,
            signals,
            face_present,
        }
    }
}
