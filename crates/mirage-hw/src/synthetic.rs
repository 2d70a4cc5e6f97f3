//! Procedural face and spectrum sources.
//!
//! The face follows the tracker's index conventions for every named feature
//! and edge group, so the built-in topology draws a recognisable outline. It
//! sways slowly, opens its mouth, jerks and drops out on fixed cycles, which
//! exercises every branch of the classifier.

use std::f32::consts::{PI, TAU};
use std::ops::ControlFlow;

use mirage_core::landmark::index;
use mirage_core::topology::{self, Edge};
use mirage_core::{Landmark, LandmarkSet, MeshTopology, MESH_POINT_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::source::{AudioSource, FrameCallback, FramePacer, LandmarkSource, SourceError};

/// Frame rate assumed for cycle timing when the source runs unpaced.
const NOMINAL_FPS: u32 = 30;

const FACE_RX: f32 = 0.15;
const FACE_RY: f32 = 0.27;
const TREMOR: f32 = 0.0015;

/// Cycle lengths and windows in frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceScript {
    pub mouth_cycle: u64,
    pub mouth_open: (u64, u64),
    pub jerk_cycle: u64,
    pub jerk_at: u64,
    pub jerk_offset: f32,
    pub dropout_cycle: u64,
    pub dropout: (u64, u64),
}

impl Default for FaceScript {
    fn default() -> Self {
        Self {
            mouth_cycle: 240,
            mouth_open: (180, 216),
            jerk_cycle: 150,
            jerk_at: 75,
            jerk_offset: 0.06,
            dropout_cycle: 300,
            dropout: (280, 292),
        }
    }
}

impl FaceScript {
    fn in_window(frame: u64, cycle: u64, (start, end): (u64, u64)) -> bool {
        cycle > 0 && (start..end).contains(&(frame % cycle))
    }

    pub fn mouth_open(&self, frame: u64) -> bool {
        Self::in_window(frame, self.mouth_cycle, self.mouth_open)
    }

    pub fn jerk(&self, frame: u64) -> bool {
        self.jerk_cycle > 0 && frame % self.jerk_cycle == self.jerk_at
    }

    pub fn dropped(&self, frame: u64) -> bool {
        Self::in_window(frame, self.dropout_cycle, self.dropout)
    }
}

/// Split an edge list into polylines wherever consecutive edges do not join.
fn chains(edges: &[Edge]) -> Vec<Vec<usize>> {
    let mut out: Vec<Vec<usize>> = Vec::new();
    for &(a, b) in edges {
        match out.last_mut() {
            Some(chain) if chain.last() == Some(&a) => chain.push(b),
            _ => out.push(vec![a, b]),
        }
    }
    out
}

/// Face-local offset of each placed index, relative to the face centre.
type Layout = Vec<Option<(f32, f32)>>;

/// Lay `chain` along an arc from `from` to `to`, bulging by `bulge` (positive is down).
fn place_arc(layout: &mut Layout, chain: &[usize], from: (f32, f32), to: (f32, f32), bulge: f32) {
    let last = chain.len().saturating_sub(1).max(1) as f32;
    for (k, &i) in chain.iter().enumerate() {
        let s = k as f32 / last;
        let x = from.0 + (to.0 - from.0) * s;
        let y = from.1 + (to.1 - from.1) * s + bulge * (PI * s).sin();
        if let Some(slot) = layout.get_mut(i) {
            *slot = Some((x, y));
        }
    }
}

fn base_layout(mouth_open: bool) -> Layout {
    let mut layout: Layout = vec![None; MESH_POINT_COUNT];

    // Outline, clockwise from the forehead.
    if let Some(oval) = chains(topology::FACE_OVAL).first() {
        let n = oval.len().saturating_sub(1).max(1);
        for (k, &i) in oval.iter().take(n).enumerate() {
            let theta = k as f32 / n as f32 * TAU;
            layout[i] = Some((FACE_RX * theta.sin(), -FACE_RY * theta.cos()));
        }
    }

    // Lower lid then upper lid, outer corner to inner corner.
    for (edges, outer, inner) in [
        (topology::RIGHT_EYE, -0.095, -0.035),
        (topology::LEFT_EYE, 0.095, 0.035),
    ] {
        for (chain, bulge) in chains(edges).iter().zip([0.012, -0.014]) {
            place_arc(&mut layout, chain, (outer, -0.06), (inner, -0.06), bulge);
        }
    }

    for (edges, outer, inner) in [
        (topology::RIGHT_EYEBROW, -0.11, -0.03),
        (topology::LEFT_EYEBROW, 0.11, 0.03),
    ] {
        for (chain, lift) in chains(edges).iter().zip([-0.095, -0.105]) {
            place_arc(&mut layout, chain, (outer, lift), (inner, lift), -0.012);
        }
    }

    // Outer lower, outer upper, inner lower, inner upper.
    let inner_half = if mouth_open { 0.035 } else { 0.002 };
    let mouth_y = 0.12;
    let lip_chains = chains(topology::LIPS);
    let lips = [
        (-0.05, 0.05, 0.018 + inner_half),
        (-0.05, 0.05, -0.018 - inner_half * 0.3),
        (-0.04, 0.04, inner_half),
        (-0.04, 0.04, -inner_half),
    ];
    for (chain, (left, right, bulge)) in lip_chains.iter().zip(lips) {
        place_arc(&mut layout, chain, (left, mouth_y), (right, mouth_y), bulge);
    }

    layout[index::NOSE_TIP] = Some((0.0, 0.02));
    if mouth_open {
        layout[index::CHIN] = Some((0.0, FACE_RY + 0.03));
    }

    // Unplaced points fill the face on a sunflower spiral.
    let free: Vec<usize> = (0..MESH_POINT_COUNT).filter(|&i| layout[i].is_none()).collect();
    let n = free.len().max(1) as f32;
    for (j, &i) in free.iter().enumerate() {
        let r = ((j as f32 + 0.5) / n).sqrt() * 0.85;
        let theta = j as f32 * 2.399_963;
        layout[i] = Some((FACE_RX * r * theta.sin(), FACE_RY * r * theta.cos()));
    }

    layout
}

/// A procedural talking head.
pub struct SyntheticFace {
    script: FaceScript,
    pacer: FramePacer,
    rng: StdRng,
    fps: u32,
    frame: u64,
    closed: Vec<(f32, f32)>,
    open: Vec<(f32, f32)>,
    topology: MeshTopology,
}

impl SyntheticFace {
    pub fn new(fps: u32, seed: u64) -> Self {
        Self::with_script(fps, seed, FaceScript::default())
    }

    pub fn with_script(fps: u32, seed: u64, script: FaceScript) -> Self {
        let flatten = |layout: Layout| -> Vec<(f32, f32)> {
            layout.into_iter().map(Option::unwrap_or_default).collect()
        };
        let closed = flatten(base_layout(false));
        let rest = LandmarkSet::new(
            closed
                .iter()
                .map(|&(dx, dy)| Landmark::new(0.5 + dx, 0.5 + dy, 0.0))
                .collect(),
        );
        let topology = MeshTopology::triangulated(&rest);
        tracing::info!(fps, seed, edges = topology.tessellation.len(), "synthetic face source opened");
        Self {
            script,
            pacer: FramePacer::new(fps),
            rng: StdRng::seed_from_u64(seed),
            fps,
            frame: 0,
            closed,
            open: flatten(base_layout(true)),
            topology,
        }
    }

    /// Produce the next frame, advancing the script clock.
    pub fn next_frame(&mut self) -> Option<LandmarkSet> {
        let frame = self.frame;
        self.frame += 1;

        if self.script.dropped(frame) {
            return None;
        }

        let rate = if self.fps == 0 { NOMINAL_FPS } else { self.fps };
        let t = frame as f32 / rate as f32;
        let mut cx = 0.5 + 0.02 * (0.9 * t).sin();
        let cy = 0.5 + 0.01 * (0.6 * t).sin();
        if self.script.jerk(frame) {
            cx += self.script.jerk_offset;
        }

        let layout = if self.script.mouth_open(frame) {
            &self.open
        } else {
            &self.closed
        };
        let points = layout
            .iter()
            .map(|&(dx, dy)| {
                let tx = self.rng.gen_range(-TREMOR..TREMOR);
                let ty = self.rng.gen_range(-TREMOR..TREMOR);
                Landmark::new(cx + dx + tx, cy + dy + ty, 0.0)
            })
            .collect();
        Some(LandmarkSet::new(points))
    }
}

impl LandmarkSource for SyntheticFace {
    fn name(&self) -> &str {
        "synthetic"
    }

    /// Tessellation of the rest pose.
    fn topology(&self) -> MeshTopology {
        self.topology.clone()
    }

    fn subscribe(&mut self, on_frame: &mut FrameCallback<'_>) -> Result<(), SourceError> {
        loop {
            self.pacer.wait();
            let face = self.next_frame();
            if on_frame(face.as_ref()).is_break() {
                return Ok(());
            }
        }
    }
}

impl Drop for SyntheticFace {
    fn drop(&mut self) {
        tracing::info!(frames = self.frame, "synthetic face source released");
    }
}

/// Number of bins a 256-point transform window yields.
pub const SPECTRUM_BINS: usize = 128;

/// A procedural microphone: syllable-rate bursts with a periodic shout.
pub struct SyntheticSpectrum {
    rng: StdRng,
    bins: Vec<u8>,
    polls: u64,
    shout_cycle: u64,
    shout_len: u64,
}

impl SyntheticSpectrum {
    pub fn new(seed: u64) -> Self {
        tracing::info!(seed, bins = SPECTRUM_BINS, "synthetic audio source opened");
        Self {
            rng: StdRng::seed_from_u64(seed),
            bins: vec![0; SPECTRUM_BINS],
            polls: 0,
            shout_cycle: 300,
            shout_len: 12,
        }
    }

    fn loudness(&self) -> f32 {
        let t = self.polls as f32 / NOMINAL_FPS as f32;
        let phrase = (0.5 + 0.5 * (TAU * 0.25 * t).sin()).powi(2);
        let syllable = 0.5 + 0.5 * (TAU * 4.0 * t).sin();
        phrase * syllable
    }
}

impl AudioSource for SyntheticSpectrum {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn poll(&mut self) -> &[u8] {
        let shouting = self.shout_cycle > 0 && self.polls % self.shout_cycle < self.shout_len;
        let loudness = self.loudness();
        for (i, bin) in self.bins.iter_mut().enumerate() {
            let magnitude = if shouting {
                230.0 + self.rng.gen_range(0.0..25.0)
            } else {
                loudness * 200.0 * (-(i as f32) / 30.0).exp() + self.rng.gen_range(0.0..8.0)
            };
            *bin = magnitude.clamp(0.0, 255.0) as u8;
        }
        self.polls += 1;
        &self.bins
    }
}

impl Drop for SyntheticSpectrum {
    fn drop(&mut self) {
        tracing::info!(polls = self.polls, "synthetic audio source released");
    }
}
