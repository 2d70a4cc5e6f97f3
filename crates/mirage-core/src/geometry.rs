//! Face normalisation and stylised morphing.
//!
//! Scale and stretch bring the face to a fixed display height; the per-point
//! morph reshapes the jaw according to the gender mode, then adds audio and
//! warning noise. All values stay in normalized frame space; the renderer maps
//! them to pixels.

use crate::landmark::{Landmark, LandmarkSet, Point};
use crate::random::RandomSource;
use crate::theme::GenderMode;

/// Fraction of the frame height the face should occupy.
pub const DESIRED_FACE_HEIGHT: f32 = 0.55;
/// Lower bound on the measured face height, so collapsed landmarks cannot blow up the scale.
pub const MIN_FACE_HEIGHT: f32 = 0.1;
/// Audio level below which vertices are not shaken.
pub const AUDIO_NOISE_GATE: f32 = 0.05;

const AUDIO_SCALE_GAIN: f32 = 0.1;
const AUDIO_NOISE: f32 = 0.005;
const WARNING_NOISE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    fn around(points: &[Landmark]) -> Self {
        points.iter().fold(
            BoundingBox {
                min_x: f32::INFINITY,
                min_y: f32::INFINITY,
                max_x: f32::NEG_INFINITY,
                max_y: f32::NEG_INFINITY,
            },
            |b, p| BoundingBox {
                min_x: b.min_x.min(p.x),
                min_y: b.min_y.min(p.y),
                max_x: b.max_x.max(p.x),
                max_y: b.max_y.max(p.y),
            },
        )
    }
}

/// Anisotropic elongation applied on top of the isotropic scale.
pub fn stretch_for(gender: GenderMode) -> (f32, f32) {
    match gender {
        GenderMode::Neutral => (0.85, 1.35),
        GenderMode::MaleLean => (0.95, 1.25),
        GenderMode::FemaleLean => (0.82, 1.30),
    }
}

/// Isotropic display scale for a face of the given bounding-box height.
pub fn display_scale(face_height: f32, audio_level: f32) -> f32 {
    let audio_scale = 1.0 + audio_level * AUDIO_SCALE_GAIN;
    DESIRED_FACE_HEIGHT / face_height.max(MIN_FACE_HEIGHT) * audio_scale
}

/// Geometry for a single frame's draw calls.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedGeometry {
    /// Bounding box of the raw landmarks; places the corner brackets.
    pub bounds: BoundingBox,
    /// Mean of the raw landmarks; origin of the display transform.
    pub centroid: Point,
    pub scale: f32,
    pub stretch_x: f32,
    pub stretch_y: f32,
    /// Morphed landmarks, same length and index order as the input.
    pub landmarks: LandmarkSet,
}

/// Horizontal jaw reshaping for one point. No-op above the nose and in neutral mode.
pub fn morph_x(x: f32, y: f32, nose_y: f32, centroid_x: f32, gender: GenderMode) -> f32 {
    if y < nose_y {
        return x;
    }
    let dist_from_center = x - centroid_x;
    match gender {
        GenderMode::Neutral => x,
        GenderMode::FemaleLean => {
            let factor = (y - nose_y) * 1.5;
            if factor > 0.0 {
                centroid_x + dist_from_center * (1.0 - factor * 0.3)
            } else {
                x
            }
        }
        GenderMode::MaleLean => {
            let factor = (y - nose_y) * 1.2;
            if factor > 0.0 {
                centroid_x + dist_from_center * (1.0 + factor * 0.2)
            } else {
                x
            }
        }
    }
}

/// Compute bounds, centroid, scale and the morphed landmark set.
///
/// `landmarks` must be validated and non-empty. Noise draws per point are
/// audio x, audio y (when audio is above the gate), then warning x, warning y.
pub fn transform(
    landmarks: &LandmarkSet,
    gender: GenderMode,
    audio_level: f32,
    is_warning: bool,
    rng: &mut dyn RandomSource,
) -> TransformedGeometry {
    let points = &landmarks.points;
    let bounds = BoundingBox::around(points);

    let n = points.len().max(1) as f32;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
    let centroid = Point::new(sum_x / n, sum_y / n);

    let nose_y = landmarks.nose().map_or(centroid.y, |p| p.y);
    let audio_noise = audio_level > AUDIO_NOISE_GATE;

    let morphed = points
        .iter()
        .map(|p| {
            let mut out = Landmark::new(morph_x(p.x, p.y, nose_y, centroid.x, gender), p.y, p.z);
            if audio_noise {
                out.x += rng.centered(AUDIO_NOISE * audio_level);
                out.y += rng.centered(AUDIO_NOISE * audio_level);
            }
            if is_warning {
                out.x += rng.centered(WARNING_NOISE);
                out.y += rng.centered(WARNING_NOISE);
            }
            out
        })
        .collect();

    let (stretch_x, stretch_y) = stretch_for(gender);

    TransformedGeometry {
        bounds,
        centroid,
        scale: display_scale(bounds.height(), audio_level),
        stretch_x,
        stretch_y,
        landmarks: LandmarkSet::new(morphed),
    }
}
