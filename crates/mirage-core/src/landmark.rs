//! Normalized facial landmarks as delivered by the tracker.
//!
//! Coordinates are normalized to the camera frame: `x` and `y` lie in `[0, 1]`
//! relative to frame width/height, `z` is relative depth as supplied by the
//! tracker. Indices are anatomically stable across frames.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of points produced by the face mesh tracker.
pub const MESH_POINT_COUNT: usize = 468;

/// Tolerance band for `x` and `y`. Partly visible faces overshoot `[0, 1]` a little.
pub const COORD_MIN: f32 = -1.0;
pub const COORD_MAX: f32 = 2.0;

/// Named landmark indices used by the classifier and renderer.
pub mod index {
    pub const NOSE_TIP: usize = 1;
    pub const UPPER_LIP: usize = 13;
    pub const LOWER_LIP: usize = 14;
    pub const FOREHEAD: usize = 10;
    pub const CHIN: usize = 152;
    pub const RIGHT_EYE_OUTER: usize = 33;
    pub const RIGHT_EYE_INNER: usize = 133;
    pub const LEFT_EYE_INNER: usize = 362;
    pub const LEFT_EYE_OUTER: usize = 263;
    pub const MOUTH_RIGHT: usize = 61;
    pub const MOUTH_LEFT: usize = 291;
    pub const JAW_RIGHT: usize = 234;
    pub const JAW_LEFT: usize = 454;
    pub const JAW_LOWER_RIGHT: usize = 58;
    pub const JAW_LOWER_LEFT: usize = 288;

    /// Key features drawn as large diamond markers.
    pub const KEY_FEATURES: [usize; 9] = [
        NOSE_TIP,
        RIGHT_EYE_OUTER,
        RIGHT_EYE_INNER,
        LEFT_EYE_INNER,
        LEFT_EYE_OUTER,
        MOUTH_RIGHT,
        MOUTH_LEFT,
        FOREHEAD,
        CHIN,
    ];

    /// Named jaw contour points drawn as small diamonds in addition to every 10th index.
    pub const JAW_CONTOUR: [usize; 4] = [JAW_RIGHT, JAW_LEFT, JAW_LOWER_RIGHT, JAW_LOWER_LEFT];

    /// Highest index any named feature refers to; a usable set must contain it.
    pub const MAX_NAMED: usize = JAW_LEFT;
}

#[derive(Error, Debug, PartialEq)]
pub enum LandmarkError {
    #[error("landmark set has {got} points, at least {needed} required")]
    TooFewPoints { got: usize, needed: usize },
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
    #[error("landmark {index} lies outside the frame tolerance band")]
    OutOfRange { index: usize },
}

/// A 2D point in normalized frame space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A single tracked anatomical point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    fn in_band(&self) -> bool {
        (COORD_MIN..=COORD_MAX).contains(&self.x) && (COORD_MIN..=COORD_MAX).contains(&self.y)
    }
}

impl From<[f32; 3]> for Landmark {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z]
    }
}

/// An index-stable sequence of landmarks for one face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    pub points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    /// Position of the nose tip, if present.
    pub fn nose(&self) -> Option<Point> {
        self.get(index::NOSE_TIP).map(Landmark::point)
    }

    /// Check that every named feature index resolves, all coordinates are
    /// finite and `x`/`y` stay within [`COORD_MIN`, `COORD_MAX`].
    ///
    /// A set failing this check is treated as "no face" for the frame.
    pub fn validate(&self) -> Result<(), LandmarkError> {
        let needed = index::MAX_NAMED + 1;
        if self.points.len() < needed {
            return Err(LandmarkError::TooFewPoints {
                got: self.points.len(),
                needed,
            });
        }
        if let Some(index) = self.points.iter().position(|p| !p.is_finite()) {
            return Err(LandmarkError::NonFinite { index });
        }
        if let Some(index) = self.points.iter().position(|p| !p.in_band()) {
            return Err(LandmarkError::OutOfRange { index });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_short_set() {
        let set = LandmarkSet::new(vec![Landmark::default(); 100]);
        assert_eq!(
            set.validate(),
            Err(LandmarkError::TooFewPoints {
                got: 100,
                needed: 455
            })
        );
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); MESH_POINT_COUNT];
        points[200].y = f32::NAN;
        let err = LandmarkSet::new(points).validate().unwrap_err();
        assert_eq!(err, LandmarkError::NonFinite { index: 200 });
    }

    #[test]
    fn test_validate_rejects_far_off_frame() {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); MESH_POINT_COUNT];
        points[338].x = 1.0e6;
        let err = LandmarkSet::new(points).validate().unwrap_err();
        assert_eq!(err, LandmarkError::OutOfRange { index: 338 });
    }

    #[test]
    fn test_validate_tolerates_slight_overshoot() {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); MESH_POINT_COUNT];
        points[10] = Landmark::new(-0.2, 1.3, -40.0);
        assert!(LandmarkSet::new(points).validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_full_mesh() {
        let set = LandmarkSet::new(vec![Landmark::new(0.5, 0.5, 0.0); MESH_POINT_COUNT]);
        assert!(set.validate().is_ok());
        assert_eq!(set.nose(), Some(Point::new(0.5, 0.5)));
    }

    #[test]
    fn test_landmark_json_shape() {
        let set: LandmarkSet = serde_json::from_str("[[0.1, 0.2, -0.3], [1.0, 0.0, 0.0]]").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.points[0], Landmark::new(0.1, 0.2, -0.3));
    }

    #[test]
    fn test_point_distance() {
        let d = Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0));
        assert!((d - 5.0).abs() < 1e-6);
    }
}
