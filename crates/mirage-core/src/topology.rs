//! Mesh adjacency: which landmark pairs are joined by strokes.
//!
//! Feature groups use the face mesh tracker's fixed index conventions and are
//! built in. The dense tessellation is tracker-specific: it is loaded from a
//! JSON edge list, or derived by triangulating a reference pose of the face.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::landmark::{LandmarkSet, Point};

/// A directed stroke between two landmark indices.
pub type Edge = (usize, usize);

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("failed to read tessellation file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tessellation file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("edge ({0}, {1}) references a landmark beyond the mesh ({2} points)")]
    IndexOutOfRange(usize, usize, usize),
}

pub const LIPS: &[Edge] = &[
    (61, 146), (146, 91), (91, 181), (181, 84), (84, 17), (17, 314), (314, 405), (405, 321),
    (321, 375), (375, 291), (61, 185), (185, 40), (40, 39), (39, 37), (37, 0), (0, 267),
    (267, 269), (269, 270), (270, 409), (409, 291), (78, 95), (95, 88), (88, 178), (178, 87),
    (87, 14), (14, 317), (317, 402), (402, 318), (318, 324), (324, 308), (78, 191), (191, 80),
    (80, 81), (81, 82), (82, 13), (13, 312), (312, 311), (311, 310), (310, 415), (415, 308),
];

pub const LEFT_EYE: &[Edge] = &[
    (263, 249), (249, 390), (390, 373), (373, 374), (374, 380), (380, 381), (381, 382),
    (382, 362), (263, 466), (466, 388), (388, 387), (387, 386), (386, 385), (385, 384),
    (384, 398), (398, 362),
];

pub const LEFT_EYEBROW: &[Edge] = &[
    (276, 283), (283, 282), (282, 295), (295, 285), (300, 293), (293, 334), (334, 296),
    (296, 336),
];

pub const RIGHT_EYE: &[Edge] = &[
    (33, 7), (7, 163), (163, 144), (144, 145), (145, 153), (153, 154), (154, 155), (155, 133),
    (33, 246), (246, 161), (161, 160), (160, 159), (159, 158), (158, 157), (157, 173),
    (173, 133),
];

pub const RIGHT_EYEBROW: &[Edge] = &[
    (46, 53), (53, 52), (52, 65), (65, 55), (70, 63), (63, 105), (105, 66), (66, 107),
];

pub const FACE_OVAL: &[Edge] = &[
    (10, 338), (338, 297), (297, 332), (332, 284), (284, 251), (251, 389), (389, 356),
    (356, 454), (454, 323), (323, 361), (361, 288), (288, 397), (397, 365), (365, 379),
    (379, 378), (378, 400), (400, 377), (377, 152), (152, 148), (148, 176), (176, 149),
    (149, 150), (150, 136), (136, 172), (172, 58), (58, 132), (132, 93), (93, 234),
    (234, 127), (127, 162), (162, 21), (21, 54), (54, 103), (103, 67), (67, 109), (109, 10),
];

/// Edge lists for the full mesh and each feature group.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshTopology {
    pub tessellation: Vec<Edge>,
    pub right_eye: Vec<Edge>,
    pub left_eye: Vec<Edge>,
    pub right_eyebrow: Vec<Edge>,
    pub left_eyebrow: Vec<Edge>,
    pub lips: Vec<Edge>,
}

impl Default for MeshTopology {
    /// Built-in feature groups, with the face oval standing in for the tessellation
    /// until a reference pose or edge list is available.
    fn default() -> Self {
        Self {
            tessellation: FACE_OVAL.to_vec(),
            right_eye: RIGHT_EYE.to_vec(),
            left_eye: LEFT_EYE.to_vec(),
            right_eyebrow: RIGHT_EYEBROW.to_vec(),
            left_eyebrow: LEFT_EYEBROW.to_vec(),
            lips: LIPS.to_vec(),
        }
    }
}

impl MeshTopology {
    pub fn with_tessellation(mut self, edges: Vec<Edge>) -> Self {
        self.tessellation = edges;
        self
    }

    /// Built-in feature groups over a Delaunay tessellation of `pose`.
    ///
    /// Falls back to the default when the pose yields no triangles.
    pub fn triangulated(pose: &LandmarkSet) -> Self {
        let points: Vec<Point> = pose.points.iter().map(|p| p.point()).collect();
        let edges = triangulate(&points);
        if edges.is_empty() {
            tracing::warn!(points = points.len(), "reference pose is degenerate, keeping face oval");
            return Self::default();
        }
        tracing::debug!(points = points.len(), edges = edges.len(), "tessellation triangulated");
        Self::default().with_tessellation(edges)
    }

    /// Load a tessellation from a JSON array of `[a, b]` pairs.
    pub fn load_tessellation(self, path: &Path) -> Result<Self, TopologyError> {
        let content = std::fs::read_to_string(path).map_err(|source| TopologyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let edges: Vec<Edge> =
            serde_json::from_str(&content).map_err(|source| TopologyError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(path = %path.display(), edges = edges.len(), "tessellation loaded");
        Ok(self.with_tessellation(edges))
    }

    /// Feature groups drawn at full opacity, in draw order.
    pub fn feature_groups(&self) -> [&[Edge]; 5] {
        [
            &self.right_eyebrow,
            &self.left_eyebrow,
            &self.right_eye,
            &self.left_eye,
            &self.lips,
        ]
    }

    /// Reject edges that reference indices beyond a mesh of `point_count` points.
    pub fn validate(&self, point_count: usize) -> Result<(), TopologyError> {
        let all = std::iter::once(self.tessellation.as_slice()).chain(self.feature_groups());
        for group in all {
            if let Some(&(a, b)) = group.iter().find(|(a, b)| *a >= point_count || *b >= point_count) {
                return Err(TopologyError::IndexOutOfRange(a, b, point_count));
            }
        }
        Ok(())
    }
}

struct Triangle {
    v: [usize; 3],
    cx: f64,
    cy: f64,
    r2: f64,
}

impl Triangle {
    fn new(pts: &[(f64, f64)], v: [usize; 3]) -> Option<Self> {
        let (ax, ay) = pts[v[0]];
        let (bx, by) = pts[v[1]];
        let (qx, qy) = pts[v[2]];
        let d = 2.0 * (ax * (by - qy) + bx * (qy - ay) + qx * (ay - by));
        if d.abs() < 1e-18 {
            return None;
        }
        let (a2, b2, q2) = (ax * ax + ay * ay, bx * bx + by * by, qx * qx + qy * qy);
        let cx = (a2 * (by - qy) + b2 * (qy - ay) + q2 * (ay - by)) / d;
        let cy = (a2 * (qx - bx) + b2 * (ax - qx) + q2 * (bx - ax)) / d;
        let r2 = (ax - cx).powi(2) + (ay - cy).powi(2);
        Some(Self { v, cx, cy, r2 })
    }

    fn encloses(&self, (x, y): (f64, f64)) -> bool {
        (x - self.cx).powi(2) + (y - self.cy).powi(2) < self.r2
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [(a, b), (b, c), (c, a)]
    }
}

fn undirected((a, b): (usize, usize)) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Delaunay triangulation (Bowyer-Watson) of `points`, as sorted undirected edges.
///
/// Non-finite points and exact duplicates of an earlier point get no edges.
pub fn triangulate(points: &[Point]) -> Vec<Edge> {
    let mut pts: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (f64::from(p.x), f64::from(p.y)))
        .collect();
    let n = pts.len();
    let finite = || pts.iter().filter(|(x, y)| x.is_finite() && y.is_finite());
    let (min_x, max_x) = finite().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| {
        (lo.min(x), hi.max(x))
    });
    let (min_y, max_y) = finite().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
        (lo.min(y), hi.max(y))
    });
    if !(min_x.is_finite() && min_y.is_finite()) {
        return Vec::new();
    }

    let span = (max_x - min_x).max(max_y - min_y).max(1e-9);
    let (mid_x, mid_y) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
    pts.push((mid_x - 20.0 * span, mid_y - span));
    pts.push((mid_x, mid_y + 20.0 * span));
    pts.push((mid_x + 20.0 * span, mid_y - span));

    let mut triangles: Vec<Triangle> = Triangle::new(&pts, [n, n + 1, n + 2]).into_iter().collect();
    let mut inserted: BTreeSet<(u64, u64)> = BTreeSet::new();

    for i in 0..n {
        let p = pts[i];
        if !(p.0.is_finite() && p.1.is_finite()) || !inserted.insert((p.0.to_bits(), p.1.to_bits())) {
            continue;
        }

        let (bad, kept): (Vec<Triangle>, Vec<Triangle>) =
            triangles.into_iter().partition(|t| t.encloses(p));
        triangles = kept;

        // Cavity boundary: edges owned by exactly one bad triangle.
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        for e in bad.iter().flat_map(Triangle::edges) {
            match boundary.iter().position(|&b| undirected(b) == undirected(e)) {
                Some(k) => {
                    boundary.swap_remove(k);
                }
                None => boundary.push(e),
            }
        }
        triangles.extend(
            boundary
                .into_iter()
                .filter_map(|(a, b)| Triangle::new(&pts, [a, b, i])),
        );
    }

    let edges: BTreeSet<Edge> = triangles
        .iter()
        .filter(|t| t.v.iter().all(|&v| v < n))
        .flat_map(Triangle::edges)
        .map(undirected)
        .collect();
    edges.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{Landmark, MESH_POINT_COUNT};

    #[test]
    fn test_builtin_topology_fits_mesh() {
        assert!(MeshTopology::default().validate(MESH_POINT_COUNT).is_ok());
    }

    #[test]
    fn test_triangulate_spokes_interior_point() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.3, 1.0),
            Point::new(0.45, 0.35),
        ];
        assert_eq!(
            triangulate(&points),
            vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
        );
    }

    #[test]
    fn test_triangulate_ignores_duplicates_and_nan() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.2, 0.9),
            Point::new(1.0, 0.0),
            Point::new(f32::NAN, 0.5),
        ];
        assert_eq!(triangulate(&points), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_degenerate_pose_keeps_face_oval() {
        let pose = LandmarkSet::new(vec![Landmark::new(0.5, 0.5, 0.0); MESH_POINT_COUNT]);
        assert_eq!(MeshTopology::triangulated(&pose), MeshTopology::default());
    }

    #[test]
    fn test_validate_rejects_out_of_range_edge() {
        let topo = MeshTopology::default().with_tessellation(vec![(0, 1), (2, 468)]);
        let err = topo.validate(MESH_POINT_COUNT).unwrap_err();
        assert!(matches!(err, TopologyError::IndexOutOfRange(2, 468, 468)));
    }

    #[test]
    fn test_load_tessellation_from_json() {
        let dir = std::env::temp_dir().join(format!(
            "mirage-topology-test-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tess.json");
        std::fs::write(&path, "[[0, 1], [1, 2], [2, 0]]").unwrap();

        let topo = MeshTopology::default().load_tessellation(&path).unwrap();
        assert_eq!(topo.tessellation, vec![(0, 1), (1, 2), (2, 0)]);
        assert_eq!(topo.lips.len(), 40);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_tessellation_missing_file() {
        let err = MeshTopology::default()
            .load_tessellation(Path::new("/nonexistent/mirage/tess.json"))
            .unwrap_err();
        assert!(matches!(err, TopologyError::Read { .. }));
    }
}
