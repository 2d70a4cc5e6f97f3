//! Landmark replay from a JSON-lines recording.
//!
//! One frame per line; each line is an array of faces and each face an array
//! of `[x, y, z]` triples. `[]` records a frame with no face. Only the first
//! face of a frame is used. A line that does not parse replays as a frame
//! with no face.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use mirage_core::{LandmarkSet, MeshTopology};

use crate::source::{FrameCallback, FramePacer, LandmarkSource, SourceError};

pub struct JsonLinesSource {
    path: PathBuf,
    frames: Vec<Option<LandmarkSet>>,
    topology: MeshTopology,
    pacer: FramePacer,
    looping: bool,
    delivered: u64,
}

impl JsonLinesSource {
    /// Read and parse the whole recording up front so a missing or unreadable
    /// file fails at startup.
    ///
    /// The tessellation is triangulated from the first valid face.
    pub fn open(path: &Path, fps: u32, looping: bool) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut frames = Vec::new();
        let mut malformed = 0usize;
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| SourceError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Vec<LandmarkSet>>(&line) {
                Ok(faces) => frames.push(faces.into_iter().next()),
                Err(source) => {
                    let err = SourceError::Parse {
                        path: path.to_path_buf(),
                        line: n + 1,
                        source,
                    };
                    tracing::warn!(error = %err, "skipping malformed frame");
                    malformed += 1;
                    frames.push(None);
                }
            }
        }

        let topology = frames
            .iter()
            .flatten()
            .find(|face| face.validate().is_ok())
            .map_or_else(MeshTopology::default, MeshTopology::triangulated);

        let with_face = frames.iter().filter(|f| f.is_some()).count();
        tracing::info!(
            path = %path.display(),
            frames = frames.len(),
            with_face,
            malformed,
            edges = topology.tessellation.len(),
            looping,
            "landmark recording opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            frames,
            topology,
            pacer: FramePacer::new(fps),
            looping,
            delivered: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl LandmarkSource for JsonLinesSource {
    fn name(&self) -> &str {
        "replay"
    }

    fn topology(&self) -> MeshTopology {
        self.topology.clone()
    }

    fn subscribe(&mut self, on_frame: &mut FrameCallback<'_>) -> Result<(), SourceError> {
        if self.frames.is_empty() {
            tracing::warn!(path = %self.path.display(), "landmark recording is empty");
            return Ok(());
        }
        loop {
            for frame in &self.frames {
                self.pacer.wait();
                self.delivered += 1;
                if on_frame(frame.as_ref()).is_break() {
                    return Ok(());
                }
            }
            if !self.looping {
                tracing::info!(frames = self.delivered, "landmark recording finished");
                return Ok(());
            }
        }
    }
}

impl Drop for JsonLinesSource {
    fn drop(&mut self) {
        tracing::info!(path = %self.path.display(), frames = self.delivered, "landmark recording released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::MESH_POINT_COUNT;
    use std::io::Write;

    fn temp_recording(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mirage-replay-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frames.jsonl");
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn face_line(x: f32) -> String {
        let face: Vec<[f32; 3]> = vec![[x, 0.5, 0.0]; 468];
        serde_json::to_string(&vec![face]).unwrap()
    }

    fn collect(source: &mut JsonLinesSource, limit: usize) -> Vec<Option<f32>> {
        let mut seen = Vec::new();
        source
            .subscribe(&mut |face| {
                seen.push(face.map(|f| f.points[0].x));
                if seen.len() >= limit {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        seen
    }

    #[test]
    fn test_replays_faces_and_gaps() {
        let content = format!("{}\n[]\n\n{}\n", face_line(0.25), face_line(0.75));
        let path = temp_recording("gaps", &content);
        let mut source = JsonLinesSource::open(&path, 0, false).unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(collect(&mut source, 10), vec![Some(0.25), None, Some(0.75)]);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_looping_restarts() {
        let path = temp_recording("loop", &format!("{}\n[]\n", face_line(0.5)));
        let mut source = JsonLinesSource::open(&path, 0, true).unwrap();
        assert_eq!(collect(&mut source, 5), vec![Some(0.5), None, Some(0.5), None, Some(0.5)]);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_only_first_face_used() {
        let face_a: Vec<[f32; 3]> = vec![[0.1, 0.5, 0.0]; 468];
        let face_b: Vec<[f32; 3]> = vec![[0.9, 0.5, 0.0]; 468];
        let line = serde_json::to_string(&vec![face_a, face_b]).unwrap();
        let path = temp_recording("multi", &line);
        let mut source = JsonLinesSource::open(&path, 0, false).unwrap();
        assert_eq!(collect(&mut source, 10), vec![Some(0.1)]);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_malformed_line_replays_as_no_face() {
        let content = format!("{}\nnot json\n{}\n", face_line(0.25), face_line(0.75));
        let path = temp_recording("bad", &content);
        let mut source = JsonLinesSource::open(&path, 0, false).unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(collect(&mut source, 10), vec![Some(0.25), None, Some(0.75)]);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_topology_triangulated_from_first_valid_face() {
        let pose: Vec<[f32; 3]> = (0..MESH_POINT_COUNT)
            .map(|i| {
                let r = ((i as f32 + 0.5) / MESH_POINT_COUNT as f32).sqrt() * 0.4;
                let theta = i as f32 * 2.399_963;
                [0.5 + r * theta.cos(), 0.5 + r * theta.sin(), 0.0]
            })
            .collect();
        let content = format!("[]\n{}\n", serde_json::to_string(&vec![pose]).unwrap());
        let path = temp_recording("pose", &content);
        let source = JsonLinesSource::open(&path, 0, false).unwrap();
        let mesh = source.topology();
        assert!(mesh.tessellation.len() > 2 * MESH_POINT_COUNT);
        assert!(mesh.validate(MESH_POINT_COUNT).is_ok());
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_degenerate_recording_keeps_builtin_topology() {
        let path = temp_recording("flat", &face_line(0.5));
        let source = JsonLinesSource::open(&path, 0, false).unwrap();
        assert_eq!(source.topology(), MeshTopology::default());
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_missing_file() {
        let err = JsonLinesSource::open(Path::new("/nonexistent/mirage.jsonl"), 0, false);
        assert!(matches!(err, Err(SourceError::Open { .. })));
    }
}
