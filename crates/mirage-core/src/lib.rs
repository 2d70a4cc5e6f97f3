//! Core of the mirage face-mesh visualiser.
//!
//! Per frame: landmarks and an audio spectrum go in, the classifier derives
//! warning/glitch signals, the geometry stage normalises and morphs the face,
//! and the renderer issues drawing primitives to a [`Surface`].

pub mod classifier;
pub mod font;
pub mod geometry;
pub mod landmark;
pub mod pipeline;
pub mod random;
pub mod raster;
pub mod render;
pub mod state;
pub mod surface;
pub mod theme;
pub mod topology;

pub use classifier::DerivedFrameSignals;
pub use geometry::TransformedGeometry;
pub use landmark::{Landmark, LandmarkError, LandmarkSet, Point, MESH_POINT_COUNT};
pub use pipeline::{FacePipeline, FrameInput, FrameReport};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use raster::RasterSurface;
pub use render::{RenderFrame, Renderer};
pub use state::FrameState;
pub use surface::{RecordingSurface, Surface};
pub use theme::{GenderMode, ParseError, Theme, ThemeKind};
pub use topology::{MeshTopology, TopologyError};
