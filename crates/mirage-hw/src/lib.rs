//! Input capabilities for mirage: face trackers and audio analysers.
//!
//! Hardware trackers plug in behind [`LandmarkSource`]; this crate ships a
//! procedural face, a JSON-lines replay and an idle fallback.

pub mod replay;
pub mod source;
pub mod synthetic;

pub use replay::JsonLinesSource;
pub use source::{AudioSource, FrameCallback, FramePacer, IdleSource, LandmarkSource, SourceError};
pub use synthetic::{FaceScript, SyntheticFace, SyntheticSpectrum, SPECTRUM_BINS};
