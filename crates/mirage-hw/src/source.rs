use std::ops::ControlFlow;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use mirage_core::{LandmarkSet, MeshTopology};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to open landmark stream {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read landmark stream {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed landmark frame at {path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Callback invoked once per tracker frame with zero or one face.
pub type FrameCallback<'a> = dyn FnMut(Option<&LandmarkSet>) -> ControlFlow<()> + 'a;

/// A face tracker delivering landmark frames.
///
/// `subscribe` blocks the calling thread and drives the callback at the
/// source's own cadence until the source ends or the callback breaks.
pub trait LandmarkSource: Send {
    fn name(&self) -> &str;

    /// Edge lists matching this source's index conventions.
    fn topology(&self) -> MeshTopology {
        MeshTopology::default()
    }

    fn subscribe(&mut self, on_frame: &mut FrameCallback<'_>) -> Result<(), SourceError>;
}

/// A continuously running audio analyser.
pub trait AudioSource: Send {
    fn name(&self) -> &str;

    /// Latest frequency magnitudes, one byte per bin.
    fn poll(&mut self) -> &[u8];
}

/// Sleeps between frames to hold a target rate. A rate of 0 runs unpaced.
#[derive(Debug)]
pub struct FramePacer {
    interval: Option<Duration>,
    next: Option<Instant>,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: (fps > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(fps))),
            next: None,
        }
    }

    pub fn wait(&mut self) {
        let Some(interval) = self.interval else {
            return;
        };
        let now = Instant::now();
        let deadline = self.next.unwrap_or(now);
        if deadline > now {
            thread::sleep(deadline - now);
        }
        // Resync instead of bursting when the consumer fell behind.
        let base = if deadline + interval < now { now } else { deadline };
        self.next = Some(base + interval);
    }
}

/// Stand-in when no tracker could be opened: delivers "no face" at the frame rate forever.
pub struct IdleSource {
    pacer: FramePacer,
}

impl IdleSource {
    pub fn new(fps: u32) -> Self {
        Self {
            pacer: FramePacer::new(fps),
        }
    }
}

impl LandmarkSource for IdleSource {
    fn name(&self) -> &str {
        "idle"
    }

    fn subscribe(&mut self, on_frame: &mut FrameCallback<'_>) -> Result<(), SourceError> {
        loop {
            self.pacer.wait();
            if on_frame(None).is_break() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_source_never_yields_face() {
        let mut source = IdleSource::new(0);
        let mut frames = 0;
        source
            .subscribe(&mut |face| {
                assert!(face.is_none());
                frames += 1;
                if frames == 10 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(frames, 10);
    }

    #[test]
    fn test_pacer_holds_rate() {
        let mut pacer = FramePacer::new(200);
        let start = Instant::now();
        for _ in 0..5 {
            pacer.wait();
        }
        // first wait is immediate, four intervals of 5ms follow
        assert!(start.elapsed() >= Duration::from_millis(19));
    }

    #[test]
    fn test_unpaced_never_sleeps() {
        let mut pacer = FramePacer::new(0);
        let start = Instant::now();
        for _ in 0..1000 {
            pacer.wait();
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
