use std::future::Future;
use std::ops::ControlFlow;
use std::time::Instant;

use mirage_analysis::{CaptureError, FrameCapture, LogHandle};
use mirage_core::{
    FacePipeline, FrameInput, GenderMode, MeshTopology, RasterSurface, SeededRandom, ThemeKind,
    MESH_POINT_COUNT,
};
use mirage_hw::{
    AudioSource, IdleSource, JsonLinesSource, LandmarkSource, SourceError, SyntheticFace,
    SyntheticSpectrum,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::Config;
use crate::output::FrameWriter;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("landmark source error: {0}")]
    Source(#[from] SourceError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from the runtime to the engine thread; drained once per frame.
enum EngineRequest {
    Snapshot {
        reply: oneshot::Sender<Result<Vec<u8>, CaptureError>>,
    },
    SetTheme(ThemeKind),
    SetGender(GenderMode),
    Stop,
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// PNG of the current presented frame.
    pub async fn snapshot(&self) -> Result<Result<Vec<u8>, CaptureError>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn set_theme(&self, theme: ThemeKind) -> Result<(), EngineError> {
        self.send(EngineRequest::SetTheme(theme)).await
    }

    pub async fn set_gender(&self, gender: GenderMode) -> Result<(), EngineError> {
        self.send(EngineRequest::SetGender(gender)).await
    }

    /// Ask the frame loop to stop after the current frame.
    pub async fn stop(&self) -> Result<(), EngineError> {
        self.send(EngineRequest::Stop).await
    }

    async fn send(&self, request: EngineRequest) -> Result<(), EngineError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}

/// Still capture backed by the engine, for the analysis trigger.
#[derive(Clone)]
pub struct EngineCapture {
    engine: EngineHandle,
}

impl EngineCapture {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }
}

impl FrameCapture for EngineCapture {
    fn capture(&self) -> impl Future<Output = Result<Vec<u8>, CaptureError>> + Send {
        let engine = self.engine.clone();
        async move {
            engine
                .snapshot()
                .await
                .map_err(|_| CaptureError::SourceStopped)?
        }
    }
}

/// Signals from a running engine.
pub struct EngineRun {
    /// Turns true once the first frame has been rendered.
    pub ready: watch::Receiver<bool>,
    /// Frames rendered, sent when the loop ends.
    pub done: oneshot::Receiver<Result<u64, EngineError>>,
}

fn open_landmarks(config: &Config, seed: u64, log: &LogHandle) -> Box<dyn LandmarkSource> {
    log.info("Initializing neural interface...");
    let Some(path) = &config.landmarks else {
        log.success("Neural interface ready.");
        return Box::new(SyntheticFace::new(config.fps, seed));
    };
    match JsonLinesSource::open(path, config.fps, config.frames == 0) {
        Ok(source) => {
            log.success("Neural interface ready.");
            Box::new(source)
        }
        Err(e) => {
            tracing::error!(error = %e, "landmark source unavailable");
            log.error(format!("Tracker unavailable ({e}); running in acquisition mode."));
            Box::new(IdleSource::new(config.fps))
        }
    }
}

fn open_audio(config: &Config, seed: u64, log: &LogHandle) -> Option<Box<dyn AudioSource>> {
    if config.audio {
        log.success("Sonic resonance module active.");
        Some(Box::new(SyntheticSpectrum::new(seed.wrapping_add(1))))
    } else {
        log.warning("Microphone unavailable, audio feedback disabled.");
        None
    }
}

fn resolve_topology(source: &dyn LandmarkSource, config: &Config, log: &LogHandle) -> MeshTopology {
    let mut topology = source.topology();
    if let Some(path) = &config.tessellation {
        match topology.clone().load_tessellation(path) {
            Ok(loaded) => topology = loaded,
            Err(e) => {
                tracing::warn!(error = %e, "keeping built-in topology");
                log.warning(format!("Tessellation unavailable: {e}"));
            }
        }
    }
    if let Err(e) = topology.validate(MESH_POINT_COUNT) {
        tracing::warn!(error = %e, "topology rejected, using built-in feature edges");
        log.warning(format!("Topology rejected: {e}"));
        topology = MeshTopology::default();
    }
    topology
}

/// Spawn the frame loop on a dedicated OS thread.
///
/// Opens the landmark and audio sources first; either one missing degrades
/// the run (idle acquisition mode, no audio effects) instead of failing.
pub fn spawn_engine(config: &Config, log: LogHandle) -> Result<(EngineHandle, EngineRun), EngineError> {
    let seed = config.seed.unwrap_or_else(rand::random);
    let mut source = open_landmarks(config, seed, &log);
    let mut audio = open_audio(config, seed, &log);
    let topology = resolve_topology(source.as_ref(), config, &log);

    let mut writer = match &config.output_dir {
        Some(dir) => match FrameWriter::create(dir, config.output_every) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(error = %e, "frame output disabled");
                log.warning(format!("Frame output disabled: {e:#}"));
                None
            }
        },
        None => None,
    };

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(8);
    let (ready_tx, ready_rx) = watch::channel(false);
    let (done_tx, done_rx) = oneshot::channel();

    let (width, height) = (config.width.max(1), config.height.max(1));
    let frame_limit = config.frames;
    let mut theme = config.theme;
    let mut gender = config.gender;

    tracing::info!(
        source = source.name(),
        audio = audio.as_ref().map(|a| a.name()),
        width,
        height,
        seed,
        "engine configured"
    );

    std::thread::Builder::new()
        .name("mirage-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            let mut pipeline = FacePipeline::new(
                RasterSurface::new(width, height),
                topology,
                SeededRandom::from_seed(seed),
            );
            let started = Instant::now();
            let mut stopping = false;

            let result = source.subscribe(&mut |face| {
                while let Ok(request) = rx.try_recv() {
                    match request {
                        EngineRequest::Snapshot { reply } => {
                            let still = if pipeline.frames() == 0 {
                                Err(CaptureError::NoFrame)
                            } else {
                                pipeline
                                    .surface()
                                    .encode_png()
                                    .map_err(|e| CaptureError::Encode(e.to_string()))
                            };
                            let _ = reply.send(still);
                        }
                        EngineRequest::SetTheme(t) => {
                            tracing::info!(theme = %t, "theme changed");
                            theme = t;
                        }
                        EngineRequest::SetGender(g) => {
                            tracing::info!(gender = %g, "gender mode changed");
                            gender = g;
                        }
                        EngineRequest::Stop => stopping = true,
                    }
                }
                if stopping {
                    return ControlFlow::Break(());
                }

                let spectrum = audio.as_mut().map(|a| a.poll());
                let report = pipeline.process(FrameInput {
                    landmarks: face,
                    spectrum,
                    theme,
                    gender,
                    time_ms: started.elapsed().as_secs_f64() * 1000.0,
                });

                if report.frame == 1 {
                    log.success("Visual sensor connected.");
                    log.info("Capturing biometric data...");
                    ready_tx.send_replace(true);
                }

                if let Some(w) = writer.as_mut() {
                    if let Err(e) = w.offer(report.frame, pipeline.surface()) {
                        tracing::warn!(error = %e, "frame output disabled");
                        log.warning(format!("Frame output disabled: {e:#}"));
                        writer = None;
                    }
                }

                if frame_limit > 0 && report.frame >= frame_limit {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });

            let frames = pipeline.frames();
            let elapsed = started.elapsed().as_secs_f64();
            tracing::info!(
                frames,
                written = writer.as_ref().map(FrameWriter::written),
                fps = if elapsed > 0.0 { frames as f64 / elapsed } else { 0.0 },
                "engine thread exiting"
            );
            // Sources release their devices on drop.
            drop(source);
            drop(audio);
            let _ = done_tx.send(result.map(|()| frames).map_err(EngineError::from));
        })
        .map_err(EngineError::Spawn)?;

    Ok((
        EngineHandle { tx },
        EngineRun {
            ready: ready_rx,
            done: done_rx,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_analysis::LogKind;

    fn test_config() -> Config {
        Config {
            width: 64,
            height: 36,
            fps: 0,
            seed: Some(9),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_runs_to_frame_limit() {
        let config = Config {
            frames: 12,
            ..test_config()
        };
        let log = LogHandle::new();
        let (_engine, run) = spawn_engine(&config, log.clone()).unwrap();
        let frames = run.done.await.unwrap().unwrap();
        assert_eq!(frames, 12);
        assert!(*run.ready.borrow());
        let messages: Vec<String> = log.snapshot().into_iter().map(|e| e.message).collect();
        assert!(messages.iter().any(|m| m == "Visual sensor connected."));
        assert!(messages.iter().any(|m| m == "Sonic resonance module active."));
    }

    #[tokio::test]
    async fn test_snapshot_is_png_and_stop_ends_loop() {
        let log = LogHandle::new();
        let (engine, mut run) = spawn_engine(&test_config(), log).unwrap();
        run.ready.wait_for(|r| *r).await.unwrap();

        let png = engine.snapshot().await.unwrap().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 36));

        engine.set_theme(ThemeKind::GoldenData).await.unwrap();
        engine.stop().await.unwrap();
        assert!(run.done.await.unwrap().unwrap() > 0);
        assert!(matches!(engine.snapshot().await, Err(EngineError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_missing_recording_degrades_to_idle() {
        let config = Config {
            frames: 3,
            audio: false,
            landmarks: Some("/nonexistent/mirage.jsonl".into()),
            ..test_config()
        };
        let log = LogHandle::new();
        let (_engine, run) = spawn_engine(&config, log.clone()).unwrap();
        assert_eq!(run.done.await.unwrap().unwrap(), 3);
        let kinds: Vec<LogKind> = log.snapshot().iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&LogKind::Error));
        assert!(kinds.contains(&LogKind::Warning));
    }

    #[tokio::test]
    async fn test_engine_capture_reports_stopped_engine() {
        let config = Config {
            frames: 1,
            ..test_config()
        };
        let (engine, run) = spawn_engine(&config, LogHandle::new()).unwrap();
        run.done.await.unwrap().unwrap();
        let capture = EngineCapture::new(engine);
        assert!(matches!(capture.capture().await, Err(CaptureError::SourceStopped)));
    }
}
