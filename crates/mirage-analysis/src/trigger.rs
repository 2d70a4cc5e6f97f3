//! Still-frame analysis trigger.
//!
//! At most one request is in flight; a call made while busy is dropped. The
//! busy flag clears a fixed cooldown after the request settles, whatever the
//! outcome, except for a failed capture which returns to idle at once.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::log::LogHandle;
use crate::phrases::Analyzer;
use crate::status::AnalysisStatus;

/// Cadence of automatic analysis once the video source is ready.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(8);
/// Time the trigger stays busy after a request settles.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("video source has stopped")]
    SourceStopped,
    #[error("no frame rendered yet")]
    NoFrame,
    #[error("failed to encode still image: {0}")]
    Encode(String),
}

/// On-demand still capture from the running video source.
pub trait FrameCapture: Send + Sync + 'static {
    /// Encoded image of the current output frame.
    fn capture(&self) -> impl Future<Output = Result<Vec<u8>, CaptureError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// Another request was in flight.
    Suppressed,
    CaptureFailed,
    Completed(String),
    Failed,
}

struct Inner<C, A> {
    capture: C,
    analyzer: A,
    log: LogHandle,
    status: watch::Sender<AnalysisStatus>,
    busy: AtomicBool,
    cooldown: Duration,
}

/// Clone-safe handle to the trigger.
pub struct AnalysisTrigger<C, A> {
    inner: Arc<Inner<C, A>>,
}

impl<C, A> Clone for AnalysisTrigger<C, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: FrameCapture, A: Analyzer> AnalysisTrigger<C, A> {
    pub fn new(capture: C, analyzer: A, log: LogHandle, cooldown: Duration) -> Self {
        let (status, _) = watch::channel(AnalysisStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                capture,
                analyzer,
                log,
                status,
                busy: AtomicBool::new(false),
                cooldown,
            }),
        }
    }

    pub fn status(&self) -> AnalysisStatus {
        *self.inner.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    fn set_status(&self, status: AnalysisStatus) {
        tracing::debug!(%status, "analysis status");
        self.inner.status.send_replace(status);
    }

    fn release(&self) {
        self.set_status(AnalysisStatus::Idle);
        self.inner.busy.store(false, Ordering::Release);
    }

    /// Capture a still and analyze it. Returns immediately when busy.
    pub async fn trigger(&self) -> TriggerOutcome {
        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("analysis already in flight, request dropped");
            return TriggerOutcome::Suppressed;
        }

        let log = &self.inner.log;
        self.set_status(AnalysisStatus::Capturing);
        log.info("Capturing key frame for deep analysis...");

        let image = match self.inner.capture.capture().await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "still capture failed");
                log.error("Frame capture failed.");
                self.release();
                return TriggerOutcome::CaptureFailed;
            }
        };

        self.set_status(AnalysisStatus::Analyzing);
        log.info("Running local neural analysis...");

        let outcome = match self.inner.analyzer.analyze(image).await {
            Ok(text) => {
                log.analysis(text.clone());
                self.set_status(AnalysisStatus::Complete);
                TriggerOutcome::Completed(text)
            }
            Err(e) => {
                tracing::warn!(error = %e, "analysis failed");
                log.error("Analysis process interrupted.");
                self.set_status(AnalysisStatus::Error);
                TriggerOutcome::Failed
            }
        };

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.inner.cooldown).await;
            this.release();
        });

        outcome
    }

    /// Fire a request every `interval` once `ready` turns true.
    ///
    /// Requests run as detached tasks so a slow analysis never delays the
    /// cadence. Returns if the readiness sender is dropped before becoming ready.
    pub async fn run_periodic(self, interval: Duration, mut ready: watch::Receiver<bool>) {
        if ready.wait_for(|r| *r).await.is_err() {
            tracing::debug!("video source never became ready, periodic analysis disabled");
            return;
        }
        tracing::info!(interval_secs = interval.as_secs_f32(), "periodic analysis armed");

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let this = self.clone();
            tokio::spawn(async move {
                this.trigger().await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogKind;
    use crate::phrases::{AnalysisError, PhraseAnalyzer};
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Default)]
    struct FakeCapture {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl FrameCapture for FakeCapture {
        fn capture(&self) -> impl Future<Output = Result<Vec<u8>, CaptureError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            async move {
                if fail {
                    Err(CaptureError::NoFrame)
                } else {
                    Ok(vec![0x89, b'P', b'N', b'G'])
                }
            }
        }
    }

    struct BrokenAnalyzer;

    impl Analyzer for BrokenAnalyzer {
        fn analyze(&self, _image: Vec<u8>) -> impl Future<Output = Result<String, AnalysisError>> + Send {
            async { Err(AnalysisError::EmptyImage) }
        }
    }

    fn trigger(capture: FakeCapture) -> (AnalysisTrigger<FakeCapture, PhraseAnalyzer>, LogHandle) {
        let log = LogHandle::new();
        let t = AnalysisTrigger::new(capture, PhraseAnalyzer::from_seed(3), log.clone(), DEFAULT_COOLDOWN);
        (t, log)
    }

    fn kinds(log: &LogHandle) -> Vec<LogKind> {
        log.snapshot().iter().map(|e| e.kind).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_then_cools_down() {
        let (t, log) = trigger(FakeCapture::default());
        let outcome = t.trigger().await;
        assert!(matches!(outcome, TriggerOutcome::Completed(_)));
        assert_eq!(t.status(), AnalysisStatus::Complete);
        assert!(t.is_busy());
        assert_eq!(kinds(&log), vec![LogKind::Info, LogKind::Info, LogKind::Analysis]);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(t.is_busy());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(t.status(), AnalysisStatus::Idle);
        assert!(!t.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_request_suppressed() {
        let capture = FakeCapture::default();
        let (t, _log) = trigger(capture.clone());
        let first = tokio::spawn({
            let t = t.clone();
            async move { t.trigger().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(t.status(), AnalysisStatus::Analyzing);
        assert_eq!(t.trigger().await, TriggerOutcome::Suppressed);
        assert!(matches!(first.await.unwrap(), TriggerOutcome::Completed(_)));
        assert_eq!(capture.calls.load(Ordering::SeqCst), 1);

        // still cooling down
        assert_eq!(t.trigger().await, TriggerOutcome::Suppressed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failure_returns_to_idle_at_once() {
        let (t, log) = trigger(FakeCapture {
            fail: true,
            ..Default::default()
        });
        assert_eq!(t.trigger().await, TriggerOutcome::CaptureFailed);
        assert_eq!(t.status(), AnalysisStatus::Idle);
        assert!(!t.is_busy());
        assert_eq!(kinds(&log), vec![LogKind::Info, LogKind::Error]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_failure_reports_error_status() {
        let log = LogHandle::new();
        let t = AnalysisTrigger::new(FakeCapture::default(), BrokenAnalyzer, log.clone(), DEFAULT_COOLDOWN);
        let mut status = t.subscribe();
        assert_eq!(t.trigger().await, TriggerOutcome::Failed);
        assert_eq!(*status.borrow_and_update(), AnalysisStatus::Error);
        assert_eq!(log.snapshot().last().map(|e| e.kind), Some(LogKind::Error));

        status.changed().await.unwrap();
        assert_eq!(*status.borrow(), AnalysisStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_waits_for_ready() {
        let capture = FakeCapture::default();
        let (t, _log) = trigger(capture.clone());
        let (ready_tx, ready_rx) = watch::channel(false);
        let task = tokio::spawn(t.clone().run_periodic(DEFAULT_INTERVAL, ready_rx));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(capture.calls.load(Ordering::SeqCst), 0);

        ready_tx.send_replace(true);
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(capture.calls.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(capture.calls.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(capture.calls.load(Ordering::SeqCst), 2);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_exits_without_video_source() {
        let (t, _log) = trigger(FakeCapture::default());
        let (ready_tx, ready_rx) = watch::channel(false);
        drop(ready_tx);
        t.run_periodic(DEFAULT_INTERVAL, ready_rx).await;
    }
}
