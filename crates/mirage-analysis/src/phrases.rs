//! Offline analysis stub: templated readouts after a simulated processing delay.

use std::future::Future;
use std::ops::Range;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum AnalysisError {
    #[error("captured image is empty")]
    EmptyImage,
}

/// Turns a still image into one line of descriptive text.
pub trait Analyzer: Send + Sync + 'static {
    fn analyze(&self, image: Vec<u8>) -> impl Future<Output = Result<String, AnalysisError>> + Send;
}

const SYSTEMS: &[&str] = &[
    "visual cortex",
    "facial musculature",
    "neural lattice",
    "biometric scanner",
    "affective computing core",
];
const ACTIONS: &[&str] = &[
    "Detected",
    "Reassembling",
    "Captured",
    "Analysis shows",
    "Deconstructing",
];
const FEATURES: &[&str] = &[
    "orbicularis oculi micro-tremor",
    "subtle mouth-corner lift",
    "brow distance contraction",
    "pupil focus lock",
    "facial triangle flush",
    "jaw muscle tension",
];
const STATES: &[&str] = &[
    "focus mode",
    "cognitive overload",
    "emotional variance: low",
    "resting state",
    "alertness: high",
    "micro-expressions active",
];

/// Simulated processing time in milliseconds.
pub const DELAY_MS: Range<u64> = 500..1500;

fn pick<'a>(rng: &mut impl Rng, pool: &[&'a str]) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

/// Draw a delay and a phrase. Draw order: delay, system, action, template
/// selector, then the template's own fields.
pub fn compose(rng: &mut impl Rng) -> (Duration, String) {
    let delay = Duration::from_millis(rng.gen_range(DELAY_MS));
    let system = pick(rng, SYSTEMS);
    let action = pick(rng, ACTIONS);
    let selector: f64 = rng.gen();

    let text = if selector > 0.7 {
        let feature = pick(rng, FEATURES);
        let state = pick(rng, STATES);
        format!("{action} {feature}, classified as {state}.")
    } else if selector > 0.4 {
        let deviation: f64 = rng.gen_range(0.0..0.5);
        format!("[SYSTEM] {system} data stream synchronized, deviation {deviation:.2}%.")
    } else {
        let code: u32 = rng.gen_range(1000..10000);
        let confidence: f64 = 85.0 + rng.gen_range(0.0..15.0);
        format!("Parsing bioelectric signal sequence #{code}... match {confidence:.1}%.")
    };
    (delay, text)
}

/// Seedable phrase generator; never inspects the image beyond rejecting an empty one.
pub struct PhraseAnalyzer {
    rng: Mutex<StdRng>,
}

impl PhraseAnalyzer {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl Analyzer for PhraseAnalyzer {
    fn analyze(&self, image: Vec<u8>) -> impl Future<Output = Result<String, AnalysisError>> + Send {
        let drawn = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            compose(&mut *rng)
        };
        async move {
            if image.is_empty() {
                return Err(AnalysisError::EmptyImage);
            }
            let (delay, text) = drawn;
            tracing::debug!(bytes = image.len(), delay_ms = delay.as_millis() as u64, "analyzing still");
            tokio::time::sleep(delay).await;
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrases_follow_templates() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut shapes = [0usize; 3];
        for _ in 0..300 {
            let (delay, text) = compose(&mut rng);
            assert!(delay >= Duration::from_millis(500) && delay < Duration::from_millis(1500));
            if text.starts_with("[SYSTEM] ") {
                assert!(text.contains("deviation 0."));
                shapes[1] += 1;
            } else if text.starts_with("Parsing bioelectric signal sequence #") {
                let code: u32 = text[37..41].parse().unwrap();
                assert!((1000..10000).contains(&code));
                shapes[2] += 1;
            } else {
                assert!(ACTIONS.iter().any(|a| text.starts_with(a)));
                assert!(text.contains(", classified as "));
                shapes[0] += 1;
            }
        }
        assert!(shapes.iter().all(|&n| n > 0));
    }

    #[test]
    fn test_same_seed_same_phrases() {
        let a: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(5);
            (0..10).map(|_| compose(&mut rng)).collect()
        };
        let b: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(5);
            (0..10).map(|_| compose(&mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_waits_simulated_delay() {
        let analyzer = PhraseAnalyzer::from_seed(1);
        let start = tokio::time::Instant::now();
        let text = analyzer.analyze(vec![1, 2, 3]).await.unwrap();
        let elapsed = start.elapsed();
        assert!(!text.is_empty());
        assert!(elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_image_rejected() {
        let analyzer = PhraseAnalyzer::from_seed(1);
        assert_eq!(analyzer.analyze(Vec::new()).await, Err(AnalysisError::EmptyImage));
    }
}
