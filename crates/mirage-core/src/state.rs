use crate::landmark::Point;

/// Cross-frame memory owned by the pipeline and mutated only by the classifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameState {
    /// Nose tip position from the previous face frame; `None` after a tracking miss.
    pub previous_nose: Option<Point>,
    /// Frames of glitch mode left to play.
    pub glitch_frames_remaining: u32,
}

impl FrameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_glitch_armed(&self) -> bool {
        self.glitch_frames_remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let state = FrameState::new();
        assert_eq!(state.previous_nose, None);
        assert!(!state.is_glitch_armed());
    }

    #[test]
    fn test_armed_while_countdown_positive() {
        let mut state = FrameState {
            previous_nose: Some(Point::new(0.5, 0.5)),
            glitch_frames_remaining: 1,
        };
        assert!(state.is_glitch_armed());
        state.glitch_frames_remaining -= 1;
        assert!(!state.is_glitch_armed());
    }
}
