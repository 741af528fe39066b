//! Classifier boundary types for the GestureTree environment abstraction.

use crate::EnvError;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of landmarks in the reference hand skeleton.
pub const LANDMARK_COUNT: usize = 21;

/// Fixed landmark indices in the reference hand skeleton.
pub mod landmark {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_TIP: usize = 8;
    /// Base of the middle finger; wrist-to-here is the palm size reference.
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_TIP: usize = 16;
    pub const PINKY_TIP: usize = 20;

    /// The four fingertips used for the openness score.
    pub const FINGERTIPS: [usize; 4] = [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];
}

/// A landmark in normalized image coordinates (x, y in [0, 1], z relative depth).
pub type Landmark = Point3<f32>;

/// One ranked gesture classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureCategory {
    /// Classifier label, e.g. "Open_Palm", "Closed_Fist", "None"
    pub label: String,

    /// Confidence in [0, 1]
    pub score: f32,
}

impl GestureCategory {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A single detected hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandDetection {
    /// Ranked classifications, best first
    pub gestures: Vec<GestureCategory>,

    /// Landmark array indexed by [`landmark`] constants (empty if unavailable)
    pub landmarks: Vec<Landmark>,
}

impl HandDetection {
    /// Returns the top-ranked classification, if any.
    pub fn top_gesture(&self) -> Option<&GestureCategory> {
        self.gestures.first()
    }

    /// Returns a landmark by skeleton index.
    pub fn landmark(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }

    /// True if the landmark array covers the full reference skeleton.
    pub fn has_skeleton(&self) -> bool {
        self.landmarks.len() >= LANDMARK_COUNT
    }
}

/// Output of one classifier invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassifierOutput {
    /// Timestamp of the video frame that was classified
    pub timestamp_ms: u64,

    /// Zero or more detected hands
    pub hands: Vec<HandDetection>,
}

impl ClassifierOutput {
    /// An output with no hands.
    pub fn empty(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            hands: Vec::new(),
        }
    }

    /// The hand the intake acts on (first detected).
    pub fn primary_hand(&self) -> Option<&HandDetection> {
        self.hands.first()
    }
}

/// What lands in the result mailbox: an output, or the reason there is none.
pub type ClassifierResult = Result<ClassifierOutput, EnvError>;

/// A captured video frame handed to the classifier.
///
/// Pixel data is shared so republishing a frame never copies it.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub timestamp_ms: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl VideoFrame {
    pub fn new(timestamp_ms: u64, width: u32, height: u32, pixels: Arc<[u8]>) -> Self {
        Self {
            timestamp_ms,
            width,
            height,
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_gesture_is_first_ranked() {
        let hand = HandDetection {
            gestures: vec![
                GestureCategory::new("Open_Palm", 0.7),
                GestureCategory::new("Closed_Fist", 0.2),
            ],
            landmarks: vec![Point3::origin(); LANDMARK_COUNT],
        };

        assert_eq!(hand.top_gesture().map(|g| g.label.as_str()), Some("Open_Palm"));
        assert!(hand.has_skeleton());
        assert!(hand.landmark(landmark::PINKY_TIP).is_some());
        assert!(hand.landmark(LANDMARK_COUNT).is_none());
    }

    #[test]
    fn test_empty_output_has_no_primary_hand() {
        let output = ClassifierOutput::empty(12);
        assert!(output.primary_hand().is_none());
        assert_eq!(output.timestamp_ms, 12);
    }
}
