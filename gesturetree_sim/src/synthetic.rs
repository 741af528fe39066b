//! Synthetic hand generator.
//!
//! Builds 21-point skeletons with an exact thumb-index distance and openness
//! score, optionally jittered with Gaussian landmark noise.

use gesturetree_env::{landmark, GestureCategory, HandDetection, Landmark, LANDMARK_COUNT};
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Fingertip fan angles (radians from straight down), index to pinky.
const FAN: [f32; 4] = [-0.15, -0.05, 0.05, 0.15];

/// Parameters of one synthetic hand.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticHand {
    /// Top-ranked gesture label ("" for none)
    pub label: String,

    /// Confidence of the label
    pub score: f32,

    /// Wrist position in normalized image coordinates
    pub wrist: [f32; 2],

    /// Wrist to middle-finger MCP distance
    pub palm_size: f32,

    /// Mean wrist-to-fingertip distance divided by palm size
    pub openness: f32,

    /// Thumb tip to index tip distance
    pub pinch_distance: f32,

    /// Standard deviation of per-coordinate landmark noise
    pub noise: f32,
}

impl Default for SyntheticHand {
    fn default() -> Self {
        Self {
            label: String::new(),
            score: 0.9,
            wrist: [0.5, 0.8],
            palm_size: 0.1,
            openness: 1.4,
            pinch_distance: 0.2,
            noise: 0.0,
        }
    }
}

impl SyntheticHand {
    /// Relaxed hand with no gesture label and no pinch.
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn open_palm() -> Self {
        Self {
            label: "Open_Palm".to_string(),
            openness: 2.0,
            ..Self::default()
        }
    }

    pub fn fist() -> Self {
        Self {
            label: "Closed_Fist".to_string(),
            openness: 0.6,
            pinch_distance: 0.03,
            ..Self::default()
        }
    }

    /// Unlabelled pinch with openness inside the accepted band.
    pub fn pinch(distance: f32) -> Self {
        Self {
            pinch_distance: distance,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: &str, score: f32) -> Self {
        self.label = label.to_string();
        self.score = score;
        self
    }

    /// Horizontal wrist position; 0.5 is the rotation centre.
    pub fn at_x(mut self, x: f32) -> Self {
        self.wrist[0] = x;
        self
    }

    pub fn with_openness(mut self, openness: f32) -> Self {
        self.openness = openness;
        self
    }

    pub fn with_pinch(mut self, distance: f32) -> Self {
        self.pinch_distance = distance;
        self
    }

    pub fn with_noise(mut self, sigma: f32) -> Self {
        self.noise = sigma;
        self
    }

    /// Exact skeleton, ignoring `noise`.
    pub fn skeleton(&self) -> Vec<Landmark> {
        let wrist = Landmark::new(self.wrist[0], self.wrist[1], 0.0);
        let palm = self.palm_size;
        let reach = self.openness * palm;

        // Joints default to the palm centre
        let palm_centre = wrist - Vector3::new(0.0, palm * 0.5, 0.0);
        let mut points = vec![palm_centre; LANDMARK_COUNT];
        points[landmark::WRIST] = wrist;
        points[landmark::MIDDLE_MCP] = wrist - Vector3::new(0.0, palm, 0.0);

        for (tip, angle) in landmark::FINGERTIPS.iter().zip(FAN) {
            points[*tip] = wrist + Vector3::new(angle.sin(), -angle.cos(), 0.0) * reach;
        }

        // Thumb tip sits beside the index tip, across the fan
        points[landmark::THUMB_TIP] =
            points[landmark::INDEX_TIP] + Vector3::new(0.0, 0.0, self.pinch_distance);
        points
    }

    /// Classifier-shaped detection, with landmark noise drawn from `rng`.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> HandDetection {
        let mut landmarks = self.skeleton();
        if self.noise > 0.0 {
            if let Ok(normal) = Normal::new(0.0, self.noise) {
                for p in &mut landmarks {
                    p.x += normal.sample(rng);
                    p.y += normal.sample(rng);
                    p.z += normal.sample(rng);
                }
            }
        }

        let gestures = if self.label.is_empty() {
            vec![GestureCategory::new("None", self.score)]
        } else {
            vec![GestureCategory::new(self.label.as_str(), self.score)]
        };
        HandDetection { gestures, landmarks }
    }
}
