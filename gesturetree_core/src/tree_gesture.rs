//! The "GESTURE" Engine - Debounced intake of classifier output
//!
//! Turns a noisy per-frame stream of `{label, confidence, landmarks}` into
//! discrete, debounced intents:
//!
//! 1. **Label stability**: a label must repeat for `stable_frames` frames
//! 2. **Scene intents**: confident + stable palm/fist set CHAOS/FORMED
//! 3. **Rotation**: wrist offset from centre, with a dead zone
//! 4. **Pinch**: thumb-index distance with hysteresis, gated by a hand
//!    openness band and its own run-length debounce; palm/fist labels win
//! 5. **Absence**: no hand (or a classifier failure) resets everything
//!
//! Classifier failures never escape this module; they become "no hand" plus a
//! deduplicated status line.

use crate::tree_motion::SceneState;
use gesturetree_env::{landmark, ClassifierResult, HandDetection, Landmark};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the gesture intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Minimum confidence (exclusive) for a discrete gesture
    pub confidence_threshold: f32,

    /// Consecutive frames a label must persist before it acts
    pub stable_frames: u32,

    /// Label that scatters the tree
    pub chaos_label: String,

    /// Label that assembles the tree
    pub formed_label: String,

    /// Rotation delta per unit of wrist offset from centre
    pub rotation_gain: f32,

    /// Deltas smaller than this are dropped
    pub rotation_dead_zone: f32,

    /// Horizontal image coordinate treated as "no rotation"
    pub rotation_center: f32,

    /// Thumb-index distance below which a pinch starts
    pub pinch_on_distance: f32,

    /// Thumb-index distance above which a pinch ends
    pub pinch_off_distance: f32,

    /// Consecutive disagreeing frames before the pinch state flips
    pub pinch_stable_frames: u32,

    /// Accepted openness score range [min, max]
    pub openness_band: [f32; 2],
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            stable_frames: 3,
            chaos_label: "Open_Palm".to_string(),
            formed_label: "Closed_Fist".to_string(),
            rotation_gain: 0.05,
            rotation_dead_zone: 0.005,
            rotation_center: 0.5,
            pinch_on_distance: 0.07,
            pinch_off_distance: 0.10,
            pinch_stable_frames: 2,
            openness_band: [1.0, 1.8],
        }
    }
}

// ============================================================================
// MEASUREMENTS
// ============================================================================

/// Geometry extracted from one hand for pinch detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchMeasurement {
    /// 3D distance between thumb tip and index tip
    pub distance: f32,

    /// Mean wrist-to-fingertip distance over palm size
    pub openness: f32,
}

fn distance(a: &Landmark, b: &Landmark) -> f32 {
    (a - b).norm()
}

/// Measures pinch distance and openness.
///
/// `None` if the skeleton is incomplete, degenerate (zero palm size) or
/// contains non-finite coordinates.
pub fn measure_pinch(hand: &HandDetection) -> Option<PinchMeasurement> {
    if !hand.has_skeleton() {
        return None;
    }
    let wrist = hand.landmark(landmark::WRIST)?;
    let thumb = hand.landmark(landmark::THUMB_TIP)?;
    let index = hand.landmark(landmark::INDEX_TIP)?;
    let palm = distance(&wrist, &hand.landmark(landmark::MIDDLE_MCP)?);

    let mut reach = 0.0;
    for tip in landmark::FINGERTIPS {
        reach += distance(&wrist, &hand.landmark(tip)?);
    }
    let openness = reach / landmark::FINGERTIPS.len() as f32 / palm;
    let measurement = PinchMeasurement {
        distance: distance(&thumb, &index),
        openness,
    };

    if palm > f32::EPSILON && measurement.distance.is_finite() && measurement.openness.is_finite() {
        Some(measurement)
    } else {
        None
    }
}

// ============================================================================
// STATUS REPORTING
// ============================================================================

/// Reports each distinct status message once per outage.
///
/// Every message surfaced since the classifier last succeeded is
/// remembered, so an error that recurs (even interleaved with others)
/// produces a single status line. A successful frame ends the outage and
/// the next failure is reported again.
#[derive(Debug, Clone, Default)]
pub struct StatusReporter {
    seen: HashSet<String>,
    last: Option<String>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Some(message)` if it should be shown now.
    pub fn report(&mut self, message: &str) -> Option<String> {
        if !self.seen.insert(message.to_string()) {
            return None;
        }
        self.last = Some(message.to_string());
        Some(message.to_string())
    }

    /// Classifier recovered.
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

// ============================================================================
// INTAKE
// ============================================================================

/// Debouncer memory carried across frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebounceState {
    /// Label seen on the previous frame (`None` after a reset)
    pub last_label: Option<String>,

    /// Frames the current label has repeated (0 on the first frame)
    pub stable_count: u32,

    /// Committed pinch state
    pub pinch: bool,

    /// Consecutive frames the raw pinch reading disagreed with `pinch`
    pub pinch_change_count: u32,
}

impl DebounceState {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Intents produced by one frame of intake.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntakeOutput {
    /// Debounced request to move to a scene state (idempotent)
    pub scene_request: Option<SceneState>,

    /// Continuous rotation delta for the camera rig
    pub rotation_delta: f32,

    /// Committed pinch state
    pub pinch: bool,

    /// True on the frame the committed pinch state flipped
    pub pinch_changed: bool,

    /// A hand with a full skeleton was present
    pub hand_present: bool,

    /// The classifier failed for this frame
    pub classifier_failed: bool,

    /// Status line to surface (deduplicated)
    pub status: Option<String>,
}

/// Consumes classifier results and produces debounced intents.
pub struct GestureIntake {
    config: GestureConfig,
    state: DebounceState,
    status: StatusReporter,
    last_output: IntakeOutput,
}

/// "None" is the classifier's explicit no-gesture label.
fn normalize_label(label: &str) -> &str {
    if label == "None" {
        ""
    } else {
        label
    }
}

impl GestureIntake {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: DebounceState::default(),
            status: StatusReporter::new(),
            last_output: IntakeOutput::default(),
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn pinch(&self) -> bool {
        self.state.pinch
    }

    /// Output for a frame with no new classifier result.
    ///
    /// The debounced state is held: rotation continues at the last delta, the
    /// pinch stays committed and no new scene request is emitted.
    pub fn hold(&self) -> IntakeOutput {
        IntakeOutput {
            scene_request: None,
            pinch_changed: false,
            status: None,
            classifier_failed: false,
            ..self.last_output.clone()
        }
    }

    /// Processes one classifier result.
    pub fn process(&mut self, result: &ClassifierResult) -> IntakeOutput {
        let output = match result {
            Err(err) => {
                let message = err.to_string();
                let status = self.status.report(&message);
                if status.is_some() {
                    warn!("Gesture classifier unavailable: {}", message);
                }
                let mut output = self.absent();
                output.classifier_failed = true;
                output.status = status;
                output
            }
            Ok(output) => {
                self.status.clear();
                match output.primary_hand() {
                    Some(hand) => match measure_pinch(hand) {
                        Some(measurement) => self.present(hand, measurement),
                        None => self.absent(),
                    },
                    None => self.absent(),
                }
            }
        };
        self.last_output = output.clone();
        output
    }

    /// No hand: everything resets.
    fn absent(&mut self) -> IntakeOutput {
        let was_pinching = self.state.pinch;
        self.state.reset();
        IntakeOutput {
            pinch_changed: was_pinching,
            ..IntakeOutput::default()
        }
    }

    fn present(&mut self, hand: &HandDetection, measurement: PinchMeasurement) -> IntakeOutput {
        let (label, confidence) = hand
            .top_gesture()
            .map(|g| (normalize_label(&g.label), g.score))
            .unwrap_or(("", 0.0));

        // 1. Label stability
        if self.state.last_label.as_deref() == Some(label) {
            self.state.stable_count = self.state.stable_count.saturating_add(1);
        } else {
            self.state.last_label = Some(label.to_string());
            self.state.stable_count = 0;
        }

        // 2. Discrete scene intents
        let is_chaos = label == self.config.chaos_label;
        let is_formed = label == self.config.formed_label;
        let stable = self.state.stable_count + 1 >= self.config.stable_frames;
        let scene_request = if confidence > self.config.confidence_threshold && stable {
            if is_chaos {
                Some(SceneState::Chaos)
            } else if is_formed {
                Some(SceneState::Formed)
            } else {
                None
            }
        } else {
            None
        };

        // 3. Rotation from wrist offset
        let rotation_delta = hand
            .landmark(landmark::WRIST)
            .map(|wrist| (wrist.x - self.config.rotation_center) * self.config.rotation_gain)
            .filter(|delta| delta.abs() >= self.config.rotation_dead_zone)
            .unwrap_or(0.0);

        // 4. Pinch (palm/fist labels take priority)
        let pinch_changed = if is_chaos || is_formed {
            let was = self.state.pinch;
            self.state.pinch = false;
            self.state.pinch_change_count = 0;
            was
        } else {
            self.update_pinch(measurement)
        };

        if pinch_changed {
            debug!("Pinch committed: {}", self.state.pinch);
        }

        IntakeOutput {
            scene_request,
            rotation_delta,
            pinch: self.state.pinch,
            pinch_changed,
            hand_present: true,
            classifier_failed: false,
            status: None,
        }
    }

    /// Applies hysteresis and run-length debounce; returns true on a flip.
    fn update_pinch(&mut self, measurement: PinchMeasurement) -> bool {
        let threshold = if self.state.pinch {
            self.config.pinch_off_distance
        } else {
            self.config.pinch_on_distance
        };
        let [open_min, open_max] = self.config.openness_band;
        let in_band = measurement.openness >= open_min && measurement.openness <= open_max;
        let raw = measurement.distance < threshold && in_band;

        if raw == self.state.pinch {
            self.state.pinch_change_count = 0;
            return false;
        }

        self.state.pinch_change_count += 1;
        if self.state.pinch_change_count >= self.config.pinch_stable_frames.max(1) {
            self.state.pinch = raw;
            self.state.pinch_change_count = 0;
            true
        } else {
            false
        }
    }
}
