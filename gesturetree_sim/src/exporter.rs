//! JSON exporter for offline visualisation.
//!
//! Exports sampled simulation frames as JSON.

use gesturetree_core::{FrameMetrics, FrameReport, LightboxEvent, LightboxPhase, SceneState};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single sampled frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    pub scene: SceneState,
    pub lightbox_phase: LightboxPhase,
    pub lightbox_opacity: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_photo: Option<usize>,

    pub hand_present: bool,
    pub pinch: bool,
    pub camera_yaw: f32,
    pub live_batches: usize,
    pub particle_count: usize,

    /// Edges that happened on this frame
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

impl SimFrame {
    pub fn from_report(report: &FrameReport) -> Self {
        let mut events = Vec::new();
        if report.scene_changed {
            events.push(format!("scene -> {}", report.scene));
        }
        for event in &report.lightbox_events {
            events.push(match event {
                LightboxEvent::Opened { photo } => format!("lightbox opened on photo {}", photo),
                LightboxEvent::FadedIn => "lightbox faded in".to_string(),
                LightboxEvent::CloseStarted => "lightbox closing".to_string(),
                LightboxEvent::Closed => "lightbox closed".to_string(),
            });
        }
        if let Some(status) = &report.intake.status {
            events.push(format!("status: {}", status));
        }

        Self {
            time_sec: report.timestamp.as_secs_f64(),
            scene: report.scene,
            lightbox_phase: report.lightbox.phase,
            lightbox_opacity: report.lightbox.opacity,
            selected_photo: report.lightbox.selected_photo,
            hand_present: report.intake.hand_present,
            pinch: report.intake.pinch,
            camera_yaw: report.camera_yaw,
            live_batches: report.live_batches,
            particle_count: report.particle_count,
            events,
        }
    }

    /// Frames with edges are always exported, whatever the sampling interval.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Sampled frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    pub metrics: FrameMetrics,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
            metrics: FrameMetrics::default(),
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>, metrics: FrameMetrics) {
        self.passed = passed;
        self.failure_reason = failure_reason;
        self.metrics = metrics;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(t: f64, events: Vec<String>) -> SimFrame {
        SimFrame {
            time_sec: t,
            scene: SceneState::Formed,
            lightbox_phase: LightboxPhase::Closed,
            lightbox_opacity: 0.0,
            selected_photo: None,
            hand_present: true,
            pinch: false,
            camera_yaw: 0.0,
            live_batches: 1,
            particle_count: 400,
            events,
        }
    }

    #[test]
    fn test_duration_tracks_last_frame() {
        let mut export = SimExport::new("pinch_open", 42);
        export.add_frame(frame(0.5, vec![]));
        export.add_frame(frame(1.25, vec!["lightbox closed".into()]));
        assert_eq!(export.duration_sec, 1.25);
        assert!(export.frames[1].has_events());
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let json = serde_json::to_value(frame(0.0, vec![])).unwrap();
        assert!(json.get("events").is_none());
        assert!(json.get("selected_photo").is_none());
        assert_eq!(json["scene"], "formed");
        assert_eq!(json["lightbox_phase"], "closed");
    }
}
