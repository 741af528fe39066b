//! Per-session counters reported by the runtime.

use crate::tree_bursts::BurstUpdate;
use crate::tree_lightbox::LightboxEvent;
use serde::{Deserialize, Serialize};

/// Running counters over every processed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMetrics {
    pub frames: u64,
    pub scene_toggles: u64,
    pub lightbox_opens: u64,
    pub lightbox_closes: u64,
    pub bursts_spawned: u64,
    pub bursts_evicted: u64,
    pub classifier_errors: u64,
    pub peak_particles: usize,
}

impl FrameMetrics {
    pub fn record_lightbox(&mut self, events: &[LightboxEvent]) {
        for event in events {
            match event {
                LightboxEvent::Opened { .. } => self.lightbox_opens += 1,
                LightboxEvent::Closed => self.lightbox_closes += 1,
                LightboxEvent::FadedIn | LightboxEvent::CloseStarted => {}
            }
        }
    }

    pub fn record_bursts(&mut self, update: &BurstUpdate, live_particles: usize) {
        self.bursts_spawned += update.spawned as u64;
        self.bursts_evicted += update.evicted as u64;
        self.peak_particles = self.peak_particles.max(live_particles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lightbox_events_counted() {
        let mut m = FrameMetrics::default();
        m.record_lightbox(&[
            LightboxEvent::Opened { photo: 3 },
            LightboxEvent::FadedIn,
            LightboxEvent::CloseStarted,
            LightboxEvent::Closed,
        ]);
        assert_eq!(m.lightbox_opens, 1);
        assert_eq!(m.lightbox_closes, 1);
    }

    #[test]
    fn test_peak_particles_is_max() {
        let mut m = FrameMetrics::default();
        m.record_bursts(&BurstUpdate { spawned: 1, evicted: 0 }, 400);
        m.record_bursts(&BurstUpdate { spawned: 0, evicted: 1 }, 0);
        assert_eq!(m.peak_particles, 400);
        assert_eq!(m.bursts_spawned, 1);
        assert_eq!(m.bursts_evicted, 1);
    }
}
