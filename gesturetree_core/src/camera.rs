//! Orbit camera driven by hand rotation deltas.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Horizontal distance from the tree axis
    pub orbit_radius: f32,

    /// Camera height above the tree centre
    pub height: f32,

    /// Y of the look-at target on the tree axis
    pub target_y: f32,

    /// Starting yaw (radians); 0 looks down -Z from +Z
    pub initial_yaw: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            orbit_radius: 32.0,
            height: 4.0,
            target_y: 0.0,
            initial_yaw: 0.0,
        }
    }
}

/// Camera orbiting the tree axis at a fixed radius and height.
#[derive(Debug, Clone)]
pub struct CameraRig {
    config: CameraConfig,
    yaw: f32,
}

impl CameraRig {
    pub fn new(config: CameraConfig) -> Self {
        let yaw = wrap(config.initial_yaw);
        Self { config, yaw }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Current yaw in [-PI, PI).
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Accumulates a yaw delta. Non-finite deltas are ignored.
    pub fn apply_rotation(&mut self, delta: f32) {
        if delta.is_finite() {
            self.yaw = wrap(self.yaw + delta);
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        Vector3::new(
            self.config.orbit_radius * self.yaw.sin(),
            self.config.height,
            self.config.orbit_radius * self.yaw.cos(),
        )
    }

    pub fn look_at(&self) -> Point3<f32> {
        Point3::new(0.0, self.config.target_y, 0.0)
    }

    /// Unit vector from the camera towards the look-at target.
    pub fn forward(&self) -> Vector3<f32> {
        (self.look_at().coords - self.position())
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vector3::z())
    }
}

fn wrap(a: f32) -> f32 {
    (a + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_camera_sits_on_positive_z() {
        let rig = CameraRig::new(CameraConfig::default());
        let p = rig.position();
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 4.0);
        assert_relative_eq!(p.z, 32.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rotation_keeps_orbit_radius() {
        let mut rig = CameraRig::new(CameraConfig::default());
        for _ in 0..100 {
            rig.apply_rotation(0.3);
        }
        let p = rig.position();
        assert_relative_eq!((p.x * p.x + p.z * p.z).sqrt(), 32.0, epsilon = 1e-3);
        assert!(rig.yaw() >= -PI && rig.yaw() <= PI);
    }

    #[test]
    fn test_quarter_turn_moves_to_positive_x() {
        let mut rig = CameraRig::new(CameraConfig::default());
        rig.apply_rotation(PI / 2.0);
        assert_relative_eq!(rig.position().x, 32.0, epsilon = 1e-4);
        assert_relative_eq!(rig.position().z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_nan_delta_is_ignored() {
        let mut rig = CameraRig::new(CameraConfig::default());
        rig.apply_rotation(0.2);
        rig.apply_rotation(f32::NAN);
        assert_relative_eq!(rig.yaw(), 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_forward_points_at_target() {
        let rig = CameraRig::new(CameraConfig::default());
        let f = rig.forward();
        assert_relative_eq!(f.norm(), 1.0, epsilon = 1e-5);
        assert!(f.z < 0.0);
    }
}
