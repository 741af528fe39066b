//! Aggregate configuration for the whole tree, loadable from JSON.

use crate::camera::CameraConfig;
use crate::tree_bursts::{BurstConfig, BurstProfile};
use crate::tree_gesture::GestureConfig;
use crate::tree_layout::TreeShape;
use crate::tree_lightbox::LightboxConfig;
use crate::tree_motion::{PopulationConfig, PopulationKind};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every tunable in one place. Missing JSON fields keep their defaults;
/// a population section is read over the defaults of its own kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub tree: TreeShape,
    #[serde(deserialize_with = "foliage_section")]
    pub foliage: PopulationConfig,
    #[serde(deserialize_with = "ornament_section")]
    pub ornaments: PopulationConfig,
    #[serde(deserialize_with = "decoration_section")]
    pub decorations: PopulationConfig,
    #[serde(deserialize_with = "light_section")]
    pub lights: PopulationConfig,
    pub bursts: BurstConfig,
    pub gesture: GestureConfig,
    pub lightbox: LightboxConfig,
    pub camera: CameraConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            tree: TreeShape::default(),
            foliage: PopulationConfig::for_kind(PopulationKind::Foliage),
            ornaments: PopulationConfig::for_kind(PopulationKind::Ornament),
            decorations: PopulationConfig::for_kind(PopulationKind::Decoration),
            lights: PopulationConfig::for_kind(PopulationKind::Light),
            bursts: BurstConfig::default(),
            gesture: GestureConfig::default(),
            lightbox: LightboxConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

/// Longest duration any timer-backed setting may ask for.
const MAX_DURATION_SECS: f32 = 86_400.0;

/// Overlays `overlay` onto `base` field by field. Tagged enums (objects
/// carrying a `shape` tag) are replaced outright when the tag changes.
fn merge_over(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(target), Value::Object(fields)) if same_tag(&*target, &fields) => {
            for (key, value) in fields {
                match target.get_mut(&key) {
                    Some(slot) => merge_over(slot, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn same_tag(base: &serde_json::Map<String, Value>, overlay: &serde_json::Map<String, Value>) -> bool {
    match (base.get("shape"), overlay.get("shape")) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Deserializes a section as a partial overlay onto `defaults`.
pub(crate) fn section_over<'de, T, D>(defaults: T, deserializer: D) -> Result<T, D::Error>
where
    T: Serialize + DeserializeOwned,
    D: Deserializer<'de>,
{
    let overlay = Value::deserialize(deserializer)?;
    let mut merged = serde_json::to_value(defaults).map_err(D::Error::custom)?;
    merge_over(&mut merged, overlay);
    serde_json::from_value(merged).map_err(D::Error::custom)
}

fn population_section<'de, D>(kind: PopulationKind, deserializer: D) -> Result<PopulationConfig, D::Error>
where
    D: Deserializer<'de>,
{
    section_over(PopulationConfig::for_kind(kind), deserializer)
}

fn foliage_section<'de, D: Deserializer<'de>>(d: D) -> Result<PopulationConfig, D::Error> {
    population_section(PopulationKind::Foliage, d)
}

fn ornament_section<'de, D: Deserializer<'de>>(d: D) -> Result<PopulationConfig, D::Error> {
    population_section(PopulationKind::Ornament, d)
}

fn decoration_section<'de, D: Deserializer<'de>>(d: D) -> Result<PopulationConfig, D::Error> {
    population_section(PopulationKind::Decoration, d)
}

fn light_section<'de, D: Deserializer<'de>>(d: D) -> Result<PopulationConfig, D::Error> {
    population_section(PopulationKind::Light, d)
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid(message()))
    }
}

fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
    ensure(value.is_finite() && value > 0.0, || format!("{} must be positive, got {}", name, value))
}

fn duration_secs(name: &str, value: f32) -> Result<(), ConfigError> {
    positive(name, value)?;
    ensure(value <= MAX_DURATION_SECS, || {
        format!("{} must be at most {} seconds, got {}", name, MAX_DURATION_SECS, value)
    })
}

fn ordered(name: &str, range: [f32; 2]) -> Result<(), ConfigError> {
    ensure(range[0].is_finite() && range[1].is_finite() && range[0] <= range[1], || {
        format!("{} must be an ordered [min, max] range, got {:?}", name, range)
    })
}

impl TreeConfig {
    /// Reads and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Config for one population.
    pub fn population(&self, kind: PopulationKind) -> &PopulationConfig {
        match kind {
            PopulationKind::Foliage => &self.foliage,
            PopulationKind::Ornament => &self.ornaments,
            PopulationKind::Decoration => &self.decorations,
            PopulationKind::Light => &self.lights,
        }
    }

    /// Rejects settings the engines cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("tree.height", self.tree.height)?;
        positive("tree.base_radius", self.tree.base_radius)?;

        for kind in PopulationKind::all() {
            let p = self.population(kind);
            let name = kind.name();
            positive(&format!("{}.base_rate", name), p.base_rate)?;
            ordered(&format!("{}.layout.scale_range", name), p.layout.scale_range)?;
            ordered(&format!("{}.layout.spin_range", name), p.layout.spin_range)?;
            ordered(&format!("{}.layout.weight_range", name), p.layout.weight_range)?;
            ensure(p.layout.weight_range[0] > 0.0, || {
                format!("{}.layout.weight_range must be positive", name)
            })?;
            positive(&format!("{}.layout.y_bias_exponent", name), p.layout.y_bias_exponent)?;
        }

        let g = &self.gesture;
        ensure(g.pinch_on_distance < g.pinch_off_distance, || {
            format!(
                "gesture.pinch_on_distance ({}) must be below pinch_off_distance ({})",
                g.pinch_on_distance, g.pinch_off_distance
            )
        })?;
        ensure(g.openness_band[0] < g.openness_band[1], || {
            format!("gesture.openness_band must have min < max, got {:?}", g.openness_band)
        })?;
        ensure(g.stable_frames >= 1, || "gesture.stable_frames must be at least 1".into())?;
        ensure(g.pinch_stable_frames >= 1, || "gesture.pinch_stable_frames must be at least 1".into())?;
        ensure((0.0..=1.0).contains(&g.confidence_threshold), || {
            format!("gesture.confidence_threshold must be in [0, 1], got {}", g.confidence_threshold)
        })?;

        let l = &self.lightbox;
        ensure(l.history_capacity >= 1, || "lightbox.history_capacity must be at least 1".into())?;
        ensure(l.candidate_count >= 1, || "lightbox.candidate_count must be at least 1".into())?;

        let b = &self.bursts;
        validate_profile("bursts.transition", &b.transition)?;
        validate_profile("bursts.ambient", &b.ambient)?;
        duration_secs("bursts.ambient_interval_secs", b.ambient_interval_secs)?;
        ensure(b.ambient_max_batches >= 1, || "bursts.ambient_max_batches must be at least 1".into())?;

        positive("camera.orbit_radius", self.camera.orbit_radius)?;
        Ok(())
    }
}

fn validate_profile(name: &str, profile: &BurstProfile) -> Result<(), ConfigError> {
    duration_secs(&format!("{}.lifetime_secs", name), profile.lifetime_secs)?;
    ordered(&format!("{}.speed_range", name), profile.speed_range)?;
    ordered(&format!("{}.delay_range", name), profile.delay_range)?;
    ordered(&format!("{}.particle_life_range", name), profile.particle_life_range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_layout::ChaosVolume;

    #[test]
    fn test_defaults_validate() {
        let config = TreeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lightbox.cooldown_ms, 650);
        assert_eq!(config.gesture.stable_frames, 3);
        assert_eq!(config.ornaments.count, 24);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = TreeConfig::from_json_str(r#"{"lightbox": {"cooldown_ms": 900}}"#).unwrap();
        assert_eq!(config.lightbox.cooldown_ms, 900);
        assert_eq!(config.lightbox.close_delay_ms, 400);
        assert_eq!(config.lights.count, 400);
    }

    #[test]
    fn test_partial_population_keeps_its_own_kind() {
        let config = TreeConfig::from_json_str(r#"{"ornaments": {"count": 10}}"#).unwrap();
        let ornament = PopulationConfig::for_kind(PopulationKind::Ornament);

        assert_eq!(config.ornaments.count, 10);
        assert!(config.ornaments.faces_outward);
        assert_eq!(config.ornaments.base_rate, ornament.base_rate);
        assert_eq!(config.ornaments.layout, ornament.layout);
        assert_eq!(config.foliage, PopulationConfig::for_kind(PopulationKind::Foliage));
    }

    #[test]
    fn test_partial_layout_merges_nested_fields() {
        let config = TreeConfig::from_json_str(
            r#"{"lights": {"layout": {"chaos_volume": {"half_extents": [5.0, 5.0, 5.0]}}}}"#,
        )
        .unwrap();
        let light = PopulationConfig::for_kind(PopulationKind::Light);
        assert_eq!(config.lights.layout.chaos_volume, ChaosVolume::Cuboid { half_extents: [5.0, 5.0, 5.0] });
        assert_eq!(config.lights.layout.palette, light.layout.palette);
        assert_eq!(config.lights.count, light.count);
    }

    #[test]
    fn test_chaos_shape_switch_replaces_volume() {
        let config = TreeConfig::from_json_str(
            r#"{"decorations": {"layout": {"chaos_volume": {"shape": "sphere", "radius": 9.0}}}}"#,
        )
        .unwrap();
        assert_eq!(config.decorations.layout.chaos_volume, ChaosVolume::Sphere { radius: 9.0 });
        assert_eq!(config.decorations.count, 160);
    }

    #[test]
    fn test_partial_ambient_profile_keeps_ambient_defaults() {
        let config = TreeConfig::from_json_str(r#"{"bursts": {"ambient": {"particle_count": 80}}}"#).unwrap();
        assert_eq!(config.bursts.ambient.particle_count, 80);
        assert_eq!(config.bursts.ambient.lifetime_secs, BurstProfile::ambient().lifetime_secs);
        assert_eq!(config.bursts.ambient.palette, BurstProfile::ambient().palette);
        assert_eq!(config.bursts.transition, BurstProfile::default());
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let err = TreeConfig::from_json_str(r#"{"bursts": {"transition": {"lifetime_secs": 1e30}}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("lifetime_secs")));

        let mut config = TreeConfig::default();
        config.bursts.ambient_interval_secs = 1e12;
        assert!(config.validate().is_err());

        config.bursts.ambient_interval_secs = MAX_DURATION_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_pinch_thresholds_rejected() {
        let mut config = TreeConfig::default();
        config.gesture.pinch_on_distance = 0.12;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("pinch_on_distance")));
    }

    #[test]
    fn test_zero_history_rejected() {
        let mut config = TreeConfig::default();
        config.lightbox.history_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let err = TreeConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TreeConfig::from_json_file("/nonexistent/gesturetree.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let config = TreeConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(TreeConfig::from_json_str(&text).unwrap(), config);
    }
}
