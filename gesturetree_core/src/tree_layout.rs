//! The "LAYOUT" Engine - Procedural dual-position generation
//!
//! Every entity gets two positions at construction:
//! - a **chaos** position scattered inside a per-population bounding volume,
//!   biased toward the bottom so loose entities pool at the tree base
//! - a **formed** position inside a cone (the assembled tree)
//!
//! Generation is pure: the same RNG state always yields the same layout.

use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

// ============================================================================
// SHAPES
// ============================================================================

/// Bounding volume for the chaos layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ChaosVolume {
    /// Sphere centred on the origin
    Sphere { radius: f32 },

    /// Axis-aligned box centred on the origin
    Cuboid { half_extents: [f32; 3] },
}

impl ChaosVolume {
    /// Half of the vertical extent.
    pub fn half_height(&self) -> f32 {
        match self {
            ChaosVolume::Sphere { radius } => *radius,
            ChaosVolume::Cuboid { half_extents } => half_extents[1],
        }
    }

    /// True if `p` lies inside the volume (with a small tolerance).
    pub fn contains(&self, p: &Vector3<f32>) -> bool {
        const EPS: f32 = 1e-4;
        match self {
            ChaosVolume::Sphere { radius } => p.norm() <= radius + EPS,
            ChaosVolume::Cuboid { half_extents } => {
                p.x.abs() <= half_extents[0] + EPS
                    && p.y.abs() <= half_extents[1] + EPS
                    && p.z.abs() <= half_extents[2] + EPS
            }
        }
    }
}

/// The assembled tree: a cone standing on the XZ plane, centred on the Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeShape {
    /// Total height of the cone
    pub height: f32,

    /// Radius at the base (y = -height / 2)
    pub base_radius: f32,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self {
            height: 22.0,
            base_radius: 9.0,
        }
    }
}

impl TreeShape {
    pub fn half_height(&self) -> f32 {
        self.height * 0.5
    }

    /// Cone radius at height `y`; zero at the apex, `base_radius` at the base.
    pub fn local_radius(&self, y: f32) -> f32 {
        if self.height <= 0.0 {
            return 0.0;
        }
        let normalized = ((y + self.half_height()) / self.height).clamp(0.0, 1.0);
        self.base_radius * (1.0 - normalized)
    }

    /// Top of the tree (where the transition firework explodes).
    pub fn apex(&self) -> Vector3<f32> {
        Vector3::new(0.0, self.half_height(), 0.0)
    }
}

// ============================================================================
// PER-POPULATION PARAMETERS
// ============================================================================

/// Layout and per-entity parameter ranges for one population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Where entities scatter in chaos mode
    pub chaos_volume: ChaosVolume,

    /// Exponent applied to the uniform Y sample (>= 2 pools entities low)
    pub y_bias_exponent: f32,

    /// Added to the sampled cone radius so entities sit off the surface
    pub radius_offset: f32,

    /// Uniform scale range [min, max]
    pub scale_range: [f32; 2],

    /// Chaos-mode angular speed range in rad/s [min, max]
    pub spin_range: [f32; 2],

    /// Per-entity interpolation weight range [min, max]
    pub weight_range: [f32; 2],

    /// Colours picked uniformly per entity (RGB, linear)
    pub palette: Vec<[f32; 3]>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            chaos_volume: ChaosVolume::Sphere { radius: 25.0 },
            y_bias_exponent: 2.0,
            radius_offset: 0.0,
            scale_range: [0.05, 0.15],
            spin_range: [0.0, 0.0],
            weight_range: [0.6, 1.4],
            palette: vec![[0.02, 0.35, 0.12], [0.05, 0.45, 0.18], [0.85, 0.7, 0.2]],
        }
    }
}

/// Everything generated once for an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySeed {
    pub chaos_position: Vector3<f32>,
    pub target_position: Vector3<f32>,
    pub scale: f32,
    pub color: [f32; 3],
    /// Angular velocity per axis (rad/s) in chaos mode
    pub spin: Vector3<f32>,
    /// Phase offset for the formed-mode wobble
    pub phase: f32,
    /// Interpolation weight multiplier
    pub weight: f32,
}

// ============================================================================
// GENERATORS
// ============================================================================

/// Samples a value in `[range[0], range[1]]`, tolerating a degenerate range.
fn sample_range<R: Rng + ?Sized>(rng: &mut R, range: [f32; 2]) -> f32 {
    let (lo, hi) = if range[0] <= range[1] {
        (range[0], range[1])
    } else {
        (range[1], range[0])
    };
    lo + rng.gen::<f32>() * (hi - lo)
}

/// Scattered position inside `volume` with a bottom-heavy Y distribution.
///
/// Y is `-h + 2h * u^exponent` for uniform `u`, so with exponent 2 roughly
/// 70% of entities land in the lower half.
pub fn chaos_position<R: Rng + ?Sized>(
    rng: &mut R,
    volume: &ChaosVolume,
    y_bias_exponent: f32,
) -> Vector3<f32> {
    let half = volume.half_height();
    let u: f32 = rng.gen();
    let y = -half + 2.0 * half * u.powf(y_bias_exponent.max(1.0));

    match volume {
        ChaosVolume::Sphere { radius } => {
            // Uniform point in the horizontal disc that fits at this height
            let limit = (radius * radius - y * y).max(0.0).sqrt();
            let r = limit * rng.gen::<f32>().sqrt();
            let theta = rng.gen::<f32>() * TAU;
            Vector3::new(r * theta.cos(), y, r * theta.sin())
        }
        ChaosVolume::Cuboid { half_extents } => {
            let x = (rng.gen::<f32>() * 2.0 - 1.0) * half_extents[0];
            let z = (rng.gen::<f32>() * 2.0 - 1.0) * half_extents[2];
            Vector3::new(x, y, z)
        }
    }
}

/// Position inside the tree cone.
///
/// Y is uniform over the tree height; the radial distance is uniform in
/// `[0, local_radius(y)]` plus `radius_offset`.
pub fn formed_position<R: Rng + ?Sized>(
    rng: &mut R,
    shape: &TreeShape,
    radius_offset: f32,
) -> Vector3<f32> {
    let half = shape.half_height();
    let y = -half + rng.gen::<f32>() * shape.height;
    let local = shape.local_radius(y);
    let theta = rng.gen::<f32>() * TAU;
    let r = rng.gen::<f32>() * local + radius_offset;
    Vector3::new(r * theta.cos(), y, r * theta.sin())
}

/// Generates `count` entity seeds for one population.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    shape: &TreeShape,
    config: &LayoutConfig,
) -> Vec<EntitySeed> {
    (0..count)
        .map(|_| {
            let chaos_position = chaos_position(rng, &config.chaos_volume, config.y_bias_exponent);
            let target_position = formed_position(rng, shape, config.radius_offset);
            let scale = sample_range(rng, config.scale_range);
            let color = if config.palette.is_empty() {
                [1.0, 1.0, 1.0]
            } else {
                config.palette[rng.gen_range(0..config.palette.len())]
            };
            let spin = Vector3::new(
                sample_range(rng, config.spin_range),
                sample_range(rng, config.spin_range),
                sample_range(rng, config.spin_range),
            );
            let phase = rng.gen::<f32>() * TAU;
            let weight = sample_range(rng, config.weight_range);

            EntitySeed {
                chaos_position,
                target_position,
                scale,
                color,
                spin,
                phase,
                weight,
            }
        })
        .collect()
}
