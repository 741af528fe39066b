//! The "MOTION" Engine - Population animator
//!
//! Each population is a flat arena of entities. Every frame each entity's
//! position moves a fraction of the way toward the target of the active
//! scene state:
//!
//! ```text
//! alpha    = 1 - exp(-base_rate * weight * dt)
//! position = position + (target - position) * alpha
//! ```
//!
//! `alpha` is strictly inside (0, 1) for any positive `dt`, so motion is an
//! exponential decay: it never overshoots and never lands exactly on the
//! target in finite time. Toggling the scene state mid-flight therefore never
//! produces a visible snap.

use crate::tree_layout::{self, ChaosVolume, EntitySeed, LayoutConfig, TreeShape};
use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

// ============================================================================
// SCENE STATE
// ============================================================================

/// Which spatial configuration every population is heading toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneState {
    /// Scattered cloud
    #[default]
    Chaos,

    /// Assembled tree
    Formed,
}

impl SceneState {
    pub fn toggled(self) -> Self {
        match self {
            SceneState::Chaos => SceneState::Formed,
            SceneState::Formed => SceneState::Chaos,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SceneState::Chaos => "chaos",
            SceneState::Formed => "formed",
        }
    }
}

impl std::fmt::Display for SceneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// The kinds of population making up the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationKind {
    /// Needle points
    Foliage,
    /// Photo frames; each maps to a photo by index wraparound
    Ornament,
    /// Gift boxes and baubles
    Decoration,
    /// Fairy lights
    Light,
}

impl PopulationKind {
    pub fn all() -> [PopulationKind; 4] {
        [
            PopulationKind::Foliage,
            PopulationKind::Ornament,
            PopulationKind::Decoration,
            PopulationKind::Light,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PopulationKind::Foliage => "foliage",
            PopulationKind::Ornament => "ornament",
            PopulationKind::Decoration => "decoration",
            PopulationKind::Light => "light",
        }
    }

    /// Salt for this population's RNG stream.
    pub fn stream_salt(&self) -> u64 {
        match self {
            PopulationKind::Foliage => 1,
            PopulationKind::Ornament => 2,
            PopulationKind::Decoration => 3,
            PopulationKind::Light => 4,
        }
    }
}

/// Configuration for one population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Number of entities (fixed for the session)
    pub count: usize,

    /// Population-wide convergence rate (1/s), multiplied by each entity's weight
    pub base_rate: f32,

    /// Formed-mode entities turn to face away from the tree axis
    pub faces_outward: bool,

    /// Formed-mode wobble amplitude (radians)
    pub wobble_amplitude: f32,

    /// Formed-mode wobble frequency (rad/s)
    pub wobble_frequency: f32,

    /// Layout generator parameters
    pub layout: LayoutConfig,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self::for_kind(PopulationKind::Foliage)
    }
}

impl PopulationConfig {
    /// Tuned defaults per population kind.
    pub fn for_kind(kind: PopulationKind) -> Self {
        match kind {
            PopulationKind::Foliage => Self {
                count: 6000,
                base_rate: 2.0,
                faces_outward: false,
                wobble_amplitude: 0.0,
                wobble_frequency: 0.0,
                layout: LayoutConfig::default(),
            },
            PopulationKind::Ornament => Self {
                count: 24,
                base_rate: 1.4,
                faces_outward: true,
                wobble_amplitude: 0.08,
                wobble_frequency: 1.3,
                layout: LayoutConfig {
                    chaos_volume: ChaosVolume::Cuboid { half_extents: [18.0, 14.0, 18.0] },
                    y_bias_exponent: 2.0,
                    radius_offset: 0.6,
                    scale_range: [0.9, 1.2],
                    spin_range: [0.2, 0.8],
                    weight_range: [0.7, 1.3],
                    palette: vec![[1.0, 1.0, 1.0]],
                },
            },
            PopulationKind::Decoration => Self {
                count: 160,
                base_rate: 1.8,
                faces_outward: false,
                wobble_amplitude: 0.15,
                wobble_frequency: 0.9,
                layout: LayoutConfig {
                    chaos_volume: ChaosVolume::Cuboid { half_extents: [20.0, 15.0, 20.0] },
                    y_bias_exponent: 2.5,
                    radius_offset: 0.3,
                    scale_range: [0.3, 0.6],
                    spin_range: [0.5, 1.5],
                    weight_range: [0.6, 1.4],
                    palette: vec![[0.8, 0.1, 0.1], [0.9, 0.75, 0.2], [0.9, 0.9, 0.95]],
                },
            },
            PopulationKind::Light => Self {
                count: 400,
                base_rate: 2.6,
                faces_outward: false,
                wobble_amplitude: 0.0,
                wobble_frequency: 0.0,
                layout: LayoutConfig {
                    chaos_volume: ChaosVolume::Cuboid { half_extents: [22.0, 16.0, 22.0] },
                    y_bias_exponent: 2.0,
                    radius_offset: 0.15,
                    scale_range: [0.08, 0.16],
                    spin_range: [0.0, 0.0],
                    weight_range: [0.5, 1.5],
                    palette: vec![[1.0, 0.85, 0.5], [1.0, 0.6, 0.3], [0.7, 0.8, 1.0]],
                },
            },
        }
    }
}

// ============================================================================
// ENTITY ARENA
// ============================================================================

/// One animated member of a population.
///
/// Only `position` and `rotation` change after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    chaos_position: Vector3<f32>,
    target_position: Vector3<f32>,
    position: Vector3<f32>,
    /// Euler angles (pitch, yaw, roll), each kept in [-PI, PI)
    rotation: Vector3<f32>,
    scale: f32,
    color: [f32; 3],
    spin: Vector3<f32>,
    phase: f32,
    weight: f32,
}

impl Entity {
    /// Creates an entity resting at its chaos position.
    pub fn from_seed(seed: EntitySeed) -> Self {
        Self {
            chaos_position: seed.chaos_position,
            target_position: seed.target_position,
            position: seed.chaos_position,
            rotation: Vector3::zeros(),
            scale: seed.scale,
            color: seed.color,
            spin: seed.spin,
            phase: seed.phase,
            weight: seed.weight,
        }
    }

    pub fn chaos_position(&self) -> Vector3<f32> {
        self.chaos_position
    }

    pub fn target_position(&self) -> Vector3<f32> {
        self.target_position
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// The position this entity is converging on in `state`.
    pub fn active_target(&self, state: SceneState) -> Vector3<f32> {
        match state {
            SceneState::Formed => self.target_position,
            SceneState::Chaos => self.chaos_position,
        }
    }
}

/// Per-entity data the renderer needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityInstance {
    pub index: usize,
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: f32,
    pub color: [f32; 3],
    pub visible: bool,
    /// Backing photo for ornaments (`index % photo_count`)
    pub photo_index: Option<usize>,
}

/// Fraction of the remaining distance covered in `dt` seconds at `rate`.
///
/// Always in [0, 1); zero for non-positive or non-finite inputs.
pub fn convergence_factor(rate: f32, dt: f32) -> f32 {
    let k = rate * dt;
    if !k.is_finite() || k <= 0.0 {
        return 0.0;
    }
    (1.0 - (-k).exp()).clamp(0.0, 1.0 - f32::EPSILON)
}

/// Wraps an angle into [-PI, PI).
fn wrap_angle(a: f32) -> f32 {
    (a + PI).rem_euclid(TAU) - PI
}

/// Yaw that turns an entity at `p` to face away from the Y axis.
fn outward_yaw(p: &Vector3<f32>) -> f32 {
    if p.x == 0.0 && p.z == 0.0 {
        return 0.0;
    }
    p.x.atan2(p.z)
}

/// A homogeneous set of entities sharing a layout and animation policy.
#[derive(Debug, Clone)]
pub struct Population {
    kind: PopulationKind,
    config: PopulationConfig,
    entities: Vec<Entity>,
}

impl Population {
    /// Generates the population from `rng`.
    pub fn generate<R: Rng + ?Sized>(
        kind: PopulationKind,
        config: PopulationConfig,
        shape: &TreeShape,
        rng: &mut R,
    ) -> Self {
        let entities = tree_layout::generate(rng, config.count, shape, &config.layout)
            .into_iter()
            .map(Entity::from_seed)
            .collect();

        Self {
            kind,
            config,
            entities,
        }
    }

    pub fn kind(&self) -> PopulationKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    /// Advances every entity by one frame.
    ///
    /// `dt` is the frame delta and `elapsed` the session clock, both in
    /// seconds. Nothing is allocated.
    pub fn update(&mut self, state: SceneState, dt: f32, elapsed: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let base_rate = self.config.base_rate;
        let faces_outward = self.config.faces_outward;
        let amplitude = self.config.wobble_amplitude;
        let frequency = self.config.wobble_frequency;

        for entity in &mut self.entities {
            let alpha = convergence_factor(base_rate * entity.weight, dt);
            let target = entity.active_target(state);
            entity.position += (target - entity.position) * alpha;

            match state {
                SceneState::Formed => {
                    let wobble = (elapsed * frequency + entity.phase).sin() * amplitude;
                    let sway = (elapsed * frequency * 0.7 + entity.phase).cos() * amplitude;
                    let yaw = if faces_outward {
                        outward_yaw(&entity.position)
                    } else {
                        entity.rotation.y
                    };
                    let desired = Vector3::new(wobble, yaw, sway);
                    for axis in 0..3 {
                        let delta = wrap_angle(desired[axis] - entity.rotation[axis]);
                        entity.rotation[axis] = wrap_angle(entity.rotation[axis] + delta * alpha);
                    }
                }
                SceneState::Chaos => {
                    let spun = entity.rotation + entity.spin * dt;
                    entity.rotation = spun.map(wrap_angle);
                }
            }
        }
    }

    /// Renderer projection for this frame.
    ///
    /// Ornaments are hidden when there are no photos to show.
    pub fn instances(&self, photo_count: usize) -> impl Iterator<Item = EntityInstance> + '_ {
        let is_ornament = self.kind == PopulationKind::Ornament;
        self.entities.iter().enumerate().map(move |(index, e)| {
            let photo_index = if is_ornament {
                photo_slot(index, photo_count)
            } else {
                None
            };
            EntityInstance {
                index,
                position: e.position,
                rotation: e.rotation,
                scale: e.scale,
                color: e.color,
                visible: !is_ornament || photo_index.is_some(),
                photo_index,
            }
        })
    }

    /// Arena indices of the `n` entities closest to `point`, nearest first,
    /// paired with their distance.
    pub fn nearest_to(&self, point: &Vector3<f32>, n: usize) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (i, (e.position - point).norm()))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Photo indices backing the `n` ornaments nearest to `point`, nearest first.
    ///
    /// Empty when there are no photos.
    pub fn nearest_photos(&self, point: &Vector3<f32>, n: usize, photo_count: usize) -> Vec<usize> {
        if photo_count == 0 {
            return Vec::new();
        }
        self.nearest_to(point, n)
            .into_iter()
            .filter_map(|(i, _)| photo_slot(i, photo_count))
            .collect()
    }
}

/// Photo backing arena slot `index`, wrapping around the photo list.
pub fn photo_slot(index: usize, photo_count: usize) -> Option<usize> {
    if photo_count == 0 {
        None
    } else {
        Some(index % photo_count)
    }
}

// ============================================================================
// THE WHOLE TREE
// ============================================================================

/// All four populations.
#[derive(Debug, Clone)]
pub struct TreePopulations {
    pub foliage: Population,
    pub ornaments: Population,
    pub decorations: Population,
    pub lights: Population,
}

impl TreePopulations {
    /// Builds every population, drawing each from its own RNG stream.
    pub fn generate<R, F>(shape: &TreeShape, configs: [&PopulationConfig; 4], mut stream: F) -> Self
    where
        R: Rng,
        F: FnMut(PopulationKind) -> R,
    {
        let [foliage, ornaments, decorations, lights] = configs;
        let mut build = |kind: PopulationKind, config: &PopulationConfig| {
            let mut rng = stream(kind);
            Population::generate(kind, config.clone(), shape, &mut rng)
        };

        Self {
            foliage: build(PopulationKind::Foliage, foliage),
            ornaments: build(PopulationKind::Ornament, ornaments),
            decorations: build(PopulationKind::Decoration, decorations),
            lights: build(PopulationKind::Light, lights),
        }
    }

    pub fn update(&mut self, state: SceneState, dt: f32, elapsed: f32) {
        for population in self.iter_mut() {
            population.update(state, dt, elapsed);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Population> {
        [&self.foliage, &self.ornaments, &self.decorations, &self.lights].into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Population> {
        [
            &mut self.foliage,
            &mut self.ornaments,
            &mut self.decorations,
            &mut self.lights,
        ]
        .into_iter()
    }

    pub fn get(&self, kind: PopulationKind) -> &Population {
        match kind {
            PopulationKind::Foliage => &self.foliage,
            PopulationKind::Ornament => &self.ornaments,
            PopulationKind::Decoration => &self.decorations,
            PopulationKind::Light => &self.lights,
        }
    }

    pub fn total_entities(&self) -> usize {
        self.iter().map(Population::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_population(kind: PopulationKind, count: usize, seed: u64) -> Population {
        let config = PopulationConfig {
            count,
            ..PopulationConfig::for_kind(kind)
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Population::generate(kind, config, &TreeShape::default(), &mut rng)
    }

    #[test]
    fn test_convergence_factor_bounds() {
        assert_eq!(convergence_factor(2.0, 0.0), 0.0);
        assert_eq!(convergence_factor(2.0, -1.0), 0.0);
        assert_eq!(convergence_factor(2.0, f32::NAN), 0.0);
        assert_relative_eq!(convergence_factor(1.0, 1.0), 1.0 - (-1.0f32).exp(), epsilon = 1e-6);
        assert!(convergence_factor(1e6, 1e6) < 1.0);
    }

    #[test]
    fn test_entities_start_at_chaos_position() {
        let population = small_population(PopulationKind::Decoration, 20, 1);
        for entity in population.entities() {
            assert_eq!(entity.position(), entity.chaos_position());
        }
    }

    #[test]
    fn test_formed_converges_without_reaching_target() {
        let mut population = small_population(PopulationKind::Light, 50, 2);

        let mut t = 0.0;
        for _ in 0..120 {
            t += 1.0 / 60.0;
            population.update(SceneState::Formed, 1.0 / 60.0, t);
        }

        for entity in population.entities() {
            let start = (entity.target_position() - entity.chaos_position()).norm();
            let remaining = (entity.target_position() - entity.position()).norm();
            assert!(remaining < start * 0.2, "remaining {} of {}", remaining, start);
            if start > 1e-3 {
                assert!(remaining > 0.0);
            }
        }
    }

    #[test]
    fn test_toggle_mid_flight_reverses_smoothly() {
        let mut population = small_population(PopulationKind::Ornament, 10, 3);
        population.update(SceneState::Formed, 0.2, 0.2);
        let before: Vec<_> = population.entities().iter().map(|e| e.position()).collect();

        population.update(SceneState::Chaos, 1.0 / 60.0, 0.22);

        for (entity, prev) in population.entities().iter().zip(before) {
            let step = (entity.position() - prev).norm();
            let gap = (entity.chaos_position() - prev).norm();
            // One frame covers a small fraction of the way back
            assert!(step <= gap * 0.1);
        }
    }

    #[test]
    fn test_chaos_spin_keeps_angles_wrapped() {
        let mut population = small_population(PopulationKind::Decoration, 10, 4);
        for i in 0..600 {
            population.update(SceneState::Chaos, 1.0 / 30.0, i as f32 / 30.0);
        }
        for entity in population.entities() {
            assert!(entity.rotation().iter().all(|a| *a >= -PI && *a <= PI));
        }
    }

    #[test]
    fn test_ornaments_face_outward_when_formed() {
        let mut population = small_population(PopulationKind::Ornament, 12, 5);
        for i in 0..2000 {
            population.update(SceneState::Formed, 1.0 / 30.0, i as f32 / 30.0);
        }
        for entity in population.entities() {
            let expected = outward_yaw(&entity.position());
            assert!(wrap_angle(entity.rotation().y - expected).abs() < 0.05);
        }
    }

    #[test]
    fn test_instances_hide_ornaments_without_photos() {
        let population = small_population(PopulationKind::Ornament, 5, 6);

        assert!(population.instances(0).all(|i| !i.visible && i.photo_index.is_none()));

        let slots: Vec<_> = population.instances(3).map(|i| i.photo_index).collect();
        assert_eq!(slots, vec![Some(0), Some(1), Some(2), Some(0), Some(1)]);
    }

    #[test]
    fn test_nearest_to_orders_by_distance() {
        let population = small_population(PopulationKind::Ornament, 24, 7);
        let probe = Vector3::new(0.0, 0.0, 30.0);

        let nearest = population.nearest_to(&probe, 5);
        assert_eq!(nearest.len(), 5);
        assert!(nearest.windows(2).all(|w| w[0].1 <= w[1].1));

        let best = population
            .entities()
            .iter()
            .map(|e| (e.position() - probe).norm())
            .fold(f32::MAX, f32::min);
        assert_relative_eq!(nearest[0].1, best);

        assert!(population.nearest_photos(&probe, 5, 0).is_empty());
        assert!(population.nearest_photos(&probe, 5, 4).iter().all(|p| *p < 4));
    }

    #[test]
    fn test_tree_populations_streams_are_independent() {
        let shape = TreeShape::default();
        let mut configs: Vec<PopulationConfig> = PopulationKind::all()
            .iter()
            .map(|k| PopulationConfig { count: 10, ..PopulationConfig::for_kind(*k) })
            .collect();
        let stream = |kind: PopulationKind| ChaCha8Rng::seed_from_u64(kind.stream_salt());

        let a = TreePopulations::generate(
            &shape,
            [&configs[0], &configs[1], &configs[2], &configs[3]],
            stream,
        );

        // More foliage must not move the lights
        configs[0].count = 500;
        let b = TreePopulations::generate(
            &shape,
            [&configs[0], &configs[1], &configs[2], &configs[3]],
            stream,
        );

        assert_eq!(a.lights.entities(), b.lights.entities());
        assert_eq!(b.total_entities(), 530);
    }

    proptest! {
        #[test]
        fn prop_update_never_overshoots(seed in any::<u64>(), dt in 0.001f32..0.5, formed in any::<bool>()) {
            let mut population = small_population(PopulationKind::Decoration, 16, seed);
            let state = if formed { SceneState::Formed } else { SceneState::Chaos };
            // Start from somewhere in between
            population.update(state.toggled(), 0.3, 0.3);

            let before: Vec<_> = population.entities().iter().map(|e| e.position()).collect();
            population.update(state, dt, 0.5);

            for (entity, prev) in population.entities().iter().zip(before) {
                let target = entity.active_target(state);
                let gap_before = (target - prev).norm();
                let gap_after = (target - entity.position()).norm();
                prop_assert!(gap_after <= gap_before + 1e-4);
                if gap_before > 1e-2 {
                    // Strictly between: moved, but did not arrive
                    prop_assert!(gap_after < gap_before);
                    prop_assert!(gap_after > 0.0);
                }
            }
        }
    }
}
