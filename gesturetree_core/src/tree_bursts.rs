//! The "BURST" Engine - Firework particle batches
//!
//! Each batch runs through three phases before it is evicted:
//!
//! ```text
//! LAUNCH   t < tte            one rocket travelling launch -> explosion
//! EXPLODE  tte <= t           particles fly out ballistically:
//!                             p = explosion + v*te + 0.5*g*te^2
//! DECAY    after the shortest particle life, particles fade and drop out
//! (evicted once now - created >= lifetime)
//! ```
//!
//! where `tte = |explosion - launch| / launch_speed` and `te` is the time
//! since the batch exploded minus the particle's own explosion delay.
//!
//! Two modes share the simulator:
//! - **Transition**: one batch fired at the tree top on CHAOS -> FORMED
//! - **Ambient**: re-spawned on a fixed interval while a gate holds
//!   (lightbox open), capped by evicting the oldest ambient batch

use crate::config::section_over;
use nalgebra::Vector3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::time::Duration;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Why a batch exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurstMode {
    /// Fired once on the CHAOS -> FORMED edge
    Transition,
    /// Repeating backdrop while the gate holds
    Ambient,
}

/// Shape of one kind of burst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstProfile {
    /// Particles per batch
    pub particle_count: usize,

    /// Rocket speed during launch (units/s)
    pub launch_speed: f32,

    /// Explosion speed range [min, max] (units/s)
    pub speed_range: [f32; 2],

    /// Per-particle explosion delay range [min, max] (s)
    pub delay_range: [f32; 2],

    /// Per-particle life after its explosion starts [min, max] (s)
    pub particle_life_range: [f32; 2],

    /// Whole-batch lifetime (s); the batch is evicted at this age
    pub lifetime_secs: f32,

    /// Horizontal radius of the random explosion offset
    pub explosion_spread: f32,

    /// Vertical range of the random explosion offset
    pub explosion_rise: f32,

    /// Particle colours (RGB, linear)
    pub palette: Vec<[f32; 3]>,
}

impl Default for BurstProfile {
    fn default() -> Self {
        Self {
            particle_count: 400,
            launch_speed: 30.0,
            speed_range: [4.0, 12.0],
            delay_range: [0.0, 0.15],
            particle_life_range: [1.2, 2.0],
            lifetime_secs: 3.0,
            explosion_spread: 1.5,
            explosion_rise: 2.0,
            palette: vec![[1.0, 0.84, 0.3], [1.0, 0.3, 0.2], [0.9, 0.95, 1.0]],
        }
    }
}

impl BurstProfile {
    /// Smaller, slower bursts for the lightbox backdrop.
    pub fn ambient() -> Self {
        Self {
            particle_count: 160,
            launch_speed: 18.0,
            speed_range: [2.0, 6.0],
            delay_range: [0.0, 0.1],
            particle_life_range: [0.8, 1.6],
            lifetime_secs: 2.5,
            explosion_spread: 4.0,
            explosion_rise: 3.0,
            palette: vec![[0.6, 0.8, 1.0], [1.0, 0.6, 0.9], [1.0, 0.9, 0.5]],
        }
    }
}

/// Configuration for the burst simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstConfig {
    /// Transition firework
    pub transition: BurstProfile,

    /// Ambient lightbox fireworks
    #[serde(deserialize_with = "ambient_profile")]
    pub ambient: BurstProfile,

    /// Vertical acceleration (negative = down)
    pub gravity: f32,

    /// Transition rocket launch point (tree base)
    pub transition_launch: [f32; 3],

    /// Transition explosion centre (tree top)
    pub transition_explosion: [f32; 3],

    /// Seconds between ambient spawns while the gate holds
    pub ambient_interval_secs: f32,

    /// Maximum live ambient batches
    pub ambient_max_batches: usize,

    /// Ambient rockets launch from a ring of this radius
    pub ambient_launch_radius: f32,

    /// Launch height of ambient rockets
    pub ambient_launch_height: f32,

    /// Ambient explosions happen this far above the launch point
    pub ambient_burst_height: f32,
}

fn ambient_profile<'de, D: Deserializer<'de>>(d: D) -> Result<BurstProfile, D::Error> {
    section_over(BurstProfile::ambient(), d)
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            transition: BurstProfile::default(),
            ambient: BurstProfile::ambient(),
            gravity: -6.0,
            transition_launch: [0.0, -11.0, 0.0],
            transition_explosion: [0.0, 12.0, 0.0],
            ambient_interval_secs: 0.6,
            ambient_max_batches: 4,
            ambient_launch_radius: 14.0,
            ambient_launch_height: -8.0,
            ambient_burst_height: 16.0,
        }
    }
}

impl BurstConfig {
    pub fn profile(&self, mode: BurstMode) -> &BurstProfile {
        match mode {
            BurstMode::Transition => &self.transition,
            BurstMode::Ambient => &self.ambient,
        }
    }
}

// ============================================================================
// PARTICLE BATCH
// ============================================================================

/// Lifecycle phase of a batch at a given age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurstPhase {
    Launch,
    Explode,
    Decay,
}

/// A self-contained, time-limited firework.
#[derive(Debug, Clone)]
pub struct ParticleBatch {
    pub id: u64,
    pub mode: BurstMode,
    pub launch: Vector3<f32>,
    pub explosion: Vector3<f32>,
    /// Seconds from creation until the rocket reaches `explosion`
    pub time_to_explode: f32,
    pub velocities: Vec<Vector3<f32>>,
    pub delays: Vec<f32>,
    pub particle_lives: Vec<f32>,
    pub colors: Vec<[f32; 3]>,
    pub lifetime: Duration,
    pub created_at: Duration,
    /// Seconds after explosion at which the first particle dies
    decay_start: f32,
}

impl ParticleBatch {
    /// Age of the batch in seconds.
    pub fn age_secs(&self, now: Duration) -> f32 {
        now.saturating_sub(self.created_at).as_secs_f32()
    }

    /// True once the batch has lived its full lifetime.
    pub fn is_expired(&self, now: Duration) -> bool {
        now.saturating_sub(self.created_at) >= self.lifetime
    }

    pub fn phase(&self, now: Duration) -> BurstPhase {
        let t = self.age_secs(now);
        if t < self.time_to_explode {
            BurstPhase::Launch
        } else if t - self.time_to_explode < self.decay_start {
            BurstPhase::Explode
        } else {
            BurstPhase::Decay
        }
    }

    pub fn particle_count(&self) -> usize {
        self.velocities.len()
    }

    /// Position and brightness of particle `i` at batch age `t` seconds.
    ///
    /// `None` once the particle has outlived its own life.
    pub fn particle_at(&self, i: usize, t: f32, gravity: f32) -> Option<(Vector3<f32>, f32)> {
        if t < self.time_to_explode {
            let progress = if self.time_to_explode > 0.0 {
                t / self.time_to_explode
            } else {
                1.0
            };
            let rocket = self.launch + (self.explosion - self.launch) * progress;
            return Some((rocket, 1.0));
        }

        let te = t - self.time_to_explode - self.delays.get(i).copied().unwrap_or(0.0);
        if te < 0.0 {
            return Some((self.explosion, 1.0));
        }
        let life = self.particle_lives.get(i).copied().unwrap_or(0.0);
        if te > life {
            return None;
        }

        let velocity = self.velocities.get(i).copied().unwrap_or_else(Vector3::zeros);
        let position = self.explosion
            + velocity * te
            + Vector3::new(0.0, 0.5 * gravity * te * te, 0.0);
        let brightness = if life > 0.0 { 1.0 - te / life } else { 0.0 };
        Some((position, brightness))
    }
}

/// Flattened render buffer rebuilt every frame.
///
/// `positions` and `colors` are xyz / rgb triples; their length changes from
/// frame to frame.
#[derive(Debug, Clone, Default)]
pub struct ParticleBuffer {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
}

impl ParticleBuffer {
    /// Number of particles in the buffer.
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
    }

    fn push(&mut self, position: Vector3<f32>, color: [f32; 3], brightness: f32) {
        self.positions.extend_from_slice(&[position.x, position.y, position.z]);
        self.colors.extend_from_slice(&[
            color[0] * brightness,
            color[1] * brightness,
            color[2] * brightness,
        ]);
    }
}

/// What happened to the batch set during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstUpdate {
    pub spawned: usize,
    pub evicted: usize,
}

// ============================================================================
// SIMULATOR
// ============================================================================

fn sample_range(rng: &mut ChaCha8Rng, range: [f32; 2]) -> f32 {
    let (lo, hi) = if range[0] <= range[1] {
        (range[0], range[1])
    } else {
        (range[1], range[0])
    };
    lo + rng.gen::<f32>() * (hi - lo)
}

/// Owns every live batch and the render buffer.
pub struct BurstSimulator {
    config: BurstConfig,
    rng: ChaCha8Rng,
    batches: VecDeque<ParticleBatch>,
    buffer: ParticleBuffer,
    next_id: u64,
    last_ambient_spawn: Option<Duration>,
}

impl BurstSimulator {
    pub fn new(config: BurstConfig, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            rng,
            batches: VecDeque::new(),
            buffer: ParticleBuffer::default(),
            next_id: 0,
            last_ambient_spawn: None,
        }
    }

    pub fn config(&self) -> &BurstConfig {
        &self.config
    }

    /// Live batches, oldest first.
    pub fn batches(&self) -> impl Iterator<Item = &ParticleBatch> {
        self.batches.iter()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn count_mode(&self, mode: BurstMode) -> usize {
        self.batches.iter().filter(|b| b.mode == mode).count()
    }

    pub fn buffer(&self) -> &ParticleBuffer {
        &self.buffer
    }

    /// Fires the transition firework, replacing any transition batch still alive.
    pub fn trigger_transition(&mut self, now: Duration) -> u64 {
        self.batches.retain(|b| b.mode != BurstMode::Transition);
        let launch = Vector3::from(self.config.transition_launch);
        let centre = Vector3::from(self.config.transition_explosion);
        self.spawn(BurstMode::Transition, launch, centre, now)
    }

    /// Fires one ambient firework from a random point on the launch ring.
    pub fn spawn_ambient(&mut self, now: Duration) -> u64 {
        let angle = self.rng.gen::<f32>() * TAU;
        let r = self.config.ambient_launch_radius;
        let launch = Vector3::new(r * angle.cos(), self.config.ambient_launch_height, r * angle.sin());
        let centre = launch + Vector3::new(0.0, self.config.ambient_burst_height, 0.0);

        let id = self.spawn(BurstMode::Ambient, launch, centre, now);
        self.last_ambient_spawn = Some(now);

        // Evict oldest ambient batches beyond the cap
        let cap = self.config.ambient_max_batches.max(1);
        while self.count_mode(BurstMode::Ambient) > cap {
            if let Some(pos) = self.batches.iter().position(|b| b.mode == BurstMode::Ambient) {
                self.batches.remove(pos);
            }
        }
        id
    }

    fn spawn(&mut self, mode: BurstMode, launch: Vector3<f32>, centre: Vector3<f32>, now: Duration) -> u64 {
        let profile = self.config.profile(mode).clone();
        let rng = &mut self.rng;

        let offset_angle = rng.gen::<f32>() * TAU;
        let offset_r = profile.explosion_spread * rng.gen::<f32>().sqrt();
        let rise = (rng.gen::<f32>() * 2.0 - 1.0) * profile.explosion_rise;
        let explosion = centre + Vector3::new(offset_r * offset_angle.cos(), rise, offset_r * offset_angle.sin());

        let distance = (explosion - launch).norm();
        let time_to_explode = if profile.launch_speed > 0.0 {
            distance / profile.launch_speed
        } else {
            0.0
        };

        let n = profile.particle_count;
        let mut velocities = Vec::with_capacity(n);
        let mut delays = Vec::with_capacity(n);
        let mut particle_lives = Vec::with_capacity(n);
        let mut colors = Vec::with_capacity(n);
        for _ in 0..n {
            // Uniform direction on the sphere
            let azimuth = rng.gen::<f32>() * TAU;
            let polar = (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
            let speed = sample_range(rng, profile.speed_range);
            velocities.push(Vector3::new(
                speed * polar.sin() * azimuth.cos(),
                speed * polar.cos(),
                speed * polar.sin() * azimuth.sin(),
            ));
            delays.push(sample_range(rng, profile.delay_range));
            particle_lives.push(sample_range(rng, profile.particle_life_range));
            colors.push(if profile.palette.is_empty() {
                [1.0, 1.0, 1.0]
            } else {
                profile.palette[rng.gen_range(0..profile.palette.len())]
            });
        }

        let decay_start = particle_lives.iter().copied().fold(f32::INFINITY, f32::min);
        let decay_start = if decay_start.is_finite() { decay_start } else { 0.0 };

        let id = self.next_id;
        self.next_id += 1;

        debug!(
            "Burst #{} ({:?}) spawned: {} particles, explodes in {:.2}s",
            id, mode, n, time_to_explode
        );

        self.batches.push_back(ParticleBatch {
            id,
            mode,
            launch,
            explosion,
            time_to_explode,
            velocities,
            delays,
            particle_lives,
            colors,
            lifetime: secs_to_duration(profile.lifetime_secs),
            created_at: now,
            decay_start,
        });
        id
    }

    /// Evicts expired batches, runs the ambient spawner and rebuilds the
    /// render buffer.
    pub fn update(&mut self, now: Duration, ambient_gate: bool) -> BurstUpdate {
        let mut result = BurstUpdate::default();

        let before = self.batches.len();
        self.batches.retain(|b| !b.is_expired(now));
        result.evicted = before - self.batches.len();

        if ambient_gate {
            let interval = secs_to_duration(self.config.ambient_interval_secs);
            let due = match self.last_ambient_spawn {
                None => true,
                Some(last) => now.saturating_sub(last) >= interval,
            };
            if due {
                let live = self.batches.len();
                self.spawn_ambient(now);
                result.spawned += 1;
                result.evicted += live + 1 - self.batches.len();
            }
        } else {
            // Reopening the gate fires immediately
            self.last_ambient_spawn = None;
        }

        self.rebuild_buffer(now);
        result
    }

    fn rebuild_buffer(&mut self, now: Duration) {
        let gravity = self.config.gravity;
        self.buffer.clear();
        for batch in &self.batches {
            let t = batch.age_secs(now);
            if t < batch.time_to_explode {
                // A single rocket
                if let Some((p, b)) = batch.particle_at(0, t, gravity) {
                    let color = batch.colors.first().copied().unwrap_or([1.0, 1.0, 1.0]);
                    self.buffer.push(p, color, b);
                }
                continue;
            }
            for i in 0..batch.particle_count() {
                if let Some((p, b)) = batch.particle_at(i, t, gravity) {
                    self.buffer.push(p, batch.colors[i], b);
                }
            }
        }
    }

    /// Drops every batch (teardown).
    pub fn clear(&mut self) {
        self.batches.clear();
        self.buffer.clear();
        self.last_ambient_spawn = None;
    }
}

/// Seconds to a `Duration`, saturating instead of panicking on out-of-range input.
fn secs_to_duration(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs.max(0.0)).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn simulator(config: BurstConfig) -> BurstSimulator {
        BurstSimulator::new(config, ChaCha8Rng::seed_from_u64(99))
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_batch_present_for_whole_lifetime_then_evicted() {
        let mut sim = simulator(BurstConfig::default());
        let created = ms(1000);
        sim.trigger_transition(created);

        // lifetime 3.0s: present on [0, 3.0), gone at 3.0
        for age_ms in [0u64, 1, 500, 1500, 2999] {
            sim.update(created + ms(age_ms), false);
            assert_eq!(sim.batch_count(), 1, "missing at age {}ms", age_ms);
        }
        let update = sim.update(created + ms(3000), false);
        assert_eq!(update.evicted, 1);
        assert_eq!(sim.batch_count(), 0);
        assert!(sim.buffer().is_empty());
    }

    #[test]
    fn test_launch_phase_is_single_rocket_on_trajectory() {
        let mut sim = simulator(BurstConfig::default());
        sim.trigger_transition(ms(0));
        let batch = sim.batches().next().unwrap().clone();
        assert!(batch.time_to_explode > 0.1);

        let t = batch.time_to_explode * 0.5;
        sim.update(Duration::from_secs_f32(t), false);
        assert_eq!(sim.buffer().len(), 1);
        assert_eq!(batch.phase(Duration::from_secs_f32(t)), BurstPhase::Launch);

        let midpoint = (batch.launch + batch.explosion) * 0.5;
        let p = &sim.buffer().positions;
        assert_relative_eq!(p[0], midpoint.x, epsilon = 1e-3);
        assert_relative_eq!(p[1], midpoint.y, epsilon = 1e-3);
        assert_relative_eq!(p[2], midpoint.z, epsilon = 1e-3);
    }

    #[test]
    fn test_explosion_follows_ballistic_motion() {
        let sim = {
            let mut sim = simulator(BurstConfig::default());
            sim.trigger_transition(ms(0));
            sim
        };
        let batch = sim.batches().next().unwrap();
        let gravity = sim.config().gravity;

        let i = 3;
        let te = 0.5;
        let t = batch.time_to_explode + batch.delays[i] + te;
        let (p, brightness) = batch.particle_at(i, t, gravity).unwrap();
        let expected = batch.explosion + batch.velocities[i] * te
            + Vector3::new(0.0, 0.5 * gravity * te * te, 0.0);

        assert_relative_eq!(p, expected, epsilon = 1e-3);
        assert!(brightness > 0.0 && brightness < 1.0);

        // Past its own life the particle is gone
        let dead = batch.time_to_explode + batch.delays[i] + batch.particle_lives[i] + 0.01;
        assert!(batch.particle_at(i, dead, gravity).is_none());
    }

    #[test]
    fn test_phases_progress_in_order() {
        let mut sim = simulator(BurstConfig::default());
        sim.trigger_transition(ms(0));
        let batch = sim.batches().next().unwrap();

        let tte = batch.time_to_explode;
        assert_eq!(batch.phase(Duration::ZERO), BurstPhase::Launch);
        assert_eq!(batch.phase(Duration::from_secs_f32(tte + 0.05)), BurstPhase::Explode);
        assert_eq!(batch.phase(Duration::from_secs_f32(tte + 2.5)), BurstPhase::Decay);
    }

    #[test]
    fn test_velocities_within_speed_range() {
        let mut sim = simulator(BurstConfig::default());
        sim.trigger_transition(ms(0));
        let batch = sim.batches().next().unwrap();
        let [lo, hi] = sim.config().transition.speed_range;

        assert_eq!(batch.particle_count(), 400);
        for v in &batch.velocities {
            let speed = v.norm();
            assert!(speed >= lo - 1e-3 && speed <= hi + 1e-3);
        }
    }

    #[test]
    fn test_retrigger_keeps_single_transition_batch() {
        let mut sim = simulator(BurstConfig::default());
        sim.trigger_transition(ms(0));
        sim.trigger_transition(ms(500));

        assert_eq!(sim.count_mode(BurstMode::Transition), 1);
        assert_eq!(sim.batches().next().unwrap().created_at, ms(500));
    }

    #[test]
    fn test_ambient_respawns_on_interval_and_caps() {
        let config = BurstConfig {
            ambient_interval_secs: 0.5,
            ambient_max_batches: 2,
            ambient: BurstProfile {
                lifetime_secs: 10.0,
                ..BurstProfile::ambient()
            },
            ..BurstConfig::default()
        };
        let mut sim = simulator(config);

        assert_eq!(sim.update(ms(0), true).spawned, 1);
        assert_eq!(sim.update(ms(100), true).spawned, 0);
        assert_eq!(sim.update(ms(500), true).spawned, 1);
        assert_eq!(sim.count_mode(BurstMode::Ambient), 2);

        // Third spawn evicts the oldest
        let update = sim.update(ms(1000), true);
        assert_eq!(update, BurstUpdate { spawned: 1, evicted: 1 });
        assert_eq!(sim.count_mode(BurstMode::Ambient), 2);
        assert_eq!(sim.batches().next().unwrap().created_at, ms(500));
    }

    #[test]
    fn test_out_of_range_durations_saturate() {
        let config = BurstConfig {
            ambient_interval_secs: 1e30,
            transition: BurstProfile {
                lifetime_secs: 1e30,
                ..BurstProfile::default()
            },
            ..BurstConfig::default()
        };
        let mut sim = simulator(config);

        sim.trigger_transition(ms(0));
        assert_eq!(sim.batches().next().unwrap().lifetime, Duration::MAX);
        assert!(!sim.batches().next().unwrap().is_expired(Duration::from_secs(1_000_000)));

        assert_eq!(sim.update(ms(0), true).spawned, 1);
        assert_eq!(sim.update(ms(60_000), true).spawned, 0);
    }

    #[test]
    fn test_closed_gate_stops_spawning() {
        let mut sim = simulator(BurstConfig::default());
        sim.update(ms(0), true);
        assert_eq!(sim.update(ms(2000), false).spawned, 0);

        // Expired ambient batches drain out
        sim.update(ms(5000), false);
        assert_eq!(sim.batch_count(), 0);

        // Reopening fires right away
        assert_eq!(sim.update(ms(5001), true).spawned, 1);
    }
}
