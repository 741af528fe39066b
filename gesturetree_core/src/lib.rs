//! GestureTree Core - a particle tree that morphs between chaos and form
//!
//! The engines, leaves first:
//! 1. **Layout**: seeded chaos and formed positions per entity
//! 2. **Motion**: exponential convergence toward the active target
//! 3. **Bursts**: transition and ambient firework batches
//! 4. **Gesture intake**: debounced scene intents, rotation and pinch hysteresis
//! 5. **Lightbox**: anti-repeat photo selection and open/close lifecycle
//!
//! [`TreeRuntime`] runs them in a single per-frame pass.

pub mod camera;
pub mod config;
pub mod metrics;
pub mod scene_runtime;
pub mod timers;
pub mod tree_bursts;
pub mod tree_gesture;
pub mod tree_layout;
pub mod tree_lightbox;
pub mod tree_motion;

pub use camera::{CameraConfig, CameraRig};
pub use config::{ConfigError, TreeConfig};
pub use metrics::FrameMetrics;
pub use scene_runtime::{FrameReport, TreeRuntime};
pub use timers::OneShotTimer;
pub use tree_bursts::{BurstConfig, BurstMode, BurstSimulator, ParticleBatch, ParticleBuffer};
pub use tree_gesture::{GestureConfig, GestureIntake, IntakeOutput, StatusReporter};
pub use tree_layout::{ChaosVolume, LayoutConfig, TreeShape};
pub use tree_lightbox::{Lightbox, LightboxConfig, LightboxEvent, LightboxPhase, LightboxSnapshot, PhotoSelector};
pub use tree_motion::{EntityInstance, Population, PopulationConfig, PopulationKind, SceneState, TreePopulations};
