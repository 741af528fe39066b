//! TreeRuntime - the single per-frame update pass.
//!
//! Every frame runs, in order:
//! 1. Gesture intake (latest classifier result, or hold)
//! 2. Scene toggles (cooldown, transition firework)
//! 3. Camera rotation (suppressed while the lightbox is open)
//! 4. Population animation
//! 5. Lightbox / photo selection
//! 6. Bursts (ambient gated on the lightbox)
//! 7. Metrics

use crate::camera::CameraRig;
use crate::config::{ConfigError, TreeConfig};
use crate::metrics::FrameMetrics;
use crate::tree_bursts::{BurstSimulator, BurstUpdate, ParticleBuffer};
use crate::tree_gesture::{GestureIntake, IntakeOutput};
use crate::tree_lightbox::{Lightbox, LightboxEvent, LightboxSnapshot};
use crate::tree_motion::{EntityInstance, PopulationKind, SceneState, TreePopulations};
use gesturetree_env::{ClassifierResult, MailboxReceiver, TreeContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Salt for the burst simulator's RNG stream (populations use 1..=4).
pub const BURST_STREAM_SALT: u64 = 5;

/// Salt for the photo selector's RNG stream.
pub const SELECTOR_STREAM_SALT: u64 = 6;

/// Longest step the animator takes in one frame (s); larger gaps are frame hitches.
const MAX_FRAME_DT_SECS: f32 = 0.1;

/// What one frame did.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub timestamp: Duration,
    pub dt: f32,
    pub scene: SceneState,
    pub scene_changed: bool,
    pub intake: IntakeOutput,
    /// Rotation actually applied to the camera
    pub rotation_applied: f32,
    pub camera_yaw: f32,
    pub lightbox: LightboxSnapshot,
    pub lightbox_events: Vec<LightboxEvent>,
    pub bursts: BurstUpdate,
    pub live_batches: usize,
    pub particle_count: usize,
}

/// Owns every engine and drives them from the context clock.
pub struct TreeRuntime<Ctx: TreeContext> {
    context: Arc<Ctx>,
    config: TreeConfig,

    scene: SceneState,
    populations: TreePopulations,
    bursts: BurstSimulator,
    intake: GestureIntake,
    lightbox: Lightbox,
    camera: CameraRig,
    metrics: FrameMetrics,

    photo_count: usize,

    /// Single-slot inbox for results submitted directly
    pending: Option<ClassifierResult>,
    /// Results published by a classifier pump
    results: Option<MailboxReceiver<ClassifierResult>>,
    requested_scene: Option<SceneState>,

    started_at: Duration,
    last_frame: Option<Duration>,
    torn_down: bool,
}

impl<Ctx: TreeContext> TreeRuntime<Ctx> {
    /// Builds every engine from `config`, seeding each from its own stream.
    pub fn new(context: Arc<Ctx>, config: TreeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let populations = TreePopulations::generate(
            &config.tree,
            [&config.foliage, &config.ornaments, &config.decorations, &config.lights],
            |kind: PopulationKind| context.rng_stream(kind.stream_salt()),
        );
        let bursts = BurstSimulator::new(config.bursts.clone(), context.rng_stream(BURST_STREAM_SALT));
        let lightbox = Lightbox::new(config.lightbox.clone(), context.rng_stream(SELECTOR_STREAM_SALT));
        let intake = GestureIntake::new(config.gesture.clone());
        let camera = CameraRig::new(config.camera.clone());
        let started_at = context.now();

        info!(
            "Tree runtime ready: {} entities, seed {}",
            populations.total_entities(),
            context.seed()
        );

        Ok(Self {
            context,
            config,
            scene: SceneState::default(),
            populations,
            bursts,
            intake,
            lightbox,
            camera,
            metrics: FrameMetrics::default(),
            photo_count: 0,
            pending: None,
            results: None,
            requested_scene: None,
            started_at,
            last_frame: None,
            torn_down: false,
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }

    pub fn scene(&self) -> SceneState {
        self.scene
    }

    pub fn populations(&self) -> &TreePopulations {
        &self.populations
    }

    pub fn bursts(&self) -> &BurstSimulator {
        &self.bursts
    }

    pub fn particle_buffer(&self) -> &ParticleBuffer {
        self.bursts.buffer()
    }

    pub fn lightbox(&self) -> &Lightbox {
        &self.lightbox
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn intake(&self) -> &GestureIntake {
        &self.intake
    }

    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    pub fn photo_count(&self) -> usize {
        self.photo_count
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Sets the length of the photo list. Ornaments wrap around it.
    pub fn set_photos(&mut self, count: usize) {
        if count != self.photo_count {
            debug!("Photo list changed: {} -> {}", self.photo_count, count);
        }
        self.photo_count = count;
    }

    /// Reads classifier results from a pump's mailbox from now on.
    pub fn attach_results(&mut self, results: MailboxReceiver<ClassifierResult>) {
        self.results = Some(results);
    }

    /// Puts a result in the inbox, replacing any result not yet consumed.
    pub fn submit_classification(&mut self, result: ClassifierResult) {
        self.pending = Some(result);
    }

    /// Requests a scene state from outside the gesture path (e.g. a UI button).
    pub fn request_scene_state(&mut self, state: SceneState) {
        self.requested_scene = Some(state);
    }

    /// Render projection of one population for this frame.
    pub fn instances(&self, kind: PopulationKind) -> Vec<EntityInstance> {
        self.populations.get(kind).instances(self.photo_count).collect()
    }

    fn take_classification(&mut self) -> Option<ClassifierResult> {
        let mailbox = self.results.as_mut().and_then(MailboxReceiver::take_latest);
        let direct = self.pending.take();
        // Direct submissions are newer than anything the pump produced
        direct.or(mailbox)
    }

    /// Runs one frame at the context's current time.
    ///
    /// Returns `None` once the runtime has been torn down.
    pub fn frame(&mut self) -> Option<FrameReport> {
        if self.torn_down {
            return None;
        }

        let now = self.context.now();
        let dt = match self.last_frame {
            Some(last) => now.saturating_sub(last).as_secs_f32().min(MAX_FRAME_DT_SECS),
            None => 0.0,
        };
        self.last_frame = Some(now);
        let elapsed = now.saturating_sub(self.started_at).as_secs_f32();

        // 1. Gesture intake
        let intake = match self.take_classification() {
            Some(result) => self.intake.process(&result),
            None => self.intake.hold(),
        };
        if intake.classifier_failed {
            self.metrics.classifier_errors += 1;
        }

        // 2. Scene toggles; an explicit request wins over the gesture
        let requested = self.requested_scene.take().or(intake.scene_request);
        let scene_changed = match requested {
            Some(target) if target != self.scene => {
                self.apply_scene_change(target, now);
                true
            }
            _ => false,
        };

        // 3. Camera
        let rotation_applied = if self.lightbox.is_open() {
            0.0
        } else {
            intake.rotation_delta
        };
        self.camera.apply_rotation(rotation_applied);

        // 4. Populations
        self.populations.update(self.scene, dt, elapsed);

        // 5. Lightbox
        let camera_position = self.camera.position();
        let photo_count = self.photo_count;
        let ornaments = &self.populations.ornaments;
        let lightbox_events = self.lightbox.update(now, intake.pinch, |n| {
            ornaments.nearest_photos(&camera_position, n, photo_count)
        });
        self.metrics.record_lightbox(&lightbox_events);

        // 6. Bursts
        let bursts = self.bursts.update(now, self.lightbox.is_open());
        let particle_count = self.bursts.buffer().len();
        self.metrics.record_bursts(&bursts, particle_count);

        // 7. Metrics
        self.metrics.frames += 1;

        Some(FrameReport {
            timestamp: now,
            dt,
            scene: self.scene,
            scene_changed,
            intake,
            rotation_applied,
            camera_yaw: self.camera.yaw(),
            lightbox: self.lightbox.snapshot(),
            lightbox_events,
            bursts,
            live_batches: self.bursts.batch_count(),
            particle_count,
        })
    }

    fn apply_scene_change(&mut self, target: SceneState, now: Duration) {
        info!("Scene {} -> {}", self.scene, target);
        self.scene = target;
        self.metrics.scene_toggles += 1;
        self.lightbox.note_scene_change(now);

        if target == SceneState::Formed {
            self.bursts.trigger_transition(now);
            self.metrics.bursts_spawned += 1;
        }
    }

    /// Cancels pending timers, drops live bursts and detaches the classifier.
    ///
    /// Later `frame()` calls do nothing.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.lightbox.shutdown();
        self.bursts.clear();
        self.results = None;
        self.pending = None;
        self.torn_down = true;
        info!("Tree runtime torn down after {} frames", self.metrics.frames);
    }
}
