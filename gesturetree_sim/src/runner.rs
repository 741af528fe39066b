//! Scenario runner - drives the tree runtime through scripted gesture streams.

use crate::classifier::{ScriptFrame, ScriptedClassifier};
use crate::context::SimContext;
use crate::exporter::{SimExport, SimFrame};
use crate::scenarios::ScenarioId;
use crate::synthetic::SyntheticHand;

use gesturetree_core::{
    BurstMode, FrameMetrics, FrameReport, LightboxEvent, LightboxPhase, SceneState, TreeConfig,
    TreeRuntime,
};
use gesturetree_env::TreeContext;
use rand_distr::{Distribution, Uniform};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Salt for scenario-level randomness (distinct from the runtime's streams).
const SCENARIO_STREAM_SALT: u64 = 0x5CE_A210;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Runtime counters at the end of the run
    pub metrics: FrameMetrics,
}

type Check = Result<(), String>;

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Check {
    if condition {
        Ok(())
    } else {
        Err(message())
    }
}

fn opened_photo(report: &FrameReport) -> Option<usize> {
    report.lightbox_events.iter().find_map(|e| match e {
        LightboxEvent::Opened { photo } => Some(*photo),
        _ => None,
    })
}

fn has_event(report: &FrameReport, event: LightboxEvent) -> bool {
    report.lightbox_events.contains(&event)
}

/// One runtime fed by one scripted classifier on a virtual clock.
struct Harness {
    context: Arc<SimContext>,
    runtime: TreeRuntime<SimContext>,
    classifier: ScriptedClassifier,
    dt: Duration,
    ticks: u64,
    export: Option<SimExport>,
    export_interval: u64,
}

impl Harness {
    fn now(&self) -> Duration {
        self.context.now()
    }

    /// Advances the clock one tick and runs a frame.
    fn tick(&mut self) -> Result<FrameReport, String> {
        self.context.advance_time(self.dt);
        let timestamp_ms = self.now().as_millis() as u64;
        let result = self.classifier.next_result(timestamp_ms);
        self.runtime.submit_classification(result);

        let report = self
            .runtime
            .frame()
            .ok_or_else(|| "runtime stopped producing frames".to_string())?;
        self.ticks += 1;

        if let Some(export) = self.export.as_mut() {
            let frame = SimFrame::from_report(&report);
            if frame.has_events() || self.ticks % self.export_interval == 0 {
                export.add_frame(frame);
            }
        }
        Ok(report)
    }

    fn feed(&mut self, frame: ScriptFrame) -> Result<FrameReport, String> {
        self.classifier.push(frame);
        self.tick()
    }

    fn feed_hand(&mut self, hand: &SyntheticHand) -> Result<FrameReport, String> {
        self.feed(ScriptFrame::Hand(hand.clone()))
    }

    /// Feeds `hand` until `done` holds, at most `limit` frames.
    fn feed_until<F>(&mut self, hand: &SyntheticHand, limit: usize, mut done: F) -> Result<FrameReport, String>
    where
        F: FnMut(&FrameReport) -> bool,
    {
        for _ in 0..limit {
            let report = self.feed_hand(hand)?;
            if done(&report) {
                return Ok(report);
            }
        }
        Err(format!("condition not reached within {} frames", limit))
    }

    /// No-hand frames for `secs` of virtual time.
    fn idle(&mut self, secs: f64) -> Result<Vec<FrameReport>, String> {
        let frames = (secs / self.dt.as_secs_f64()).ceil() as usize;
        (0..frames).map(|_| self.feed(ScriptFrame::NoHand)).collect()
    }

    fn ticks_for(&self, secs: f64) -> usize {
        (secs / self.dt.as_secs_f64()).ceil() as usize
    }

    /// Closed fists until the tree is formed.
    fn form_tree(&mut self) -> Check {
        let fist = SyntheticHand::fist();
        self.feed_until(&fist, 10, |r| r.scene == SceneState::Formed)
            .map(|_| ())
            .map_err(|e| format!("tree never formed: {}", e))
    }

    /// Forms the tree and waits out the post-toggle cooldown.
    fn form_and_settle(&mut self) -> Check {
        self.form_tree()?;
        let cooldown = self.runtime.config().lightbox.cooldown_ms as f64 / 1000.0;
        self.idle(cooldown + 0.2)?;
        Ok(())
    }

    /// Photo indices behind the nearest ornaments as seen from the camera now.
    fn nearest_candidates(&self) -> Vec<usize> {
        let config = &self.runtime.config().lightbox;
        self.runtime.populations().ornaments.nearest_photos(
            &self.runtime.camera().position(),
            config.candidate_count,
            self.runtime.photo_count(),
        )
    }

    /// Pinches until the lightbox opens; returns the report of the opening frame.
    fn pinch_open(&mut self) -> Result<FrameReport, String> {
        let pinch = SyntheticHand::pinch(0.05);
        self.feed_until(&pinch, 5, |r| opened_photo(r).is_some())
            .map_err(|e| format!("lightbox never opened: {}", e))
    }

    /// Holds the pinch until fully faded in.
    fn hold_until_open(&mut self) -> Result<FrameReport, String> {
        let pinch = SyntheticHand::pinch(0.05);
        self.feed_until(&pinch, 10, |r| r.lightbox.phase == LightboxPhase::Open)
            .map_err(|e| format!("lightbox never faded in: {}", e))
    }

    /// Releases the pinch until the lightbox is closed.
    fn release_until_closed(&mut self, hand: &SyntheticHand) -> Result<FrameReport, String> {
        self.feed_until(hand, 60, |r| has_event(r, LightboxEvent::Closed))
            .map_err(|e| format!("lightbox never closed: {}", e))
    }
}

/// Runs named scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Tick rate in Hz
    tick_rate_hz: u32,

    /// Soak length for open-ended scenarios (seconds)
    max_duration_secs: f64,

    /// Photo list length given to the runtime
    photo_count: usize,

    /// Runtime configuration
    config: TreeConfig,

    /// Export every Nth tick (frames with events are always exported)
    export_interval: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            tick_rate_hz: 30,
            max_duration_secs: 4.0,
            photo_count: 24,
            config: TreeConfig::default(),
            export_interval: 10,
        }
    }

    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz.max(1);
        self
    }

    /// Sets the soak duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs.max(1.0);
        self
    }

    pub fn with_config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_photos(mut self, count: usize) -> Self {
        self.photo_count = count;
        self
    }

    pub fn with_export_interval(mut self, ticks: u64) -> Self {
        self.export_interval = ticks.max(1);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn harness(&self, export: Option<SimExport>) -> Result<Harness, String> {
        let context = SimContext::shared(self.seed);
        let mut runtime = TreeRuntime::new(context.clone(), self.config.clone()).map_err(|e| e.to_string())?;
        runtime.set_photos(self.photo_count);

        Ok(Harness {
            classifier: ScriptedClassifier::new(self.seed ^ SCENARIO_STREAM_SALT),
            context,
            runtime,
            dt: Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64),
            ticks: 0,
            export,
            export_interval: self.export_interval,
        })
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None).0
    }

    /// Runs a scenario, sampling frames into a JSON export.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let export = SimExport::new(scenario.name(), self.seed);
        let (result, export) = self.execute(scenario, Some(export));
        let mut export = export.unwrap_or_else(|| SimExport::new(scenario.name(), self.seed));
        export.finalize(result.passed, result.failure_reason.clone(), result.metrics);
        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, export: Option<SimExport>) -> (ScenarioResult, Option<SimExport>) {
        info!("Starting scenario: {} {} (seed={})", scenario.code(), scenario.name(), self.seed);

        let mut harness = match self.harness(export) {
            Ok(h) => h,
            Err(reason) => {
                return (
                    ScenarioResult {
                        scenario,
                        seed: self.seed,
                        passed: false,
                        total_ticks: 0,
                        final_time_secs: 0.0,
                        failure_reason: Some(reason),
                        metrics: FrameMetrics::default(),
                    },
                    None,
                )
            }
        };

        let outcome = match scenario {
            ScenarioId::PalmScatter => self.run_palm_scatter(&mut harness),
            ScenarioId::PinchOpen => self.run_pinch_open(&mut harness),
            ScenarioId::PinchRelease => self.run_pinch_release(&mut harness),
            ScenarioId::FormationBurst => self.run_formation_burst(&mut harness),
            ScenarioId::FlickerRejection => self.run_flicker_rejection(&mut harness),
            ScenarioId::HysteresisBand => self.run_hysteresis_band(&mut harness),
            ScenarioId::AntiRepeat => self.run_anti_repeat(&mut harness),
            ScenarioId::ClassifierOutage => self.run_classifier_outage(&mut harness),
            ScenarioId::AmbientFireworks => self.run_ambient_fireworks(&mut harness),
        }
        .and_then(|()| Self::check_teardown(&mut harness));

        let metrics = *harness.runtime.metrics();
        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: outcome.is_ok(),
            total_ticks: harness.ticks,
            final_time_secs: harness.now().as_secs_f64(),
            failure_reason: outcome.err(),
            metrics,
        };

        if result.passed {
            info!("✓ {} complete: {} ticks, {:.2}s", scenario.name(), result.total_ticks, result.final_time_secs);
        }
        (result, harness.export)
    }

    /// After teardown nothing may move.
    fn check_teardown(h: &mut Harness) -> Check {
        h.runtime.teardown();
        ensure(h.runtime.frame().is_none(), || "frame() ran after teardown".into())?;
        ensure(!h.runtime.lightbox().is_open(), || "lightbox open after teardown".into())?;
        ensure(h.runtime.bursts().batch_count() == 0, || "bursts alive after teardown".into())
    }

    /// GT-001: formed tree, five Open_Palm frames @0.9.
    ///
    /// **Assertion**: CHAOS on exactly the 3rd frame, and it stays CHAOS.
    fn run_palm_scatter(&self, h: &mut Harness) -> Check {
        h.form_tree()?;
        h.idle(0.2)?;

        let palm = SyntheticHand::open_palm().with_label("Open_Palm", 0.9);
        let mut changed_at = Vec::new();
        for i in 0..5 {
            let report = h.feed_hand(&palm)?;
            if report.scene_changed {
                changed_at.push(i);
            }
            if i >= 2 {
                ensure(report.scene == SceneState::Chaos, || format!("frame {} is not CHAOS", i + 1))?;
            }
        }
        ensure(changed_at == [2], || format!("scene changed on frames {:?}, expected [2]", changed_at))?;
        ensure(h.runtime.metrics().scene_toggles == 2, || {
            format!("{} toggles, expected 2", h.runtime.metrics().scene_toggles)
        })
    }

    /// GT-002: formed tree, closed lightbox, stable pinch 0.05.
    ///
    /// **Assertion**: OPENING at opacity 0 with a photo from the nearest set, then opacity 1.
    fn run_pinch_open(&self, h: &mut Harness) -> Check {
        h.form_and_settle()?;

        let opening = h.pinch_open()?;
        let photo = opened_photo(&opening).ok_or_else(|| "no photo opened".to_string())?;
        ensure(opening.lightbox.phase == LightboxPhase::Opening, || {
            format!("phase {:?} on open, expected Opening", opening.lightbox.phase)
        })?;
        ensure(opening.lightbox.opacity == 0.0, || "opacity not 0 on open".into())?;

        let candidates = h.nearest_candidates();
        ensure(candidates.contains(&photo), || {
            format!("photo {} not among nearest {:?}", photo, candidates)
        })?;

        let open = h.hold_until_open()?;
        ensure(open.lightbox.opacity == 1.0, || "opacity not 1 after fade-in".into())?;
        ensure(open.lightbox.selected_photo == Some(photo), || "selection changed while open".into())?;
        debug!("Opened photo {} from {:?}", photo, candidates);
        Ok(())
    }

    /// GT-003: open lightbox, pinch distance jumps to 0.12.
    ///
    /// **Assertion**: CLOSING at opacity 0 on the 2nd frame, CLOSED after the close delay.
    fn run_pinch_release(&self, h: &mut Harness) -> Check {
        h.form_and_settle()?;
        h.pinch_open()?;
        h.hold_until_open()?;

        let released = SyntheticHand::pinch(0.12);
        let first = h.feed_hand(&released)?;
        ensure(first.lightbox.phase == LightboxPhase::Open, || {
            "closed on a single frame above the off threshold".into()
        })?;

        let second = h.feed_hand(&released)?;
        ensure(has_event(&second, LightboxEvent::CloseStarted), || "close did not start on frame 2".into())?;
        ensure(second.lightbox.opacity == 0.0, || "opacity not 0 while closing".into())?;
        let close_started = second.timestamp;

        let closed = h.release_until_closed(&released)?;
        let delay = closed.timestamp.saturating_sub(close_started);
        let expected = Duration::from_millis(h.runtime.config().lightbox.close_delay_ms);
        ensure(delay >= expected && delay <= expected + h.dt, || {
            format!("closed after {:?}, expected {:?}", delay, expected)
        })?;
        ensure(closed.lightbox.selected_photo.is_none() && !closed.lightbox.is_open, || {
            "selection survived close".into()
        })
    }

    /// GT-004: CHAOS -> FORMED.
    ///
    /// **Assertion**: one transition batch, live for its whole lifetime, then gone.
    fn run_formation_burst(&self, h: &mut Harness) -> Check {
        h.form_tree()?;
        let bursts = h.runtime.bursts();
        ensure(bursts.count_mode(BurstMode::Transition) == 1, || {
            format!("{} transition batches", bursts.count_mode(BurstMode::Transition))
        })?;
        let (created_at, lifetime) = bursts
            .batches()
            .find(|b| b.mode == BurstMode::Transition)
            .map(|b| (b.created_at, b.lifetime))
            .ok_or_else(|| "transition batch missing".to_string())?;

        let frames = h.ticks_for(lifetime.as_secs_f64() + 0.5);
        for _ in 0..frames {
            let report = h.feed(ScriptFrame::NoHand)?;
            let age = report.timestamp.saturating_sub(created_at);
            let live = h.runtime.bursts().count_mode(BurstMode::Transition);
            if age < lifetime {
                ensure(live == 1, || format!("batch missing at age {:?}", age))?;
            } else {
                ensure(live == 0, || format!("batch alive at age {:?}", age))?;
            }
        }

        let metrics = h.runtime.metrics();
        ensure(h.runtime.bursts().batch_count() == 0, || "residual batches".into())?;
        ensure(h.runtime.particle_buffer().is_empty(), || "residual particles".into())?;
        ensure(metrics.bursts_spawned == 1 && metrics.bursts_evicted == 1, || {
            format!("spawned {} evicted {}", metrics.bursts_spawned, metrics.bursts_evicted)
        })
    }

    /// GT-005: single-frame flickers in both directions.
    ///
    /// **Assertion**: no extra toggles.
    fn run_flicker_rejection(&self, h: &mut Harness) -> Check {
        let fist = SyntheticHand::fist();
        let palm = SyntheticHand::open_palm().with_label("Open_Palm", 0.95);
        let frames = h.ticks_for(self.max_duration_secs / 2.0);

        h.form_tree()?;
        for i in 0..frames {
            let hand = if i % 5 == 4 { &palm } else { &fist };
            let report = h.feed_hand(hand)?;
            ensure(report.scene == SceneState::Formed, || format!("palm flicker scattered the tree at frame {}", i))?;
        }

        h.feed_until(&palm, 10, |r| r.scene == SceneState::Chaos)?;
        for i in 0..frames {
            let hand = if i % 4 == 3 { &fist } else { &palm };
            let report = h.feed_hand(hand)?;
            ensure(report.scene == SceneState::Chaos, || format!("fist flicker formed the tree at frame {}", i))?;
        }

        let toggles = h.runtime.metrics().scene_toggles;
        ensure(toggles == 2, || format!("{} toggles, expected 2", toggles))
    }

    /// GT-006: distance jitters strictly between the two thresholds.
    ///
    /// **Assertion**: the committed pinch flips only on full crossings.
    fn run_hysteresis_band(&self, h: &mut Harness) -> Check {
        let gesture = h.runtime.config().gesture.clone();
        let band = Uniform::new(
            gesture.pinch_on_distance + 0.004,
            gesture.pinch_off_distance - 0.004,
        );
        let mut rng = h.context.rng_stream(SCENARIO_STREAM_SALT);
        let frames = h.ticks_for(self.max_duration_secs / 2.0);
        let mut flips = 0;

        let soak = |h: &mut Harness, rng: &mut rand_chacha::ChaCha8Rng, expected: bool| -> Result<u32, String> {
            let mut flips = 0;
            for _ in 0..frames {
                let report = h.feed_hand(&SyntheticHand::pinch(band.sample(rng)))?;
                flips += report.intake.pinch_changed as u32;
                ensure(report.intake.pinch == expected, || "pinch flipped inside the band".into())?;
            }
            Ok(flips)
        };

        flips += soak(h, &mut rng, false)?;

        let on = SyntheticHand::pinch(gesture.pinch_on_distance - 0.02);
        h.feed_until(&on, 5, |r| r.intake.pinch)?;
        flips += 1;

        flips += soak(h, &mut rng, true)?;

        let off = SyntheticHand::pinch(gesture.pinch_off_distance + 0.02);
        h.feed_until(&off, 5, |r| !r.intake.pinch)?;
        flips += 1;

        ensure(flips == 2, || format!("{} pinch flips, expected 2", flips))
    }

    /// GT-007: repeated open/close cycles with a rotating camera.
    ///
    /// **Assertion**: whenever the nearest set holds an unseen photo, the pick is unseen.
    fn run_anti_repeat(&self, h: &mut Harness) -> Check {
        h.form_and_settle()?;
        let release = SyntheticHand::neutral();
        let turn = SyntheticHand::neutral().at_x(0.9);
        let cycles = 12;

        for cycle in 0..cycles {
            let history: Vec<usize> = h.runtime.lightbox().history().iter().collect();
            let opening = h.pinch_open()?;
            let photo = opened_photo(&opening).ok_or_else(|| "no photo".to_string())?;

            let candidates = h.nearest_candidates();
            let fresh: Vec<usize> = candidates.iter().copied().filter(|p| !history.contains(p)).collect();
            if !fresh.is_empty() {
                ensure(fresh.contains(&photo), || {
                    format!("cycle {}: picked {} over fresh {:?} (history {:?})", cycle, photo, fresh, history)
                })?;
            }

            h.release_until_closed(&release)?;
            for _ in 0..10 {
                h.feed_hand(&turn)?;
            }
        }

        let opens = h.runtime.metrics().lightbox_opens;
        ensure(opens == cycles, || format!("{} opens, expected {}", opens, cycles))
    }

    /// GT-008: the classifier fails while the lightbox is open.
    ///
    /// **Assertion**: one status per distinct consecutive message, lightbox closes, pinch recovers.
    fn run_classifier_outage(&self, h: &mut Harness) -> Check {
        h.form_and_settle()?;
        h.pinch_open()?;

        let outage = [
            ("camera permission denied", 10),
            ("model failed to load", 10),
            ("camera permission denied", 5),
        ];
        let mut statuses = 0;
        let mut close_started = false;
        for (message, count) in outage {
            for _ in 0..count {
                let report = h.feed(ScriptFrame::Error(message.to_string()))?;
                statuses += report.intake.status.is_some() as u32;
                close_started |= has_event(&report, LightboxEvent::CloseStarted);
                ensure(!report.intake.pinch && !report.intake.hand_present, || {
                    "failed frame was not treated as no hand".into()
                })?;
            }
        }

        let metrics = h.runtime.metrics();
        ensure(statuses == 3, || format!("{} status lines, expected 3", statuses))?;
        ensure(metrics.classifier_errors == 25, || format!("{} errors counted", metrics.classifier_errors))?;
        ensure(close_started && !h.runtime.lightbox().is_open(), || "lightbox did not close".into())?;
        ensure(h.runtime.scene() == SceneState::Formed, || "outage changed the scene".into())?;

        h.pinch_open().map(|_| ())
    }

    /// GT-009: lightbox held open for the soak duration.
    ///
    /// **Assertion**: ambient spawns on interval under the cap, none once closed.
    fn run_ambient_fireworks(&self, h: &mut Harness) -> Check {
        h.form_tree()?;
        let transition_life = h.runtime.config().bursts.transition.lifetime_secs as f64;
        h.idle(transition_life + 0.2)?;

        let bursts = h.runtime.config().bursts.clone();
        let cap = bursts.ambient_max_batches;
        let pinch = SyntheticHand::pinch(0.05);

        h.pinch_open()?;
        let mut spawned = 0;
        for _ in 0..h.ticks_for(self.max_duration_secs) {
            let report = h.feed_hand(&pinch)?;
            spawned += report.bursts.spawned;
            let live = h.runtime.bursts().count_mode(BurstMode::Ambient);
            ensure(live <= cap, || format!("{} ambient batches over cap {}", live, cap))?;
        }
        let expected = (self.max_duration_secs / bursts.ambient_interval_secs as f64).floor() as usize;
        ensure(spawned + 1 >= expected, || format!("{} ambient spawns, expected about {}", spawned, expected))?;

        h.release_until_closed(&SyntheticHand::neutral())?;
        let tail = h.ticks_for(bursts.ambient.lifetime_secs as f64 + 0.2);
        for _ in 0..tail {
            let report = h.feed(ScriptFrame::NoHand)?;
            ensure(report.bursts.spawned == 0, || "ambient spawned with lightbox closed".into())?;
        }
        ensure(h.runtime.bursts().count_mode(BurstMode::Ambient) == 0, || "ambient batches outlived close".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn small_runner(seed: u64) -> ScenarioRunner {
        let mut config = TreeConfig::default();
        config.foliage.count = 300;
        config.decorations.count = 40;
        config.lights.count = 60;
        ScenarioRunner::new(seed).with_config(config).with_duration(2.0)
    }

    fn assert_passes(scenario: ScenarioId) {
        let result = small_runner(42).run(scenario);
        assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
    }

    #[test]
    fn test_palm_scatter() {
        assert_passes(ScenarioId::PalmScatter);
    }

    #[test]
    fn test_pinch_open() {
        assert_passes(ScenarioId::PinchOpen);
    }

    #[test]
    fn test_pinch_release() {
        assert_passes(ScenarioId::PinchRelease);
    }

    #[test]
    fn test_formation_burst() {
        assert_passes(ScenarioId::FormationBurst);
    }

    #[test]
    fn test_flicker_rejection() {
        assert_passes(ScenarioId::FlickerRejection);
    }

    #[test]
    fn test_hysteresis_band() {
        assert_passes(ScenarioId::HysteresisBand);
    }

    #[test]
    fn test_anti_repeat() {
        assert_passes(ScenarioId::AntiRepeat);
    }

    #[test]
    fn test_classifier_outage() {
        assert_passes(ScenarioId::ClassifierOutage);
    }

    #[test]
    fn test_ambient_fireworks() {
        assert_passes(ScenarioId::AmbientFireworks);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = small_runner(7).run(ScenarioId::AntiRepeat);
        let b = small_runner(7).run(ScenarioId::AntiRepeat);
        assert_eq!(a.total_ticks, b.total_ticks);
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_export_samples_event_frames() {
        let (result, export) = small_runner(3).run_with_export(ScenarioId::PinchRelease);
        assert!(result.passed);
        assert_eq!(export.passed, result.passed);
        assert!(export.frames.iter().any(|f| f.events.iter().any(|e| e == "lightbox closed")));
    }

    #[test]
    fn test_invalid_config_fails_cleanly() {
        let mut config = TreeConfig::default();
        config.lightbox.candidate_count = 0;
        let result = ScenarioRunner::new(1).with_config(config).run(ScenarioId::PinchOpen);
        assert!(!result.passed);
        assert_eq!(result.total_ticks, 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(6))]

        #[test]
        fn prop_gesture_scenarios_pass_for_any_seed(seed in any::<u64>()) {
            for scenario in [ScenarioId::PalmScatter, ScenarioId::PinchRelease, ScenarioId::HysteresisBand] {
                let result = small_runner(seed).run(scenario);
                prop_assert!(result.passed, "{} seed {}: {:?}", scenario, seed, result.failure_reason);
            }
        }
    }
}
