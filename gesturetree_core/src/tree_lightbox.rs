//! The "LIGHTBOX" Engine - Photo selection and open/close lifecycle
//!
//! ```text
//! CLOSED --pinch, cooldown elapsed, not latched--> OPENING (opacity 0)
//! OPENING --fade-in timer--> OPEN (opacity 1)
//! OPEN/OPENING --pinch released--> CLOSING (opacity 0, close timer)
//! CLOSING --close timer--> CLOSED
//! ```
//!
//! Selection ranks the ornaments nearest the camera, drops photos seen
//! recently and picks one with weights `N - rank`, so closer photos are
//! likelier but never guaranteed.

use crate::timers::OneShotTimer;
use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for photo selection and the lightbox lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightboxConfig {
    /// No opening for this long after a scene state change (ms)
    pub cooldown_ms: u64,

    /// Delay between showing the lightbox at opacity 0 and raising it to 1 (ms)
    pub fade_in_ms: u64,

    /// Fade-out time before the lightbox is considered closed (ms)
    pub close_delay_ms: u64,

    /// Recently viewed photos remembered for anti-repeat
    pub history_capacity: usize,

    /// Nearest ornaments considered as candidates
    pub candidate_count: usize,
}

impl Default for LightboxConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 650,
            fade_in_ms: 50,
            close_delay_ms: 400,
            history_capacity: 10,
            candidate_count: 5,
        }
    }
}

// ============================================================================
// RECENT HISTORY
// ============================================================================

/// Bounded FIFO of recently viewed photo indices.
#[derive(Debug, Clone)]
pub struct RecentHistory {
    capacity: usize,
    entries: VecDeque<usize>,
}

impl RecentHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Records a view, evicting the oldest entry when full.
    pub fn push(&mut self, photo: usize) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(photo);
    }

    pub fn contains(&self, photo: usize) -> bool {
        self.entries.contains(&photo)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().copied()
    }
}

// ============================================================================
// PHOTO SELECTOR
// ============================================================================

/// Weighted, anti-repeat photo picker.
pub struct PhotoSelector {
    rng: ChaCha8Rng,
    history: RecentHistory,
}

impl PhotoSelector {
    pub fn new(rng: ChaCha8Rng, history_capacity: usize) -> Self {
        Self {
            rng,
            history: RecentHistory::new(history_capacity),
        }
    }

    pub fn history(&self) -> &RecentHistory {
        &self.history
    }

    /// Picks one of `candidates` (photo indices, nearest first) and records it.
    ///
    /// Recently viewed photos are filtered out unless that leaves nothing, in
    /// which case the unfiltered list is used. Rank `i` of `N` gets weight
    /// `N - i`.
    pub fn select(&mut self, candidates: &[usize]) -> Option<usize> {
        let fresh: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|p| !self.history.contains(*p))
            .collect();
        let pool: &[usize] = if fresh.is_empty() { candidates } else { &fresh };

        let chosen = Self::weighted_pick(&mut self.rng, pool)?;
        self.history.push(chosen);
        Some(chosen)
    }

    fn weighted_pick(rng: &mut ChaCha8Rng, pool: &[usize]) -> Option<usize> {
        let n = pool.len();
        let weights = (0..n).map(|i| n - i);
        let dist = WeightedIndex::new(weights).ok()?;
        Some(pool[dist.sample(rng)])
    }
}

// ============================================================================
// LIGHTBOX STATE MACHINE
// ============================================================================

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightboxPhase {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

/// Edges emitted during one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum LightboxEvent {
    Opened { photo: usize },
    FadedIn,
    CloseStarted,
    Closed,
}

/// Read-only view for renderers and exporters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightboxSnapshot {
    pub phase: LightboxPhase,
    pub is_open: bool,
    pub selected_photo: Option<usize>,
    pub opacity: f32,
}

/// The lightbox and the selector that feeds it.
pub struct Lightbox {
    config: LightboxConfig,
    selector: PhotoSelector,
    phase: LightboxPhase,
    is_open: bool,
    selected_photo: Option<usize>,
    opacity: f32,
    /// Set when the current pinch opened the lightbox; cleared on release
    has_pinched: bool,
    fade_timer: OneShotTimer,
    close_timer: OneShotTimer,
    last_scene_change: Option<Duration>,
}

impl Lightbox {
    pub fn new(config: LightboxConfig, rng: ChaCha8Rng) -> Self {
        let selector = PhotoSelector::new(rng, config.history_capacity);
        Self {
            config,
            selector,
            phase: LightboxPhase::Closed,
            is_open: false,
            selected_photo: None,
            opacity: 0.0,
            has_pinched: false,
            fade_timer: OneShotTimer::new(),
            close_timer: OneShotTimer::new(),
            last_scene_change: None,
        }
    }

    pub fn config(&self) -> &LightboxConfig {
        &self.config
    }

    pub fn phase(&self) -> LightboxPhase {
        self.phase
    }

    /// Logical open flag; true from OPENING until the close timer fires.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn selected_photo(&self) -> Option<usize> {
        self.selected_photo
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn history(&self) -> &RecentHistory {
        self.selector.history()
    }

    pub fn snapshot(&self) -> LightboxSnapshot {
        LightboxSnapshot {
            phase: self.phase,
            is_open: self.is_open,
            selected_photo: self.selected_photo,
            opacity: self.opacity,
        }
    }

    /// Starts the post-toggle cooldown.
    pub fn note_scene_change(&mut self, now: Duration) {
        self.last_scene_change = Some(now);
    }

    fn cooldown_elapsed(&self, now: Duration) -> bool {
        match self.last_scene_change {
            None => true,
            Some(at) => now.saturating_sub(at) >= Duration::from_millis(self.config.cooldown_ms),
        }
    }

    /// Advances the state machine by one frame.
    ///
    /// `candidates` is only called when an open is about to happen and must
    /// return photo indices of the nearest ornaments, nearest first.
    pub fn update<F>(&mut self, now: Duration, pinch: bool, candidates: F) -> Vec<LightboxEvent>
    where
        F: FnOnce(usize) -> Vec<usize>,
    {
        let mut events = Vec::new();

        // Timers first: they belong to edges taken on earlier frames
        if self.fade_timer.poll(now) {
            self.opacity = 1.0;
            self.phase = LightboxPhase::Open;
            events.push(LightboxEvent::FadedIn);
        }
        if self.close_timer.poll(now) {
            self.is_open = false;
            self.selected_photo = None;
            self.phase = LightboxPhase::Closed;
            info!("Lightbox closed");
            events.push(LightboxEvent::Closed);
        }

        if !pinch {
            self.has_pinched = false;
            if self.is_open && !self.close_timer.is_pending() {
                self.fade_timer.cancel();
                self.opacity = 0.0;
                self.phase = LightboxPhase::Closing;
                self.close_timer.arm(now, Duration::from_millis(self.config.close_delay_ms));
                debug!("Lightbox closing");
                events.push(LightboxEvent::CloseStarted);
            }
        } else if !self.is_open && !self.has_pinched && self.cooldown_elapsed(now) {
            let ranked = candidates(self.config.candidate_count);
            if let Some(photo) = self.selector.select(&ranked) {
                self.has_pinched = true;
                self.is_open = true;
                self.selected_photo = Some(photo);
                self.opacity = 0.0;
                self.phase = LightboxPhase::Opening;
                self.fade_timer.arm(now, Duration::from_millis(self.config.fade_in_ms));
                info!("Lightbox opened on photo {}", photo);
                events.push(LightboxEvent::Opened { photo });
            }
        }

        events
    }

    /// Cancels pending timers and closes immediately (teardown).
    pub fn shutdown(&mut self) {
        self.fade_timer.cancel();
        self.close_timer.cancel();
        self.is_open = false;
        self.selected_photo = None;
        self.opacity = 0.0;
        self.phase = LightboxPhase::Closed;
        self.has_pinched = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn lightbox() -> Lightbox {
        Lightbox::new(LightboxConfig::default(), ChaCha8Rng::seed_from_u64(17))
    }

    fn nearest(_n: usize) -> Vec<usize> {
        vec![10, 11, 12, 13, 14]
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let mut history = RecentHistory::new(3);
        for p in 0..5 {
            history.push(p);
        }
        assert_eq!(history.iter().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert!(!history.contains(1));
    }

    #[test]
    fn test_selector_prefers_unseen_candidate() {
        let mut selector = PhotoSelector::new(ChaCha8Rng::seed_from_u64(1), 10);
        let candidates = [0, 1, 2, 3, 4];

        let mut unseen_hits = 0;
        let trials = 1000;
        for _ in 0..trials {
            // 4 of 5 already viewed
            selector.history = RecentHistory::new(10);
            for p in [0, 1, 3, 4] {
                selector.history.push(p);
            }
            if selector.select(&candidates) == Some(2) {
                unseen_hits += 1;
            }
        }
        assert_eq!(unseen_hits, trials);
    }

    #[test]
    fn test_selector_falls_back_when_all_seen() {
        let mut selector = PhotoSelector::new(ChaCha8Rng::seed_from_u64(2), 10);
        for p in 0..5 {
            selector.history.push(p);
        }
        let pick = selector.select(&[0, 1, 2, 3, 4]).unwrap();
        assert!(pick < 5);
        assert_eq!(selector.select(&[]), None);
    }

    #[test]
    fn test_selector_weights_favour_nearest() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let pool = [7, 8, 9, 10, 11];
        let mut counts = [0usize; 5];
        for _ in 0..15_000 {
            let pick = PhotoSelector::weighted_pick(&mut rng, &pool).unwrap();
            counts[pick - 7] += 1;
        }

        // Expected shares 5:4:3:2:1 out of 15
        assert!(counts.windows(2).all(|w| w[0] > w[1]), "{:?}", counts);
        assert!((counts[0] as f32 / 15_000.0 - 5.0 / 15.0).abs() < 0.02);
        assert!(counts[4] > 0);
    }

    #[test]
    fn test_open_fade_in_close_lifecycle() {
        let mut lb = lightbox();

        let events = lb.update(ms(1000), true, nearest);
        assert!(matches!(events[..], [LightboxEvent::Opened { .. }]));
        assert_eq!(lb.phase(), LightboxPhase::Opening);
        assert_eq!(lb.opacity(), 0.0);
        assert!(lb.is_open());
        assert!((10..15).contains(&lb.selected_photo().unwrap()));

        assert_eq!(lb.update(ms(1050), true, nearest), vec![LightboxEvent::FadedIn]);
        assert_eq!(lb.phase(), LightboxPhase::Open);
        assert_eq!(lb.opacity(), 1.0);

        assert_eq!(lb.update(ms(2000), false, nearest), vec![LightboxEvent::CloseStarted]);
        assert_eq!(lb.phase(), LightboxPhase::Closing);
        assert_eq!(lb.opacity(), 0.0);
        assert!(lb.is_open());

        assert!(lb.update(ms(2399), false, nearest).is_empty());
        assert_eq!(lb.update(ms(2400), false, nearest), vec![LightboxEvent::Closed]);
        assert!(!lb.is_open());
        assert_eq!(lb.selected_photo(), None);
    }

    #[test]
    fn test_repinch_during_closing_reopens_after_close() {
        let mut lb = lightbox();
        lb.update(ms(0), true, nearest);
        lb.update(ms(100), false, nearest);

        // Pending close is not cancelled; it fires, then the held pinch reopens
        let events = lb.update(ms(500), true, nearest);
        assert!(matches!(events.as_slice(), [LightboxEvent::Closed, LightboxEvent::Opened { .. }]));
        assert!(lb.is_open());

        // The new pinch is latched now
        let events = lb.update(ms(600), true, nearest);
        assert!(!events.iter().any(|e| matches!(e, LightboxEvent::Opened { .. })));
    }

    #[test]
    fn test_candidates_not_queried_while_latched() {
        let mut lb = lightbox();
        lb.update(ms(0), true, nearest);
        lb.update(ms(60), true, |_| panic!("should not rank while open"));
    }

    #[test]
    fn test_cooldown_defers_open_until_elapsed() {
        let mut lb = lightbox();
        lb.note_scene_change(ms(1000));

        assert!(lb.update(ms(1200), true, nearest).is_empty());
        assert!(lb.update(ms(1649), true, nearest).is_empty());
        let events = lb.update(ms(1650), true, nearest);
        assert!(matches!(events[..], [LightboxEvent::Opened { .. }]));
    }

    #[test]
    fn test_release_during_opening_cancels_fade_in() {
        let mut lb = lightbox();
        lb.update(ms(0), true, nearest);
        assert_eq!(lb.update(ms(20), false, nearest), vec![LightboxEvent::CloseStarted]);

        // Fade-in must not resurrect opacity while closing
        assert!(lb.update(ms(60), false, nearest).is_empty());
        assert_eq!(lb.opacity(), 0.0);
        assert_eq!(lb.update(ms(420), false, nearest), vec![LightboxEvent::Closed]);
    }

    #[test]
    fn test_no_photos_never_opens() {
        let mut lb = lightbox();
        for t in 0..10 {
            assert!(lb.update(ms(t * 100), true, |_| Vec::new()).is_empty());
        }
        assert_eq!(lb.phase(), LightboxPhase::Closed);
    }

    #[test]
    fn test_shutdown_cancels_pending_timers() {
        let mut lb = lightbox();
        lb.update(ms(0), true, nearest);
        lb.update(ms(10), false, nearest);
        lb.shutdown();

        assert!(lb.update(ms(5000), false, nearest).is_empty());
        assert_eq!(lb.snapshot().phase, LightboxPhase::Closed);
    }
}
