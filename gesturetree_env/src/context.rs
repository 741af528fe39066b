//! Core environment context trait for GestureTree runtimes.

use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::time::Duration;

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that the GestureTree engines can
/// run against a wall clock in production and a virtual clock in tests.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `Instant`, `tokio::time`, OS entropy
/// - **Simulation**: `SimContext` - manually advanced clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// All methods that would normally introduce non-determinism (time,
/// randomness) are controlled by the implementation.
#[async_trait]
pub trait TreeContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// This is the frame clock: every timer, cooldown and burst lifetime is
    /// measured against it.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    ///
    /// Used for the classifier pump, which must never block the frame loop.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns an independent random stream for one subsystem.
    ///
    /// The implementation combines the global seed with `salt`, so each
    /// population / simulator gets a reproducible stream that does not shift
    /// when another subsystem draws more numbers.
    fn rng_stream(&self, salt: u64) -> ChaCha8Rng;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
