//! GestureTree Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" boundary that lets the GestureTree
//! engines run against a **Production** clock (tokio + `Instant`) or a
//! **Simulation** clock (virtual time advanced by a test harness).
//!
//! # Core Concept: One Frame, One Pass
//!
//! Everything the engines observe from the outside world is intercepted here:
//! - Time (`now()`, `sleep()`)
//! - Randomness (`rng_stream()`), derived from a single 64-bit seed
//! - Gesture classification (`GestureClassifier`), delivered through a
//!   single-slot [`mailbox`] so a slow classifier drops frames instead of
//!   queueing them
//!
//! # Example
//!
//! ```ignore
//! use gesturetree_env::{mailbox, spawn_classifier_pump, TokioContext};
//!
//! let ctx = TokioContext::shared();
//! let (frame_tx, frame_rx) = mailbox();
//! let (result_tx, mut result_rx) = mailbox();
//! spawn_classifier_pump(ctx.as_ref(), classifier, frame_rx, result_tx);
//!
//! loop {
//!     frame_tx.publish(next_video_frame())?;
//!     if let Some(result) = result_rx.take_latest() {
//!         runtime.submit_classification(result);
//!     }
//!     runtime.frame();
//! }
//! ```

mod classifier;
mod context;
mod error;
mod mailbox;
mod tokio_impl;
mod types;

pub use classifier::{spawn_classifier_pump, GestureClassifier};
pub use context::TreeContext;
pub use error::EnvError;
pub use mailbox::{mailbox, MailboxReceiver, MailboxSender};
pub use tokio_impl::TokioContext;
pub use types::{
    landmark, ClassifierOutput, ClassifierResult, GestureCategory, HandDetection, Landmark,
    VideoFrame, LANDMARK_COUNT,
};
