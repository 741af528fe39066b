//! GestureTree Deterministic Simulation Harness
//!
//! Runs the whole tree runtime against a virtual clock and a scripted
//! classifier, so every gesture edge case replays bit-for-bit from a seed.
//!
//! # Pieces
//!
//! - **Time**: [`SimContext`] advances only when the harness ticks
//! - **Input**: [`SyntheticHand`] skeletons replayed by [`ScriptedClassifier`]
//! - **Randomness**: every stream derives from one 64-bit seed
//!
//! ```text
//! ScriptedClassifier ──result──► TreeRuntime::frame() ──► FrameReport
//!         ▲                            │                      │
//!   SyntheticHand               SimContext clock         SimExport (JSON)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gesturetree_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::PinchOpen);
//! assert!(result.passed);
//! ```

mod classifier;
mod context;
mod exporter;
mod runner;
pub mod scenarios;
mod synthetic;

pub use classifier::{ScriptFrame, ScriptedClassifier};
pub use context::SimContext;
pub use exporter::{SimExport, SimFrame};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use synthetic::SyntheticHand;
