//! Scripted classifier that replays hands, gaps and failures.

use crate::synthetic::SyntheticHand;
use async_trait::async_trait;
use gesturetree_env::{
    ClassifierOutput, ClassifierResult, EnvError, GestureClassifier, VideoFrame,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// One frame of classifier output.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptFrame {
    Hand(SyntheticHand),
    NoHand,
    Error(String),
}

impl ScriptFrame {
    /// `count` copies of this frame.
    pub fn repeat(self, count: usize) -> Vec<ScriptFrame> {
        vec![self; count]
    }
}

struct ScriptState {
    frames: VecDeque<ScriptFrame>,
    rng: ChaCha8Rng,
    served: u64,
}

/// Replays a queue of frames, one per `classify` call.
///
/// When the queue runs dry every further frame reports no hand.
pub struct ScriptedClassifier {
    state: Mutex<ScriptState>,
}

impl ScriptedClassifier {
    pub fn new(seed: u64) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                frames: VecDeque::new(),
                rng: ChaCha8Rng::seed_from_u64(seed),
                served: 0,
            }),
        }
    }

    pub fn with_script(seed: u64, frames: impl IntoIterator<Item = ScriptFrame>) -> Self {
        let classifier = Self::new(seed);
        classifier.extend(frames);
        classifier
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends frames to the end of the script.
    pub fn extend(&self, frames: impl IntoIterator<Item = ScriptFrame>) {
        self.lock().frames.extend(frames);
    }

    pub fn push(&self, frame: ScriptFrame) {
        self.lock().frames.push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.lock().frames.len()
    }

    /// Number of results handed out so far.
    pub fn served(&self) -> u64 {
        self.lock().served
    }

    /// Produces the next scripted result.
    pub fn next_result(&self, timestamp_ms: u64) -> ClassifierResult {
        let mut state = self.lock();
        state.served += 1;
        match state.frames.pop_front().unwrap_or(ScriptFrame::NoHand) {
            ScriptFrame::Hand(hand) => {
                let detection = hand.build(&mut state.rng);
                Ok(ClassifierOutput {
                    timestamp_ms,
                    hands: vec![detection],
                })
            }
            ScriptFrame::NoHand => Ok(ClassifierOutput::empty(timestamp_ms)),
            ScriptFrame::Error(message) => Err(EnvError::classifier(message)),
        }
    }
}

#[async_trait]
impl GestureClassifier for ScriptedClassifier {
    async fn classify(&self, frame: VideoFrame) -> ClassifierResult {
        self.next_result(frame.timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesturetree_env::{mailbox, spawn_classifier_pump, TokioContext};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_script_replays_in_order_then_runs_dry() {
        let classifier = ScriptedClassifier::with_script(
            1,
            vec![
                ScriptFrame::Hand(SyntheticHand::open_palm()),
                ScriptFrame::Error("model not loaded".into()),
            ],
        );

        let first = classifier.next_result(0).unwrap();
        assert_eq!(first.hands[0].gestures[0].label, "Open_Palm");
        assert!(classifier.next_result(33).is_err());
        assert!(classifier.next_result(66).unwrap().hands.is_empty());
        assert_eq!(classifier.served(), 3);
    }

    #[tokio::test]
    async fn test_pump_delivers_scripted_results() {
        let ctx = TokioContext::new();
        let classifier = Arc::new(ScriptedClassifier::with_script(
            2,
            ScriptFrame::Hand(SyntheticHand::fist()).repeat(1),
        ));
        let (frame_tx, frame_rx) = mailbox();
        let (result_tx, mut result_rx) = mailbox();
        spawn_classifier_pump(&ctx, classifier, frame_rx, result_tx);

        frame_tx
            .publish(VideoFrame::new(7, 1, 1, Arc::from(vec![0u8; 3])))
            .unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), result_rx.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(result.timestamp_ms, 7);
        assert_eq!(result.hands[0].gestures[0].label, "Closed_Fist");
    }
}
