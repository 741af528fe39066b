//! Gesture classifier boundary and the background pump that drives it.

use crate::{ClassifierResult, MailboxReceiver, MailboxSender, TreeContext, VideoFrame};
use async_trait::async_trait;
use std::sync::Arc;

/// Black-box hand gesture classifier.
///
/// Implementations may be slow (accelerator round trips); the frame loop
/// never awaits them directly.
#[async_trait]
pub trait GestureClassifier: Send + Sync {
    /// Classifies one video frame.
    async fn classify(&self, frame: VideoFrame) -> ClassifierResult;
}

/// Runs `classifier` on a background task.
///
/// The task takes the most recent frame from `frames`, classifies it and
/// publishes the result into `results`. Frames submitted while a
/// classification is in flight overwrite each other, so only the newest one
/// is classified next. The task ends when either mailbox closes.
pub fn spawn_classifier_pump<Ctx, C>(
    ctx: &Ctx,
    classifier: Arc<C>,
    mut frames: MailboxReceiver<VideoFrame>,
    results: MailboxSender<ClassifierResult>,
) where
    Ctx: TreeContext,
    C: GestureClassifier + 'static,
{
    ctx.spawn("classifier-pump", async move {
        while let Some(frame) = frames.recv().await {
            let result = classifier.classify(frame).await;
            if results.publish(result).is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mailbox, ClassifierOutput, EnvError, TokioContext};
    use std::time::Duration;

    /// Echoes the frame timestamp; fails on odd timestamps.
    struct EchoClassifier;

    #[async_trait]
    impl GestureClassifier for EchoClassifier {
        async fn classify(&self, frame: VideoFrame) -> ClassifierResult {
            if frame.timestamp_ms % 2 == 1 {
                return Err(EnvError::classifier("odd frame"));
            }
            Ok(ClassifierOutput::empty(frame.timestamp_ms))
        }
    }

    fn frame(ts: u64) -> VideoFrame {
        VideoFrame::new(ts, 1, 1, Arc::from(vec![0u8]))
    }

    #[tokio::test]
    async fn test_pump_publishes_results() {
        let ctx = TokioContext::new();
        let (frame_tx, frame_rx) = mailbox();
        let (result_tx, mut result_rx) = mailbox();

        spawn_classifier_pump(&ctx, Arc::new(EchoClassifier), frame_rx, result_tx);

        frame_tx.publish(frame(4)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), result_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.unwrap().timestamp_ms, 4);

        frame_tx.publish(frame(5)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), result_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, Err(EnvError::classifier("odd frame")));
    }

    #[tokio::test]
    async fn test_pump_stops_when_frames_close() {
        let ctx = TokioContext::new();
        let (frame_tx, frame_rx) = mailbox();
        let (result_tx, mut result_rx) = mailbox::<ClassifierResult>();

        spawn_classifier_pump(&ctx, Arc::new(EchoClassifier), frame_rx, result_tx);
        drop(frame_tx);

        // Pump exits and drops its sender
        let ended = tokio::time::timeout(Duration::from_secs(1), result_rx.recv())
            .await
            .unwrap();
        assert!(ended.is_none());
    }
}
