//! Single-slot mailbox between the classifier task and the frame loop.
//!
//! Publishing overwrites whatever is in the slot. A reader sees each value at
//! most once and never waits: a slow consumer drops intermediate values
//! instead of queueing them.

use crate::EnvError;
use tokio::sync::watch;

/// Creates a connected mailbox pair.
pub fn mailbox<T: Clone>() -> (MailboxSender<T>, MailboxReceiver<T>) {
    let (tx, rx) = watch::channel(None);
    (MailboxSender { tx }, MailboxReceiver { rx })
}

/// Writing half of a mailbox.
#[derive(Debug)]
pub struct MailboxSender<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> MailboxSender<T> {
    /// Replaces the slot content.
    ///
    /// Fails only if the receiver has been dropped.
    pub fn publish(&self, value: T) -> Result<(), EnvError> {
        self.tx.send(Some(value)).map_err(|_| EnvError::MailboxClosed)
    }

    /// True if the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Reading half of a mailbox.
#[derive(Debug)]
pub struct MailboxReceiver<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> MailboxReceiver<T> {
    /// Returns the slot content if it was published since the last read.
    ///
    /// Non-blocking; returns `None` when nothing new arrived or the sender is gone.
    pub fn take_latest(&mut self) -> Option<T> {
        match self.rx.has_changed() {
            Ok(true) => self.rx.borrow_and_update().clone(),
            _ => None,
        }
    }

    /// Waits for the next published value.
    ///
    /// Returns `None` once the sender has been dropped.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(value) = self.rx.borrow_and_update().clone() {
                return Some(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_latest_sees_each_value_once() {
        let (tx, mut rx) = mailbox::<u32>();
        assert_eq!(rx.take_latest(), None);

        tx.publish(1).unwrap();
        assert_eq!(rx.take_latest(), Some(1));
        assert_eq!(rx.take_latest(), None);
    }

    #[test]
    fn test_publish_overwrites_unread_value() {
        let (tx, mut rx) = mailbox::<u32>();

        tx.publish(1).unwrap();
        tx.publish(2).unwrap();
        tx.publish(3).unwrap();

        // Intermediate values are dropped, not queued
        assert_eq!(rx.take_latest(), Some(3));
        assert_eq!(rx.take_latest(), None);
    }

    #[test]
    fn test_publish_fails_after_receiver_dropped() {
        let (tx, rx) = mailbox::<u32>();
        drop(rx);

        assert!(tx.is_closed());
        assert_eq!(tx.publish(1), Err(EnvError::MailboxClosed));
    }

    #[tokio::test]
    async fn test_recv_ends_when_sender_dropped() {
        let (tx, mut rx) = mailbox::<u32>();
        tx.publish(7).unwrap();
        assert_eq!(rx.recv().await, Some(7));

        drop(tx);
        assert_eq!(rx.recv().await, None);
    }
}
