use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::debug;

use crate::notification::Notification;

#[derive(Debug)]
pub struct Broadcast {
    tx: Sender<Notification>,
    rx: Receiver<Notification>,
}

impl Broadcast {
    pub fn new() -> Self {
        let (tx, rx) = broadcast::channel(20);
        Self { tx, rx }
    }

    /// Publishing never fails: the broadcast keeps a receiver of its own.
    pub fn send(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("notification dropped, no receivers");
        }
    }

    pub fn send_error(&self, message: impl Into<String>) {
        self.send(Notification::Error {
            message: message.into(),
        });
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.rx.resubscribe()
    }
}

impl Default for Broadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_later_notifications() {
        let broadcast = Broadcast::new();
        let mut receiver = broadcast.subscribe();

        broadcast.send_error("decode failed");

        assert_eq!(
            receiver.recv().await.unwrap(),
            Notification::Error {
                message: "decode failed".into()
            }
        );
    }
}
