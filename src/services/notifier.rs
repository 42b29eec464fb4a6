use std::sync::mpsc::{self, Receiver, Sender};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    /// A full rebuild finished.
    Drew,
    /// An incremental sync finished.
    TeamPositionUpdated,
    VisibilityUpdated,
}

/// Fans board events out to every live subscriber.
#[derive(Debug, Default)]
pub struct Notifier {
    subscribers: Vec<Sender<BoardEvent>>,
}

impl Notifier {
    pub fn subscribe(&mut self) -> Receiver<BoardEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Subscribers whose receiver was dropped are forgotten.
    pub fn emit(&mut self, event: BoardEvent) {
        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(event).is_ok());
        let dropped = before - self.subscribers.len();
        if dropped > 0 {
            debug!("Dropped {} closed board event subscriber(s)", dropped);
        }
    }
}
