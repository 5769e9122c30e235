//! Cancelable delayed delivery

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Holds at most one pending delayed send
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `message` on `tx` after `delay`, aborting whatever was pending
    pub fn schedule<T>(&mut self, delay: Duration, tx: mpsc::Sender<T>, message: T)
    where
        T: Send + 'static,
    {
        self.cancel();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the controller stopped
            let _ = tx.send(message).await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_delivers_after_delay() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut debouncer = Debouncer::new();

        debouncer.schedule(Duration::from_millis(300), tx, 1u64);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.recv().await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut debouncer = Debouncer::new();

        debouncer.schedule(Duration::from_millis(300), tx.clone(), 1u64);
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.schedule(Duration::from_millis(300), tx, 2u64);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(rx.try_recv().ok(), Some(2));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_message() {
        let (tx, mut rx) = mpsc::channel::<u64>(4);
        let mut debouncer = Debouncer::new();

        debouncer.schedule(Duration::from_millis(300), tx, 1);
        debouncer.cancel();

        assert!(!debouncer.is_pending());
        // Every sender is gone once the aborted task is dropped
        assert_eq!(rx.recv().await, None);
    }
}
