//! Event observers: consume the bus without touching the command path.
//!
//! An [`Observer`] receives every [`Event`](crate::Event) published to the
//! [`Bus`](crate::Bus). [`spawn_listener`] wires a set of observers to a bus
//! with lag tolerance and cooperative shutdown.

mod log;
mod observer;

pub use log::LogWriter;
pub use observer::Observer;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::events::Bus;

/// Spawns a background listener that fans bus events out to `observers`.
///
/// The listener runs until `token` is cancelled or the bus is dropped.
/// A lagging listener skips missed events and keeps going; observers never
/// apply backpressure to publishers.
pub fn spawn_listener(bus: &Bus, observers: Vec<Arc<dyn Observer>>, token: CancellationToken) {
    let mut rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => {
                        for obs in &observers {
                            obs.on_event(&ev).await;
                        }
                    }
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => continue,
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    #[async_trait]
    impl Observer for Counter {
        async fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_listener_receives_published_events() {
        let bus = Bus::new(16);
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let token = CancellationToken::new();
        spawn_listener(&bus, vec![counter.clone()], token.clone());

        // Let the listener subscribe before publishing.
        tokio::task::yield_now().await;
        bus.publish(Event::now(EventKind::SessionOpened).with_target("a@b"));
        bus.publish(Event::now(EventKind::SessionReaped).with_target("a@b"));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        token.cancel();
    }
}
