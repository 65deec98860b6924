//! The observer seam.

use async_trait::async_trait;

use crate::events::Event;

/// # Asynchronous event consumer.
///
/// Implementors receive every event published to the bus, in order, on a
/// dedicated listener task. Observers must be cheap or internally buffered;
/// a slow observer delays other observers on the same listener, never the
/// commands themselves.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use nodevisor::{Event, Observer};
///
/// struct Quiet;
///
/// #[async_trait]
/// impl Observer for Quiet {
///     async fn on_event(&self, _event: &Event) {}
/// }
/// ```
#[async_trait]
pub trait Observer: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);
}
