//! In-process publish/subscribe for [`LifecycleEvent`]s.
//!
//! Handlers dispatch and move on; nothing waits for subscribers. A
//! subscriber that falls more than the channel capacity behind sees
//! `RecvError::Lagged` and skips ahead.

use crm_core::events::LifecycleEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
  tx: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn dispatch(&self, event: LifecycleEvent) {
    tracing::debug!(event = %event, "dispatch");
    // No subscribers is not an error.
    self.tx.send(event).ok();
  }

  pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> { self.tx.subscribe() }
}

impl Default for EventBus {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

#[cfg(test)]
mod tests {
  use crm_core::events::{Action, Resource};

  use super::*;

  #[tokio::test]
  async fn subscribers_receive_in_dispatch_order() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();

    bus.dispatch(LifecycleEvent::before(Resource::Tag, Action::Create, None));
    bus.dispatch(LifecycleEvent::after(Resource::Tag, Action::Create, 3));

    assert_eq!(rx.recv().await.unwrap().name(), "settings.tag.create.before");
    assert_eq!(rx.recv().await.unwrap().id, Some(3));
  }

  #[test]
  fn dispatch_without_subscribers_is_silent() {
    EventBus::default().dispatch(LifecycleEvent::after(Resource::Lead, Action::Create, 1));
  }
}
