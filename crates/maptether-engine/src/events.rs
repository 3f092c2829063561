#![forbid(unsafe_code)]

//! Normalized viewport event stream and subscription management.
//!
//! The host map fires many differently-shaped events (pan, zoom, drag,
//! idle, resize). The engine folds them all into one [`ViewportChanged`]
//! value and fans that out through a single [`EventHub`], so every internal
//! consumer sees the same stream and every subscriber holds exactly one
//! disposable handle.
//!
//! # Invariants
//!
//! 1. Dropping a [`SubscriptionHandle`] unsubscribes; no callback runs for
//!    a dropped handle, even if the drop happens between publishes.
//! 2. Dead subscribers are pruned on the next publish, so a long-lived hub
//!    does not accumulate tombstones.
//! 3. The hub is single-threaded by construction (`Rc`, not `Arc`): it
//!    lives on the UI thread with everything else in this crate.

use std::cell::Cell;
use std::rc::Rc;

use maptether_core::viewport::ViewportState;

/// Kind of host-map viewport event, normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEventKind {
    /// Visible bounds changed for any reason.
    BoundsChanged,
    /// The map center moved programmatically or by pan.
    CenterChanged,
    /// A zoom gesture began.
    ZoomStart,
    /// Zoom level changed (may fire repeatedly during a pinch/wheel).
    ZoomChanged,
    /// The zoom gesture ended; the settle animation may still run.
    ZoomEnd,
    /// A map drag began.
    DragStart,
    /// Continuous map drag frame.
    Drag,
    /// The map drag ended.
    DragEnd,
    /// The map finished all movement and animations.
    Idle,
    /// The viewport's pixel dimensions changed.
    Resized,
}

/// One normalized viewport event with the viewport observed at fire time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportChanged {
    pub kind: ViewportEventKind,
    pub viewport: ViewportState,
}

/// Unique identifier for a hub subscriber.
pub type SubscriberId = u64;

struct HubSubscriber {
    id: SubscriberId,
    alive: Rc<Cell<bool>>,
    callback: Box<dyn FnMut(&ViewportChanged)>,
}

/// Disposable subscription handle; dropping it unsubscribes.
///
/// This is the teardown guarantee for listener hygiene: when the owner of a
/// handle goes away (panel closed, view dismounted), its subscription dies
/// with it, and no zombie recompute loop can keep running off a leaked
/// listener.
#[must_use = "dropping the handle unsubscribes; hold it for the subscription's lifetime"]
pub struct SubscriptionHandle {
    id: SubscriberId,
    alive: Rc<Cell<bool>>,
}

impl SubscriptionHandle {
    /// The subscriber id this handle controls.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Explicitly unsubscribe before drop.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.alive.set(false);
    }
}

/// Single-threaded fan-out hub for [`ViewportChanged`] events.
#[derive(Default)]
pub struct EventHub {
    subscribers: Vec<HubSubscriber>,
    next_id: SubscriberId,
}

impl EventHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; the returned handle unsubscribes on drop.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&ViewportChanged) + 'static,
    ) -> SubscriptionHandle {
        let id = self.next_id;
        self.next_id += 1;
        let alive = Rc::new(Cell::new(true));
        tracing::debug!(subscriber = id, "viewport subscriber registered");
        self.subscribers.push(HubSubscriber {
            id,
            alive: Rc::clone(&alive),
            callback: Box::new(callback),
        });
        SubscriptionHandle { id, alive }
    }

    /// Deliver an event to every live subscriber, pruning dead ones.
    pub fn publish(&mut self, event: &ViewportChanged) {
        self.subscribers.retain(|s| {
            if !s.alive.get() {
                tracing::debug!(subscriber = s.id, "pruning dropped viewport subscriber");
            }
            s.alive.get()
        });
        for subscriber in &mut self.subscribers {
            (subscriber.callback)(event);
        }
    }

    /// Number of live subscribers (dead-but-unpruned excluded).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|s| s.alive.get()).count()
    }

    /// Drop every subscription (engine dismount).
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{EventHub, ViewportChanged, ViewportEventKind};
    use maptether_core::geo::GeoPoint;
    use maptether_core::viewport::ViewportState;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn event(kind: ViewportEventKind) -> ViewportChanged {
        ViewportChanged {
            kind,
            viewport: ViewportState::new(GeoPoint::default(), 10.0, 1000.0, 800.0),
        }
    }

    #[test]
    fn subscribers_receive_published_events() {
        let mut hub = EventHub::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _handle = hub.subscribe(move |e| sink.borrow_mut().push(e.kind));

        hub.publish(&event(ViewportEventKind::ZoomStart));
        hub.publish(&event(ViewportEventKind::Idle));

        assert_eq!(
            *seen.borrow(),
            vec![ViewportEventKind::ZoomStart, ViewportEventKind::Idle]
        );
    }

    #[test]
    fn dropping_the_handle_unsubscribes() {
        let mut hub = EventHub::new();
        let seen = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&seen);
        let handle = hub.subscribe(move |_| *sink.borrow_mut() += 1);

        hub.publish(&event(ViewportEventKind::Idle));
        drop(handle);
        hub.publish(&event(ViewportEventKind::Idle));

        assert_eq!(*seen.borrow(), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn explicit_unsubscribe_behaves_like_drop() {
        let mut hub = EventHub::new();
        let handle = hub.subscribe(|_| {});
        assert_eq!(hub.subscriber_count(), 1);
        handle.unsubscribe();
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn multiple_subscribers_each_get_one_handle() {
        let mut hub = EventHub::new();
        let a = hub.subscribe(|_| {});
        let b = hub.subscribe(|_| {});
        assert_ne!(a.id(), b.id());
        assert_eq!(hub.subscriber_count(), 2);
        drop(a);
        assert_eq!(hub.subscriber_count(), 1);
        drop(b);
    }

    #[test]
    fn clear_tears_everything_down() {
        let mut hub = EventHub::new();
        let _a = hub.subscribe(|_| {});
        let _b = hub.subscribe(|_| {});
        hub.clear();
        assert_eq!(hub.subscriber_count(), 0);
    }
}
