//! Edge-change event feed.
//!
//! The track graph emits an [`EdgeChange`] after every committed edge
//! insertion or removal. Consumers (the division graph) subscribe
//! with a handler and a [`CancelToken`]; once the token is signalled
//! the subscription is dropped on the next emission and never fires
//! again.
//!
//! The feed is single-threaded by design (`Rc`-backed, not `Send` or
//! `Sync`): emission happens synchronously inside the mutating call,
//! after the mutation commits, so handlers always observe the state
//! the event describes. Mutating the graph from inside a handler is
//! not supported.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::types::Key;

/// Payload describing one committed edge mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeChange<K> {
    /// First endpoint, as stored at insertion.
    pub a: K,
    /// Second endpoint, as stored at insertion.
    pub b: K,
    /// New edge length; `0` is the removal sentinel.
    pub length: u64,
}

impl<K> EdgeChange<K> {
    /// `true` when this event reports an edge removal.
    pub fn is_removal(&self) -> bool {
        self.length == 0
    }
}

/// One-shot cancellation flag shared between a subscriber and its
/// owner.
///
/// Cloning yields another handle on the same flag. Signalling is
/// idempotent: the first `cancel` takes effect, later calls are
/// no-ops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Rc<Cell<bool>>,
}

impl CancelToken {
    /// Create a fresh, unsignalled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.flag.set(true);
    }

    /// `true` once the token has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }
}

type Handler<K> = Rc<dyn Fn(&EdgeChange<K>)>;

struct Subscription<K> {
    token: CancelToken,
    handler: Handler<K>,
}

/// Single-threaded subscriber list for edge-change events.
///
/// Handles are cheap clones of the same underlying list. Emitting
/// with no live subscribers is not an error.
pub struct EdgeFeed<K> {
    subscribers: Rc<RefCell<Vec<Subscription<K>>>>,
}

impl<K> Clone for EdgeFeed<K> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Rc::clone(&self.subscribers),
        }
    }
}

impl<K> Default for EdgeFeed<K> {
    fn default() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<K> fmt::Debug for EdgeFeed<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeFeed")
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

impl<K: Key> EdgeFeed<K> {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every event emitted after this call.
    ///
    /// The subscription lives until `token` is cancelled; it is
    /// pruned on the first emission that observes the cancelled
    /// token.
    pub fn subscribe(&self, token: CancelToken, handler: impl Fn(&EdgeChange<K>) + 'static) {
        self.subscribers.borrow_mut().push(Subscription {
            token,
            handler: Rc::new(handler),
        });
    }

    /// Number of live (non-cancelled) subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|sub| !sub.token.is_cancelled())
            .count()
    }

    /// Deliver `change` to every live subscriber, dropping cancelled
    /// subscriptions first.
    pub(crate) fn emit(&self, change: &EdgeChange<K>) {
        let handlers: Vec<Handler<K>> = {
            let mut subs = self.subscribers.borrow_mut();
            subs.retain(|sub| !sub.token.is_cancelled());
            subs.iter().map(|sub| Rc::clone(&sub.handler)).collect()
        };
        for handler in handlers {
            handler(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(length: u64) -> EdgeChange<&'static str> {
        EdgeChange {
            a: "a",
            b: "b",
            length,
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_ok() {
        let feed: EdgeFeed<&str> = EdgeFeed::new();
        feed.emit(&change(5));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_sees_events_in_order() {
        let feed: EdgeFeed<&str> = EdgeFeed::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        feed.subscribe(CancelToken::new(), move |ev| {
            sink.borrow_mut().push(ev.length);
        });

        feed.emit(&change(5));
        feed.emit(&change(0));
        assert_eq!(*seen.borrow(), vec![5, 0]);
    }

    #[test]
    fn test_cancelled_subscription_is_pruned() {
        let feed: EdgeFeed<&str> = EdgeFeed::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let token = CancelToken::new();

        let sink = Rc::clone(&seen);
        feed.subscribe(token.clone(), move |ev| {
            sink.borrow_mut().push(ev.length);
        });

        feed.emit(&change(5));
        token.cancel();
        token.cancel(); // idempotent
        feed.emit(&change(7));

        assert_eq!(*seen.borrow(), vec![5]);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_removal_sentinel() {
        assert!(change(0).is_removal());
        assert!(!change(1).is_removal());
    }

    #[test]
    fn test_event_serialization_shape() {
        let json = serde_json::to_string(&change(5)).unwrap();
        assert_eq!(json, r#"{"a":"a","b":"b","length":5}"#);
    }
}
