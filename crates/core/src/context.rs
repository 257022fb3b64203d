//! A key/value store that maintains application context and publishes
//! change notifications when any member changes.
//!
//! Every producer (API agents, host channel) and consumer (renderers, the
//! CLI) talks to the [`Context`] instead of talking to each other. Change
//! notifications are delivered synchronously, in subscription-registration
//! order, within the `set` call that triggered them.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Well-known context keys.
pub mod keys {
    /// The ready state of the application.
    pub const READY: &str = "ready";
    /// The input address to be used for lookup.
    pub const ADDRESS: &str = "address";
    /// The currently selected state.
    pub const REGION: &str = "region";
    /// The information returned by the last lookup.
    pub const CIVIC_INFO: &str = "civic_info";
    /// The last published notice.
    pub const NOTICE: &str = "notice";
    /// The referring page or parent frame.
    pub const REFERRER: &str = "referrer";
    /// The last published configuration.
    pub const CONFIG: &str = "config";
    /// The last reported address entry string.
    pub const ADDRESS_ENTRY: &str = "address_entry";
    /// The last address suggestion.
    pub const ADDRESS_SUGGESTION: &str = "address_suggestion";
}

/// Opaque handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(Option<&Value>, Option<&Value>) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    tag: Option<String>,
    handler: Handler,
}

#[derive(Default)]
struct Inner {
    map: HashMap<String, Value>,
    subscribers: HashMap<String, Vec<Subscription>>,
    /// Subscription id -> key, for O(1) removal by id.
    index: HashMap<SubscriptionId, String>,
    next_id: u64,
    disposed: bool,
}

/// A key/value store with per-key change notification.
///
/// One instance per page session. Values are loosely-typed
/// [`serde_json::Value`]s; callers that need structure deserialize at the
/// edge. Every `set` publishes exactly once — there is no equality dedup, so
/// storing an equal value still notifies subscribers.
///
/// Notification handlers may re-enter the context (`set`, `subscribe`,
/// `unsubscribe`) freely: publish iterates a snapshot of the subscriber list
/// taken when it starts, so mutations during a cycle affect only subsequent
/// publishes.
#[derive(Default)]
pub struct Context {
    inner: Mutex<Inner>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_live(&self, op: &str) -> std::sync::MutexGuard<'_, Inner> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.disposed {
            panic!("Context::{op} called after dispose");
        }
        inner
    }

    /// Stores data at the given key and notifies subscribers of the key with
    /// the new and previous values.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let (old, snapshot) = {
            let mut inner = self.lock_live("set");
            let old = inner.map.insert(key.to_string(), value.clone());
            (old, snapshot_for(&inner, key))
        };
        for handler in &snapshot {
            handler(Some(&value), old.as_ref());
        }
    }

    /// Gets the value stored at the given key, or `None` if absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock_live("get").map.get(key).cloned()
    }

    /// Removes the value at the given key. Subscribers are notified only if
    /// a value was actually removed. Returns whether a removal occurred.
    pub fn remove(&self, key: &str) -> bool {
        let (old, snapshot) = {
            let mut inner = self.lock_live("remove");
            let old = inner.map.remove(key);
            (old, snapshot_for(&inner, key))
        };
        match old {
            Some(old) => {
                for handler in &snapshot {
                    handler(None, Some(&old));
                }
                true
            }
            None => false,
        }
    }

    /// Subscribes a handler to change notifications for a given key.
    /// Returns the subscription id.
    pub fn subscribe<F>(&self, key: &str, handler: F) -> SubscriptionId
    where
        F: Fn(Option<&Value>, Option<&Value>) + Send + Sync + 'static,
    {
        self.register(key, None, Arc::new(handler))
    }

    /// Subscribes a handler under an owner tag. The tag stands in for the
    /// original binding context and enables bulk-style removal with
    /// [`Context::unsubscribe`].
    pub fn subscribe_tagged<F>(&self, key: &str, tag: &str, handler: F) -> SubscriptionId
    where
        F: Fn(Option<&Value>, Option<&Value>) + Send + Sync + 'static,
    {
        self.register(key, Some(tag.to_string()), Arc::new(handler))
    }

    fn register(&self, key: &str, tag: Option<String>, handler: Handler) -> SubscriptionId {
        let mut inner = self.lock_live("subscribe");
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.index.insert(id, key.to_string());
        inner
            .subscribers
            .entry(key.to_string())
            .or_default()
            .push(Subscription { id, tag, handler });
        id
    }

    /// Removes the first subscription matching `(key, tag)` by linear scan.
    /// Returns whether a matching subscription was removed.
    pub fn unsubscribe(&self, key: &str, tag: &str) -> bool {
        let mut inner = self.lock_live("unsubscribe");
        let Some(subs) = inner.subscribers.get_mut(key) else {
            return false;
        };
        let Some(pos) = subs.iter().position(|s| s.tag.as_deref() == Some(tag)) else {
            return false;
        };
        let removed = subs.remove(pos);
        inner.index.remove(&removed.id);
        true
    }

    /// Removes a subscription by its id. Returns whether a matching
    /// subscription was removed.
    pub fn unsubscribe_by_id(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock_live("unsubscribe_by_id");
        let Some(key) = inner.index.remove(&id) else {
            return false;
        };
        if let Some(subs) = inner.subscribers.get_mut(&key) {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                subs.remove(pos);
                return true;
            }
        }
        false
    }

    /// Releases all subscriptions and clears the backing map. The context
    /// must not be used afterwards: any operation on a disposed context
    /// panics. Dispose itself is idempotent.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(
            keys = inner.map.len(),
            subscriptions = inner.index.len(),
            "Context disposed"
        );
        inner.disposed = true;
        inner.map.clear();
        inner.subscribers.clear();
        inner.index.clear();
    }
}

/// Clone the handler list for a key. Publish iterates this snapshot so that
/// handlers mutating subscriptions mid-cycle cannot skip or double-invoke
/// their peers.
fn snapshot_for(inner: &Inner, key: &str) -> Vec<Handler> {
    inner
        .subscribers
        .get(key)
        .map(|subs| subs.iter().map(|s| Arc::clone(&s.handler)).collect())
        .unwrap_or_default()
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Context")
            .field("keys", &inner.map.len())
            .field("subscriptions", &inner.index.len())
            .field("disposed", &inner.disposed)
            .finish()
    }
}
