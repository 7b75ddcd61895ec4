//! Observable values for panel form state and chain queries
//!
//! A [`Cell`] is the single writer of a value; [`Signal`]s are cheap read
//! handles to a cell or to a value derived from other signals. Every value is
//! either ready (`Some`) or not ready (`None`), and a derivation over a value
//! that is not ready is itself not ready.
//!
//! Derived signals are lazy: an upstream mutation only marks them stale, and
//! the transform runs on the next read. A derived signal that has subscribers
//! of its own recomputes immediately so they can be notified.
//!
//! Notifications are synchronous and happen in mutation order. Locks are
//! released before subscribers run, so a subscriber may freely read other
//! signals.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

type Callback<T> = Arc<dyn Fn(Option<&T>) + Send + Sync>;
type Compute<T> = Box<dyn Fn() -> Option<T> + Send + Sync>;

struct Slot<T> {
    value: Option<T>,
    stale: bool,
    revision: u64,
}

struct Subscribers<T> {
    next_id: u64,
    list: Vec<(u64, Callback<T>)>,
}

struct Node<T> {
    slot: Mutex<Slot<T>>,
    subscribers: Mutex<Subscribers<T>>,
    compute: Option<Compute<T>>,
    /// Keeps this node registered with the signals it derives from.
    upstream: Mutex<Vec<Subscription>>,
}

trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64);
}

impl<T: Send + Sync + 'static> Unsubscribe for Node<T> {
    fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().list.retain(|(sid, _)| *sid != id);
    }
}

impl<T> Node<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn source(value: Option<T>) -> Self {
        Node {
            slot: Mutex::new(Slot {
                value,
                stale: false,
                revision: 0,
            }),
            subscribers: Mutex::new(Subscribers {
                next_id: 0,
                list: Vec::new(),
            }),
            compute: None,
            upstream: Mutex::new(Vec::new()),
        }
    }

    fn derived(compute: Compute<T>) -> Self {
        Node {
            slot: Mutex::new(Slot {
                value: None,
                stale: true,
                revision: 0,
            }),
            subscribers: Mutex::new(Subscribers {
                next_id: 0,
                list: Vec::new(),
            }),
            compute: Some(compute),
            upstream: Mutex::new(Vec::new()),
        }
    }

    fn get(&self) -> Option<T> {
        if let Some(compute) = &self.compute {
            if self.slot.lock().stale {
                let fresh = compute();
                let mut slot = self.slot.lock();
                slot.value = fresh;
                slot.stale = false;
            }
        }
        self.slot.lock().value.clone()
    }

    fn revision(&self) -> u64 {
        self.slot.lock().revision
    }

    fn store(&self, value: Option<T>) {
        let current = {
            let mut slot = self.slot.lock();
            slot.value = value;
            slot.stale = false;
            slot.revision += 1;
            slot.value.clone()
        };
        self.notify(current.as_ref());
    }

    fn invalidate(&self) {
        {
            let mut slot = self.slot.lock();
            slot.stale = true;
            slot.revision += 1;
        }
        if self.has_subscribers() {
            let current = self.get();
            self.notify(current.as_ref());
        }
    }

    fn has_subscribers(&self) -> bool {
        !self.subscribers.lock().list.is_empty()
    }

    fn notify(&self, value: Option<&T>) {
        let callbacks: Vec<Callback<T>> = self
            .subscribers
            .lock()
            .list
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }

    fn add_subscriber(self: &Arc<Self>, callback: Callback<T>) -> Subscription {
        let id = {
            let mut subs = self.subscribers.lock();
            let id = subs.next_id;
            subs.next_id += 1;
            subs.list.push((id, callback));
            id
        };
        let node: Weak<dyn Unsubscribe> = Arc::downgrade(self) as Weak<dyn Unsubscribe>;
        Subscription { node, id }
    }
}

/// Handle returned by `subscribe`; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    node: Weak<dyn Unsubscribe>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(node) = self.node.upgrade() {
            node.unsubscribe(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// The single writer of an observable value.
///
/// A `Cell` is deliberately not `Clone`: whoever owns it owns the value.
/// Hand out [`Signal`]s for reading.
pub struct Cell<T> {
    node: Arc<Node<T>>,
}

impl<T> Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A cell holding no value yet.
    pub fn new() -> Self {
        Cell {
            node: Arc::new(Node::source(None)),
        }
    }

    /// A cell that starts out ready.
    pub fn with(value: T) -> Self {
        Cell {
            node: Arc::new(Node::source(Some(value))),
        }
    }

    /// Store a value and notify subscribers, even if it equals the old one.
    pub fn set(&self, value: T) {
        self.node.store(Some(value));
    }

    /// Drop the value, making the cell not ready.
    pub fn reset(&self) {
        self.node.store(None);
    }

    pub fn get(&self) -> Option<T> {
        self.node.get()
    }

    pub fn is_ready(&self) -> bool {
        self.node.get().is_some()
    }

    pub fn revision(&self) -> u64 {
        self.node.revision()
    }

    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        self.node.add_subscriber(Arc::new(f))
    }

    /// A read handle onto this cell.
    pub fn signal(&self) -> Signal<T> {
        Signal {
            node: self.node.clone(),
        }
    }
}

impl<T> Default for Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug + Clone + Send + Sync + 'static> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cell").field(&self.get()).finish()
    }
}

/// Read handle onto a [`Cell`] or onto a derived value.
pub struct Signal<T> {
    node: Arc<Node<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal {
            node: self.node.clone(),
        }
    }
}

impl<T: fmt::Debug + Clone + Send + Sync + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&self.get()).finish()
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A signal that is always ready with `value`.
    pub fn constant(value: T) -> Self {
        Signal {
            node: Arc::new(Node::source(Some(value))),
        }
    }

    /// A signal that is never ready.
    pub fn pending() -> Self {
        Signal {
            node: Arc::new(Node::source(None)),
        }
    }

    pub fn get(&self) -> Option<T> {
        self.node.get()
    }

    pub fn is_ready(&self) -> bool {
        self.node.get().is_some()
    }

    /// Bumped on every mutation or upstream invalidation.
    pub fn revision(&self) -> u64 {
        self.node.revision()
    }

    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        self.node.add_subscriber(Arc::new(f))
    }

    fn watch(&self, on_change: Arc<dyn Fn() + Send + Sync>) -> Subscription {
        self.node.add_subscriber(Arc::new(move |_: Option<&T>| on_change()))
    }

    /// Derive a value; not ready whenever `self` is not ready.
    pub fn map<U, F>(&self, f: F) -> Signal<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let upstream = self.clone();
        derive(
            Box::new(move || upstream.get().map(|v| f(&v))),
            &[self.watcher()],
        )
    }

    /// Derive a value with a transform that may itself reject the input.
    pub fn filter_map<U, F>(&self, f: F) -> Signal<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> Option<U> + Send + Sync + 'static,
    {
        let upstream = self.clone();
        derive(
            Box::new(move || upstream.get().and_then(|v| f(&v))),
            &[self.watcher()],
        )
    }

    /// Always-ready signal reporting whether `self` is ready.
    pub fn ready(&self) -> Signal<bool> {
        let upstream = self.clone();
        derive(
            Box::new(move || Some(upstream.is_ready())),
            &[self.watcher()],
        )
    }

    fn watcher(&self) -> Watcher {
        let this = self.clone();
        Box::new(move |cb| this.watch(cb))
    }
}

type Watcher = Box<dyn Fn(Arc<dyn Fn() + Send + Sync>) -> Subscription>;

/// Derive from two signals; not ready unless both are.
pub fn combine<A, B, U, F>(a: &Signal<A>, b: &Signal<B>, f: F) -> Signal<U>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    F: Fn(&A, &B) -> Option<U> + Send + Sync + 'static,
{
    let (ua, ub) = (a.clone(), b.clone());
    derive(
        Box::new(move || {
            let a = ua.get()?;
            let b = ub.get()?;
            f(&a, &b)
        }),
        &[a.watcher(), b.watcher()],
    )
}

fn derive<U>(compute: Compute<U>, upstream: &[Watcher]) -> Signal<U>
where
    U: Clone + Send + Sync + 'static,
{
    let node = Arc::new(Node::derived(compute));
    let weak = Arc::downgrade(&node);
    let subscriptions: Vec<Subscription> = upstream
        .iter()
        .map(|watch| {
            let weak = weak.clone();
            watch(Arc::new(move || {
                if let Some(node) = weak.upgrade() {
                    node.invalidate();
                }
            }))
        })
        .collect();
    node.upstream.lock().extend(subscriptions);
    Signal { node }
}
