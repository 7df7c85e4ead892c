//! Listener registry with scoped (RAII) subscriptions.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Listener<E> = Rc<dyn Fn(&E)>;

struct Registry<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

impl<E> Registry<E> {
    fn remove(&mut self, id: u64) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    fn contains(&self, id: u64) -> bool {
        self.listeners.iter().any(|(listener_id, _)| *listener_id == id)
    }
}

/// Broadcasts events of type `E` to every live subscriber.
///
/// Cloning a `Notifier` yields a second handle onto the same registry, so a
/// store-side callback can announce changes on behalf of the entity that owns
/// the original handle.
pub struct Notifier<E> {
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E: 'static> Notifier<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Registers `listener` until the returned [`Subscription`] is dropped.
    #[must_use = "dropping the subscription immediately unregisters the listener"]
    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Rc::new(listener)));
            id
        };

        let weak: Weak<RefCell<Registry<E>>> = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry.borrow_mut().remove(id);
            }
        })
    }

    /// Delivers `event` to every listener registered at the time of the call.
    ///
    /// Listeners are snapshotted first; a listener may subscribe or drop
    /// subscriptions (including its own) while being called. A listener
    /// unregistered before its turn is skipped.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<(u64, Listener<E>)> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();

        for (id, listener) in snapshot {
            if self.registry.borrow().contains(id) {
                listener(event);
            }
        }
    }

    /// Delivers each event in order.
    pub fn notify_all<'a>(&self, events: impl IntoIterator<Item = &'a E>) {
        for event in events {
            self.notify(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }
}

impl<E: 'static> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Notifier<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E> fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.registry.borrow().listeners.len())
            .finish()
    }
}

/// Scoped registration handle.
///
/// Dropping the handle (or calling [`Subscription::cancel`]) removes the
/// listener. A subscription outliving its notifier is inert.
#[must_use = "dropping the subscription immediately unregisters the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription that was never attached to anything.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Unregisters the listener now.
    pub fn cancel(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
