//! Owning collection of improvements with change events.

use crate::notify::{Notifier, Subscription};

use super::{Improvement, ImprovementId, ImprovementKind, ImprovementSource};

/// Published once per store mutation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImprovementEvent {
    /// Records added, removed or toggled by the mutation, as they were at the
    /// time of the change.
    pub changed: Vec<Improvement>,
}

impl ImprovementEvent {
    /// Whether any changed record targets attribute `abbrev` (or `abbrevBase`).
    pub fn touches_attribute(&self, abbrev: &str) -> bool {
        self.changed.iter().any(|imp| {
            super::is_attribute_target(&imp.improved_name, abbrev)
                && matches!(
                    imp.kind,
                    ImprovementKind::Attribute
                        | ImprovementKind::AttributeLevel
                        | ImprovementKind::ReplaceAttribute
                        | ImprovementKind::AttributeKarmaCost
                        | ImprovementKind::AttributeKarmaCostMultiplier
                        | ImprovementKind::AttributePointCost
                        | ImprovementKind::AttributePointCostMultiplier
                )
        })
    }

    pub fn touches_kind(&self, kind: ImprovementKind) -> bool {
        self.changed.iter().any(|imp| imp.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

/// The character's improvement pool.
///
/// Readers borrow the store only for the duration of a read; every mutation
/// publishes exactly one [`ImprovementEvent`] after the collection is updated.
#[derive(Debug, Default)]
pub struct ImprovementStore {
    records: Vec<Improvement>,
    next_id: u32,
    events: Notifier<ImprovementEvent>,
}

impl ImprovementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `improvement`, assigning it a fresh id.
    pub fn add(&mut self, mut improvement: Improvement) -> ImprovementId {
        let id = self.allocate_id();
        improvement.id = id;
        self.records.push(improvement.clone());
        self.publish(vec![improvement]);
        id
    }

    /// Adds several improvements under a single event.
    pub fn extend(&mut self, improvements: impl IntoIterator<Item = Improvement>) -> Vec<ImprovementId> {
        let mut changed = Vec::new();
        for mut improvement in improvements {
            improvement.id = self.allocate_id();
            self.records.push(improvement.clone());
            changed.push(improvement);
        }
        let ids = changed.iter().map(|imp| imp.id).collect();
        self.publish(changed);
        ids
    }

    pub fn remove(&mut self, id: ImprovementId) -> Option<Improvement> {
        let index = self.records.iter().position(|imp| imp.id == id)?;
        let removed = self.records.remove(index);
        self.publish(vec![removed.clone()]);
        Some(removed)
    }

    /// Removes every record granted by `source`/`source_name` (e.g. when a
    /// piece of cyberware is uninstalled).
    pub fn remove_by_source(
        &mut self,
        source: ImprovementSource,
        source_name: &str,
    ) -> Vec<Improvement> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|imp| imp.source == source && imp.source_name == source_name);
        self.records = kept;
        self.publish(removed.clone());
        removed
    }

    /// Toggles a record. Returns `false` if `id` is unknown; setting the
    /// current state again is a no-op that publishes nothing.
    pub fn set_enabled(&mut self, id: ImprovementId, enabled: bool) -> bool {
        let Some(record) = self.records.iter_mut().find(|imp| imp.id == id) else {
            return false;
        };
        if record.enabled != enabled {
            record.enabled = enabled;
            let changed = record.clone();
            self.publish(vec![changed]);
        }
        true
    }

    pub fn get(&self, id: ImprovementId) -> Option<&Improvement> {
        self.records.iter().find(|imp| imp.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Improvement> {
        self.records.iter()
    }

    /// Records of `kind`, enabled or not.
    pub fn of_kind(&self, kind: ImprovementKind) -> impl Iterator<Item = &Improvement> {
        self.records.iter().filter(move |imp| imp.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registers `listener` for every future mutation.
    #[must_use = "dropping the subscription immediately unregisters the listener"]
    pub fn subscribe(&self, listener: impl Fn(&ImprovementEvent) + 'static) -> Subscription {
        self.events.subscribe(listener)
    }

    fn allocate_id(&mut self) -> ImprovementId {
        self.next_id += 1;
        ImprovementId(self.next_id)
    }

    fn publish(&self, changed: Vec<Improvement>) {
        if changed.is_empty() {
            return;
        }
        tracing::trace!(count = changed.len(), "improvement store changed");
        self.events.notify(&ImprovementEvent { changed });
    }
}

impl<'a> IntoIterator for &'a ImprovementStore {
    type Item = &'a Improvement;
    type IntoIter = std::slice::Iter<'a, Improvement>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(store: &ImprovementStore) -> (Rc<RefCell<Vec<ImprovementEvent>>>, Subscription) {
        let events: Rc<RefCell<Vec<ImprovementEvent>>> = Rc::default();
        let sink = Rc::clone(&events);
        let sub = store.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        (events, sub)
    }

    #[test]
    fn add_assigns_ids_and_publishes() {
        let mut store = ImprovementStore::new();
        let (events, _sub) = recording(&store);

        let a = store.add(Improvement::attribute("STR", 1));
        let b = store.add(Improvement::attribute("AGI", 2));

        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(b).map(|imp| imp.augmented), Some(2));
        assert_eq!(events.borrow().len(), 2);
        assert!(events.borrow()[0].touches_attribute("STR"));
    }

    #[test]
    fn remove_by_source_publishes_one_event() {
        let mut store = ImprovementStore::new();
        store.add(Improvement::attribute("STR", 1).with_source(ImprovementSource::Cyberware, "Arm"));
        store.add(Improvement::attribute("AGI", 1).with_source(ImprovementSource::Cyberware, "Arm"));
        store.add(Improvement::attribute("BOD", 1).with_source(ImprovementSource::Quality, "Tough"));
        let (events, _sub) = recording(&store);

        let removed = store.remove_by_source(ImprovementSource::Cyberware, "Arm");

        assert_eq!(removed.len(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(events.borrow()[0].changed.len(), 2);
    }

    #[test]
    fn set_enabled_only_publishes_real_changes() {
        let mut store = ImprovementStore::new();
        let id = store.add(Improvement::attribute("STR", 1));
        let (events, _sub) = recording(&store);

        assert!(store.set_enabled(id, true));
        assert!(events.borrow().is_empty());

        assert!(store.set_enabled(id, false));
        assert_eq!(events.borrow().len(), 1);
        assert!(!events.borrow()[0].changed[0].enabled);

        assert!(!store.set_enabled(ImprovementId(99), false));
    }

    #[test]
    fn dropped_subscription_stops_events() {
        let mut store = ImprovementStore::new();
        let (events, sub) = recording(&store);
        drop(sub);
        store.add(Improvement::attribute("STR", 1));
        assert!(events.borrow().is_empty());
    }
}
