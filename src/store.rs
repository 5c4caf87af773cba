//! Shared filter store.
//!
//! One `FilterStore` lives for the whole session, owned by the application
//! state.  Charts borrow it each frame to read or write, and keep a
//! subscription so their highlight state is re-derived on every change,
//! whichever chart made it.
//!
//! ```text
//!   chart A ──set_active_item──▶ ┌─────────────┐ ──StoreChange──▶ chart A
//!   chart B ──toggle───────────▶ │ FilterStore │ ──StoreChange──▶ chart B
//!   side panel ──replace───────▶ └─────────────┘ ──StoreChange──▶ ...
//! ```

use std::collections::BTreeSet;
use std::fmt;

use crate::data::model::Facet;

// ---------------------------------------------------------------------------
// FilterSelection – per-facet sets of chosen labels
// ---------------------------------------------------------------------------

/// The categories the user has chosen, per facet.  An empty set places no
/// constraint on its facet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub experience_levels: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub industries: BTreeSet<String>,
    pub employment_types: BTreeSet<String>,
}

impl FilterSelection {
    /// The set backing `facet`, or `None` for facets without one.
    pub fn field(&self, facet: Facet) -> Option<&BTreeSet<String>> {
        match facet {
            Facet::ExperienceLevel => Some(&self.experience_levels),
            Facet::Location => Some(&self.locations),
            Facet::Industry => Some(&self.industries),
            Facet::EmploymentType => Some(&self.employment_types),
            Facet::JobTitle => None,
        }
    }

    pub fn field_mut(&mut self, facet: Facet) -> Option<&mut BTreeSet<String>> {
        match facet {
            Facet::ExperienceLevel => Some(&mut self.experience_levels),
            Facet::Location => Some(&mut self.locations),
            Facet::Industry => Some(&mut self.industries),
            Facet::EmploymentType => Some(&mut self.employment_types),
            Facet::JobTitle => None,
        }
    }

    /// Add `value` if absent, remove it if present.  Returns whether the
    /// value is a member afterwards; facets without a set never change.
    pub fn toggle(&mut self, facet: Facet, value: &str) -> bool {
        let Some(set) = self.field_mut(facet) else {
            return false;
        };
        if set.remove(value) {
            false
        } else {
            set.insert(value.to_string());
            true
        }
    }

    pub fn contains(&self, facet: Facet, value: &str) -> bool {
        self.field(facet).is_some_and(|set| set.contains(value))
    }

    /// Whether `facet` currently constrains anything.
    pub fn is_active(&self, facet: Facet) -> bool {
        self.field(facet).is_some_and(|set| !set.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        Facet::FILTERABLE.iter().all(|&f| !self.is_active(f))
    }

    /// Total number of selected labels across facets.
    pub fn len(&self) -> usize {
        Facet::FILTERABLE
            .iter()
            .filter_map(|&f| self.field(f))
            .map(BTreeSet::len)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// ActiveItem – the single cross-chart hover/focus pointer
// ---------------------------------------------------------------------------

/// The category currently hovered or focused anywhere on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActiveItem {
    #[default]
    None,
    Item { kind: Facet, value: String },
}

impl ActiveItem {
    pub fn item(kind: Facet, value: impl Into<String>) -> Self {
        ActiveItem::Item {
            kind,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> Option<Facet> {
        match self {
            ActiveItem::None => None,
            ActiveItem::Item { kind, .. } => Some(*kind),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            ActiveItem::None => None,
            ActiveItem::Item { value, .. } => Some(value),
        }
    }

    pub fn is(&self, kind: Facet, value: &str) -> bool {
        matches!(self, ActiveItem::Item { kind: k, value: v } if *k == kind && v == value)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ActiveItem::None)
    }
}

impl fmt::Display for ActiveItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveItem::None => write!(f, "none"),
            ActiveItem::Item { kind, value } => write!(f, "{kind}: {value}"),
        }
    }
}

// ---------------------------------------------------------------------------
// FilterStore – owned state plus an explicit subscriber list
// ---------------------------------------------------------------------------

/// What part of the store a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Selection,
    ActiveItem,
}

/// Snapshot handed to subscribers after every mutation.
#[derive(Debug, Clone, Copy)]
pub struct StoreChange<'a> {
    pub kind: ChangeKind,
    pub selection: &'a FilterSelection,
    pub active_item: &'a ActiveItem,
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Returns whether the subscriber wants further notifications.
type Callback = Box<dyn FnMut(&StoreChange<'_>) -> bool>;

/// Session-scoped selection state shared by every chart.
///
/// Mutations notify all subscribers synchronously, one notification per
/// call, in subscription order.  Nothing is batched or debounced.
#[derive(Default)]
pub struct FilterStore {
    selection: FilterSelection,
    active_item: ActiveItem,
    subscribers: Vec<(SubscriptionId, Callback)>,
    next_id: u64,
    revision: u64,
}

impl fmt::Debug for FilterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterStore")
            .field("selection", &self.selection)
            .field("active_item", &self.active_item)
            .field("subscribers", &self.subscribers.len())
            .field("revision", &self.revision)
            .finish()
    }
}

impl FilterStore {
    pub fn read(&self) -> &FilterSelection {
        &self.selection
    }

    /// Replace the whole selection.  Fields absent from `next` do not
    /// survive from the previous snapshot.
    pub fn replace(&mut self, next: FilterSelection) {
        log::debug!("filter store: replace selection ({} labels)", next.len());
        self.selection = next;
        self.notify(ChangeKind::Selection);
    }

    /// Mutate the current selection in place, preserving untouched facets.
    pub fn update<R>(&mut self, patch: impl FnOnce(&mut FilterSelection) -> R) -> R {
        let out = patch(&mut self.selection);
        self.notify(ChangeKind::Selection);
        out
    }

    /// Toggle one label's membership.  Returns whether it is now selected.
    pub fn toggle(&mut self, facet: Facet, value: &str) -> bool {
        let selected = self.update(|sel| sel.toggle(facet, value));
        log::debug!("filter store: toggle {facet} '{value}' -> {selected}");
        selected
    }

    pub fn read_active_item(&self) -> &ActiveItem {
        &self.active_item
    }

    pub fn set_active_item(&mut self, next: ActiveItem) {
        log::trace!("filter store: active item {next}");
        self.active_item = next;
        self.notify(ChangeKind::ActiveItem);
    }

    /// Drop every filter and the active item.
    pub fn clear(&mut self) {
        self.replace(FilterSelection::default());
        if !self.active_item.is_none() {
            self.set_active_item(ActiveItem::None);
        }
    }

    /// Number of mutations so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Register a callback run after every mutation.
    pub fn subscribe(
        &mut self,
        mut callback: impl FnMut(&StoreChange<'_>) + 'static,
    ) -> SubscriptionId {
        self.subscribe_while(move |change| {
            callback(change);
            true
        })
    }

    /// Register a callback that stays subscribed for as long as it returns
    /// `true`.
    pub fn subscribe_while(
        &mut self,
        callback: impl FnMut(&StoreChange<'_>) -> bool + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&mut self, kind: ChangeKind) {
        self.revision += 1;
        let change = StoreChange {
            kind,
            selection: &self.selection,
            active_item: &self.active_item,
            revision: self.revision,
        };
        let before = self.subscribers.len();
        self.subscribers.retain_mut(|(_, callback)| callback(&change));
        let dropped = before - self.subscribers.len();
        if dropped > 0 {
            log::debug!("filter store: dropped {dropped} finished subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn selection_with(facet: Facet, values: &[&str]) -> FilterSelection {
        let mut sel = FilterSelection::default();
        for v in values {
            sel.toggle(facet, v);
        }
        sel
    }

    #[test]
    fn toggle_twice_restores_membership() {
        let mut store = FilterStore::default();
        store.toggle(Facet::Industry, "Retail");
        let before = store.read().clone();

        assert!(store.toggle(Facet::Location, "Berlin"));
        assert!(!store.toggle(Facet::Location, "Berlin"));
        assert_eq!(store.read(), &before);
    }

    #[test]
    fn replace_is_a_full_snapshot() {
        let mut store = FilterStore::default();
        store.replace(selection_with(Facet::Industry, &["Finance", "Retail"]));
        store.toggle(Facet::Location, "Austin");

        let next = selection_with(Facet::ExperienceLevel, &["Senior-level"]);
        store.replace(next.clone());

        assert_eq!(store.read(), &next);
        assert!(store.read().industries.is_empty());
        assert!(store.read().locations.is_empty());
    }

    #[test]
    fn update_preserves_other_facets() {
        let mut store = FilterStore::default();
        store.replace(selection_with(Facet::Industry, &["Finance"]));
        store.update(|sel| sel.locations.insert("Lisbon".into()));
        assert!(store.read().contains(Facet::Industry, "Finance"));
        assert!(store.read().contains(Facet::Location, "Lisbon"));
    }

    #[test]
    fn job_titles_have_no_filter_set() {
        let mut sel = FilterSelection::default();
        assert!(!sel.toggle(Facet::JobTitle, "Analyst"));
        assert!(sel.is_empty());
        assert!(!sel.is_active(Facet::JobTitle));
    }

    #[test]
    fn every_mutation_notifies_every_subscriber() {
        let mut store = FilterStore::default();
        let seen_a = Rc::new(RefCell::new(Vec::new()));
        let seen_b = Rc::new(RefCell::new(0usize));

        let a = seen_a.clone();
        store.subscribe(move |change| {
            a.borrow_mut().push((change.kind, change.active_item.clone()));
        });
        let b = seen_b.clone();
        store.subscribe(move |_| *b.borrow_mut() += 1);

        store.set_active_item(ActiveItem::item(Facet::Industry, "Retail"));
        store.set_active_item(ActiveItem::item(Facet::Industry, "Retail"));
        store.set_active_item(ActiveItem::None);
        store.toggle(Facet::Industry, "Retail");

        assert_eq!(*seen_b.borrow(), 4);
        let seen = seen_a.borrow();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].0, ChangeKind::ActiveItem);
        assert!(seen[1].1.is(Facet::Industry, "Retail"));
        assert!(seen[2].1.is_none());
        assert_eq!(seen[3].0, ChangeKind::Selection);
        assert_eq!(store.revision(), 4);
    }

    #[test]
    fn subscribers_see_the_new_snapshot() {
        let mut store = FilterStore::default();
        let latest = Rc::new(RefCell::new(FilterSelection::default()));
        let sink = latest.clone();
        store.subscribe(move |change| *sink.borrow_mut() = change.selection.clone());

        store.toggle(Facet::ExperienceLevel, "Entry-level");
        assert_eq!(&*latest.borrow(), store.read());
    }

    #[test]
    fn unsubscribed_callbacks_stop_firing() {
        let mut store = FilterStore::default();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let id = store.subscribe(move |_| *c.borrow_mut() += 1);

        store.toggle(Facet::Location, "Austin");
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.toggle(Facet::Location, "Austin");

        assert_eq!(*count.borrow(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn finished_subscribers_are_removed() {
        let mut store = FilterStore::default();
        let calls = Rc::new(RefCell::new(0));
        let c = calls.clone();
        store.subscribe_while(move |_| {
            *c.borrow_mut() += 1;
            *c.borrow() < 2
        });

        store.toggle(Facet::Location, "Austin");
        assert_eq!(store.subscriber_count(), 1);
        store.toggle(Facet::Location, "Austin");
        assert_eq!(store.subscriber_count(), 0);
        store.toggle(Facet::Location, "Austin");
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn clear_resets_selection_and_active_item() {
        let mut store = FilterStore::default();
        store.toggle(Facet::Industry, "Retail");
        store.set_active_item(ActiveItem::item(Facet::Industry, "Retail"));
        store.clear();
        assert!(store.read().is_empty());
        assert!(store.read_active_item().is_none());
    }

    #[test]
    fn active_item_accessors() {
        let item = ActiveItem::item(Facet::Location, "Berlin");
        assert_eq!(item.kind(), Some(Facet::Location));
        assert_eq!(item.value(), Some("Berlin"));
        assert!(!item.is(Facet::Industry, "Berlin"));
        assert_eq!(item.to_string(), "Location: Berlin");
        assert_eq!(ActiveItem::None.value(), None);
    }
}
