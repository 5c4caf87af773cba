//! Per-element interaction state and highlight styling.
//!
//! Every interactive element (a box, a bar, a heatmap row, a legend entry)
//! is in one of four states: hover `Idle | Hovered` × selection
//! `Unselected | Selected`.  Its look is a pure function of that state and
//! of the dashboard-wide [`Highlight`], so the order in which pointer events
//! arrive never changes what ends up on screen.

use std::cell::RefCell;
use std::rc::Rc;

use eframe::egui::{Color32, Stroke};

use crate::data::model::Facet;
use crate::store::{ActiveItem, ChangeKind, FilterSelection, FilterStore, SubscriptionId};

// ---------------------------------------------------------------------------
// Element identity and state
// ---------------------------------------------------------------------------

/// Identifies an element by the category it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementKey {
    pub facet: Facet,
    pub value: String,
}

impl ElementKey {
    pub fn new(facet: Facet, value: impl Into<String>) -> Self {
        ElementKey {
            facet,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Hovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectState {
    #[default]
    Unselected,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementState {
    pub hover: HoverState,
    pub select: SelectState,
}

impl ElementState {
    /// State of an element that encodes two categories at once: hovered or
    /// selected if either of them is.
    pub fn merge(self, other: ElementState) -> ElementState {
        let hovered = self.hover == HoverState::Hovered || other.hover == HoverState::Hovered;
        let selected =
            self.select == SelectState::Selected || other.select == SelectState::Selected;
        ElementState {
            hover: if hovered {
                HoverState::Hovered
            } else {
                HoverState::Idle
            },
            select: if selected {
                SelectState::Selected
            } else {
                SelectState::Unselected
            },
        }
    }
}

/// How the dashboard-wide highlight treats one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Emphasis {
    /// A filter on this facet is active and the element is not in it.
    Faded,
    /// Another element of this facet is the active item.
    Dimmed,
    Neutral,
    /// In the active filter, or the active item itself.
    Emphasized,
}

impl Emphasis {
    /// Combine the emphasis of two facets an element belongs to.  Fading on
    /// either facet wins; otherwise emphasis on either facet wins.
    pub fn combine(self, other: Emphasis) -> Emphasis {
        if self == Emphasis::Faded || other == Emphasis::Faded {
            Emphasis::Faded
        } else {
            self.max(other)
        }
    }

    fn base_opacity(self) -> f32 {
        match self {
            Emphasis::Faded => 0.2,
            Emphasis::Dimmed => 0.45,
            Emphasis::Neutral => 0.8,
            Emphasis::Emphasized => 1.0,
        }
    }

    /// Highest opacity an element at this level may reach when hovered.
    /// Faded elements stay below anything that is not faded.
    fn ceiling(self) -> f32 {
        match self {
            Emphasis::Faded => 0.4,
            _ => 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Styling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementStyle {
    pub opacity: f32,
    pub stroke_width: f32,
}

impl ElementStyle {
    pub fn fill(&self, base: Color32) -> Color32 {
        base.gamma_multiply(self.opacity)
    }

    pub fn stroke(&self, base: Color32) -> Stroke {
        Stroke::new(self.stroke_width, base.gamma_multiply(self.opacity))
    }
}

const HOVER_OPACITY_BOOST: f32 = 0.2;

/// Style of an element from its own state and the shared highlight.
///
/// Stroke width orders the states idle < hovered < selected < selected and
/// hovered.  Opacity follows the emphasis level, with hover lifting it up to
/// the level's ceiling.
pub fn element_style(state: ElementState, emphasis: Emphasis) -> ElementStyle {
    let hovered = state.hover == HoverState::Hovered;
    let selected = state.select == SelectState::Selected;

    let stroke_width = match (selected, hovered) {
        (false, false) => 1.0,
        (false, true) => 2.0,
        (true, false) => 2.5,
        (true, true) => 3.0,
    };

    let mut opacity = emphasis.base_opacity();
    if hovered {
        opacity = (opacity + HOVER_OPACITY_BOOST).min(emphasis.ceiling());
    }
    if selected {
        opacity = opacity.max(Emphasis::Emphasized.base_opacity().min(emphasis.ceiling()));
    }

    ElementStyle {
        opacity,
        stroke_width,
    }
}

// ---------------------------------------------------------------------------
// Highlight – a chart's view of the shared store
// ---------------------------------------------------------------------------

/// The part of the store a chart needs for styling, kept current by a store
/// subscription.
#[derive(Debug, Clone, Default)]
pub struct Highlight {
    pub selection: FilterSelection,
    pub active_item: ActiveItem,
    pub revision: u64,
}

impl Highlight {
    pub fn emphasis(&self, facet: Facet, value: &str) -> Emphasis {
        if self.selection.is_active(facet) {
            return if self.selection.contains(facet, value) {
                Emphasis::Emphasized
            } else {
                Emphasis::Faded
            };
        }
        match self.active_item.kind() {
            Some(kind) if kind == facet => {
                if self.active_item.is(facet, value) {
                    Emphasis::Emphasized
                } else {
                    Emphasis::Dimmed
                }
            }
            _ => Emphasis::Neutral,
        }
    }

    pub fn is_selected(&self, facet: Facet, value: &str) -> bool {
        self.selection.contains(facet, value)
    }
}

/// A chart's subscription to the store.
#[derive(Debug)]
pub struct HighlightHandle {
    state: Rc<RefCell<Highlight>>,
    subscription: SubscriptionId,
}

impl HighlightHandle {
    /// Subscribe to `store` and start from its current contents.
    pub fn subscribe(store: &mut FilterStore) -> Self {
        let state = Rc::new(RefCell::new(Highlight {
            selection: store.read().clone(),
            active_item: store.read_active_item().clone(),
            revision: store.revision(),
        }));
        let sink = Rc::downgrade(&state);
        // Once the handle is dropped the callback ends its own subscription.
        let subscription = store.subscribe_while(move |change| {
            let Some(state) = sink.upgrade() else {
                return false;
            };
            let mut h = state.borrow_mut();
            match change.kind {
                ChangeKind::Selection => h.selection = change.selection.clone(),
                ChangeKind::ActiveItem => h.active_item = change.active_item.clone(),
            }
            h.revision = change.revision;
            true
        });
        log::debug!(
            "highlight subscribed ({} subscribers)",
            store.subscriber_count()
        );
        HighlightHandle {
            state,
            subscription,
        }
    }

    /// Copy of the current highlight.  Charts style from a copy so that no
    /// borrow is held while they write to the store.
    pub fn snapshot(&self) -> Highlight {
        self.state.borrow().clone()
    }

    pub fn unsubscribe(self, store: &mut FilterStore) {
        store.unsubscribe(self.subscription);
    }
}

// ---------------------------------------------------------------------------
// Interaction – pointer events of one chart, as store writes
// ---------------------------------------------------------------------------

/// Turns the element under the pointer each frame into enter / leave / click
/// writes on the store.
#[derive(Debug, Default)]
pub struct Interaction {
    hovered: Option<ElementKey>,
}

impl Interaction {
    /// Report which element (if any) is under the pointer this frame.
    /// Only transitions reach the store.
    pub fn track_hover(&mut self, store: &mut FilterStore, under_pointer: Option<ElementKey>) {
        if self.hovered == under_pointer {
            return;
        }
        if let Some(prev) = self.hovered.take() {
            Self::pointer_leave(store, &prev);
        }
        if let Some(next) = under_pointer {
            store.set_active_item(ActiveItem::item(next.facet, next.value.clone()));
            self.hovered = Some(next);
        }
    }

    /// Clears the active item unless the element is selected, or another
    /// element has already taken over the active item.
    fn pointer_leave(store: &mut FilterStore, key: &ElementKey) {
        let still_ours = store.read_active_item().is(key.facet, &key.value);
        let selected = store.read().contains(key.facet, &key.value);
        if still_ours && !selected {
            store.set_active_item(ActiveItem::None);
        }
    }

    /// Toggle the element's filter membership and make it the active item.
    pub fn click(&mut self, store: &mut FilterStore, key: ElementKey) {
        if key.facet.is_filterable() {
            store.toggle(key.facet, &key.value);
        }
        store.set_active_item(ActiveItem::item(key.facet, key.value.clone()));
        self.hovered = Some(key);
    }

    pub fn state_of(&self, highlight: &Highlight, facet: Facet, value: &str) -> ElementState {
        let hovered = self
            .hovered
            .as_ref()
            .is_some_and(|k| k.facet == facet && k.value == value);
        ElementState {
            hover: if hovered {
                HoverState::Hovered
            } else {
                HoverState::Idle
            },
            select: if highlight.is_selected(facet, value) {
                SelectState::Selected
            } else {
                SelectState::Unselected
            },
        }
    }

    /// Style of an element encoding one category.
    pub fn style(&self, highlight: &Highlight, facet: Facet, value: &str) -> ElementStyle {
        let state = self.state_of(highlight, facet, value);
        element_style(state, highlight.emphasis(facet, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_states() -> [ElementState; 4] {
        let mut out = [ElementState::default(); 4];
        let mut i = 0;
        for hover in [HoverState::Idle, HoverState::Hovered] {
            for select in [SelectState::Unselected, SelectState::Selected] {
                out[i] = ElementState { hover, select };
                i += 1;
            }
        }
        out
    }

    #[test]
    fn selected_and_hovered_is_at_least_selected() {
        let levels = [
            Emphasis::Faded,
            Emphasis::Dimmed,
            Emphasis::Neutral,
            Emphasis::Emphasized,
        ];
        for emphasis in levels {
            let selected = ElementState {
                hover: HoverState::Idle,
                select: SelectState::Selected,
            };
            let hovered = ElementState {
                hover: HoverState::Hovered,
                select: SelectState::Selected,
            };
            let sel = element_style(selected, emphasis);
            let both = element_style(hovered, emphasis);
            let idle = element_style(ElementState::default(), emphasis);
            assert!(both.opacity >= sel.opacity && both.stroke_width > sel.stroke_width);
            assert!(sel.opacity >= idle.opacity && sel.stroke_width > idle.stroke_width);
        }
    }

    #[test]
    fn faded_never_outshines_emphasized() {
        for faded_state in all_states() {
            for member_state in all_states() {
                let faded = element_style(faded_state, Emphasis::Faded);
                let member = element_style(member_state, Emphasis::Emphasized);
                assert!(member.opacity >= faded.opacity);
            }
        }
    }

    #[test]
    fn filter_membership_drives_emphasis() {
        let mut h = Highlight::default();
        assert_eq!(h.emphasis(Facet::Industry, "Retail"), Emphasis::Neutral);
        h.selection.toggle(Facet::Industry, "Retail");
        assert_eq!(h.emphasis(Facet::Industry, "Retail"), Emphasis::Emphasized);
        assert_eq!(h.emphasis(Facet::Industry, "Energy"), Emphasis::Faded);
        // Other facets are unaffected.
        assert_eq!(h.emphasis(Facet::Location, "Berlin"), Emphasis::Neutral);
    }

    #[test]
    fn active_item_dims_its_siblings() {
        let h = Highlight {
            active_item: ActiveItem::item(Facet::Location, "Berlin"),
            ..Default::default()
        };
        assert_eq!(h.emphasis(Facet::Location, "Berlin"), Emphasis::Emphasized);
        assert_eq!(h.emphasis(Facet::Location, "Austin"), Emphasis::Dimmed);
        assert_eq!(h.emphasis(Facet::Industry, "Retail"), Emphasis::Neutral);
    }

    #[test]
    fn combine_prefers_fading() {
        assert_eq!(Emphasis::Emphasized.combine(Emphasis::Faded), Emphasis::Faded);
        assert_eq!(Emphasis::Neutral.combine(Emphasis::Emphasized), Emphasis::Emphasized);
        assert_eq!(Emphasis::Dimmed.combine(Emphasis::Neutral), Emphasis::Neutral);
    }

    #[test]
    fn hover_transitions_write_once() {
        let mut store = FilterStore::default();
        let mut ix = Interaction::default();
        let key = ElementKey::new(Facet::Industry, "Retail");

        for _ in 0..5 {
            ix.track_hover(&mut store, Some(key.clone()));
        }
        assert_eq!(store.revision(), 1);
        assert!(store.read_active_item().is(Facet::Industry, "Retail"));

        ix.track_hover(&mut store, None);
        assert!(store.read_active_item().is_none());
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn leaving_a_selected_element_keeps_the_active_item() {
        let mut store = FilterStore::default();
        let mut ix = Interaction::default();
        let key = ElementKey::new(Facet::Location, "Berlin");

        ix.track_hover(&mut store, Some(key.clone()));
        ix.click(&mut store, key.clone());
        ix.track_hover(&mut store, None);

        assert!(store.read().contains(Facet::Location, "Berlin"));
        assert!(store.read_active_item().is(Facet::Location, "Berlin"));
    }

    #[test]
    fn leave_does_not_clobber_another_charts_hover() {
        let mut store = FilterStore::default();
        let mut a = Interaction::default();
        let mut b = Interaction::default();

        a.track_hover(&mut store, Some(ElementKey::new(Facet::Industry, "Retail")));
        b.track_hover(&mut store, Some(ElementKey::new(Facet::Location, "Berlin")));
        a.track_hover(&mut store, None);

        assert!(store.read_active_item().is(Facet::Location, "Berlin"));
    }

    #[test]
    fn clicking_twice_restores_the_filter() {
        let mut store = FilterStore::default();
        let mut ix = Interaction::default();
        let key = ElementKey::new(Facet::ExperienceLevel, "Mid-level");
        let before = store.read().clone();
        ix.click(&mut store, key.clone());
        ix.click(&mut store, key);
        assert_eq!(store.read(), &before);
    }

    #[test]
    fn job_title_click_only_sets_active_item() {
        let mut store = FilterStore::default();
        let mut ix = Interaction::default();
        ix.click(&mut store, ElementKey::new(Facet::JobTitle, "Analyst"));
        assert!(store.read().is_empty());
        assert!(store.read_active_item().is(Facet::JobTitle, "Analyst"));
    }

    #[test]
    fn handle_follows_store_changes() {
        let mut store = FilterStore::default();
        store.toggle(Facet::Industry, "Retail");
        let handle = HighlightHandle::subscribe(&mut store);
        assert!(handle.snapshot().is_selected(Facet::Industry, "Retail"));

        store.set_active_item(ActiveItem::item(Facet::Location, "Austin"));
        assert!(handle.snapshot().active_item.is(Facet::Location, "Austin"));
        assert_eq!(handle.snapshot().revision, store.revision());

        handle.unsubscribe(&mut store);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn dropped_handles_leave_the_store() {
        let mut store = FilterStore::default();
        let kept = HighlightHandle::subscribe(&mut store);
        drop(HighlightHandle::subscribe(&mut store));
        assert_eq!(store.subscriber_count(), 2);

        store.toggle(Facet::Industry, "Retail");
        assert_eq!(store.revision(), 1);
        assert_eq!(store.subscriber_count(), 1);
        assert!(kept.snapshot().is_selected(Facet::Industry, "Retail"));
    }
}
