//! Orders chosen for a bulk action.

use std::collections::BTreeSet;

use orderdesk_core::OrderId;
use serde::Serialize;

/// Ordered set of selected order ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionSet {
    ids: BTreeSet<OrderId>,
}

impl SelectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, id: OrderId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn insert(&mut self, id: OrderId) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: &OrderId) -> bool {
        self.ids.remove(id)
    }

    /// Checkbox semantics for a visible page: select every id, or deselect
    /// them all if every one was already selected. Returns whether the ids
    /// ended up selected.
    pub fn toggle_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a OrderId> + Clone) -> bool {
        let all_selected = ids.clone().into_iter().all(|id| self.ids.contains(id));
        if all_selected {
            for id in ids {
                self.ids.remove(id);
            }
            false
        } else {
            self.ids.extend(ids.into_iter().cloned());
            true
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    #[must_use]
    pub fn contains(&self, id: &OrderId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderId> {
        self.ids.iter()
    }

    /// Selected ids in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<OrderId> {
        self.ids.iter().cloned().collect()
    }
}

impl FromIterator<OrderId> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = OrderId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
