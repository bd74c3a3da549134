//! Item counts carried by a being or held in a facility's storage

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::content::ItemStack;

/// Item id -> count, ordered so that listings are deterministic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<String, u32>,
    /// Maximum total item count, `None` = unbounded
    capacity: Option<u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            items: BTreeMap::new(),
            capacity: Some(capacity),
        }
    }

    pub fn count(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.items.values().sum()
    }

    pub fn free_space(&self) -> u32 {
        match self.capacity {
            Some(cap) => cap.saturating_sub(self.total()),
            None => u32::MAX,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add up to `amount`, returns how many were actually stored
    pub fn add(&mut self, item: &str, amount: u32) -> u32 {
        let added = amount.min(self.free_space());
        if added > 0 {
            *self.items.entry(item.to_string()).or_insert(0) += added;
        }
        added
    }

    /// Remove up to `amount`, returns how many were actually removed
    pub fn remove(&mut self, item: &str, amount: u32) -> u32 {
        let Some(count) = self.items.get_mut(item) else {
            return 0;
        };
        let removed = amount.min(*count);
        *count -= removed;
        if *count == 0 {
            self.items.remove(item);
        }
        removed
    }

    /// Check if every stack is fully available
    pub fn has_all(&self, stacks: &[ItemStack]) -> bool {
        stacks.iter().all(|s| self.count(&s.item) >= s.quantity)
    }

    /// Remove all stacks atomically, returns false (and removes nothing) if
    /// any stack is short
    pub fn remove_all(&mut self, stacks: &[ItemStack]) -> bool {
        if !self.has_all(stacks) {
            return false;
        }
        for stack in stacks {
            self.remove(&stack.item, stack.quantity);
        }
        true
    }

    /// First item (in id order) matching a predicate
    pub fn find(&self, mut predicate: impl FnMut(&str) -> bool) -> Option<(&str, u32)> {
        self.items
            .iter()
            .find(|(id, _)| predicate(id))
            .map(|(id, count)| (id.as_str(), *count))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(id, count)| (id.as_str(), *count))
    }

    /// Snapshot as item stacks
    pub fn stacks(&self) -> Vec<ItemStack> {
        self.iter().map(|(id, count)| ItemStack::new(id, count)).collect()
    }
}
