//! Indexed binary min-heap used as the A* open set.
//!
//! Unlike [`std::collections::BinaryHeap`] this keeps track of where every item
//! sits, so membership is O(1) and an item's key can be lowered in place.

const ABSENT: usize = usize::MAX;

/// Binary min-heap over item indices in `0..capacity`, ordered by a key `K`.
///
/// The item with the smallest key is always at the root. The capacity is fixed
/// when the heap is created and never grows; for pathfinding it is the number of
/// cells in the grid, so every cell can be in the open set at once.
#[derive(Clone, Debug)]
pub struct PriorityHeap<K> {
    entries: Vec<(usize, K)>,
    // Slot of each item inside `entries`, or ABSENT.
    slots: Vec<usize>,
}

impl<K: Ord + Copy> PriorityHeap<K> {
    /// Create an empty heap able to hold items `0..capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        PriorityHeap {
            entries: Vec::with_capacity(capacity),
            slots: vec![ABSENT; capacity],
        }
    }

    /// Maximum number of distinct items the heap can index.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// O(1) membership test.
    #[inline]
    pub fn contains(&self, item: usize) -> bool {
        self.slots.get(item).is_some_and(|&slot| slot != ABSENT)
    }

    /// Key an item is currently queued with.
    pub fn key_of(&self, item: usize) -> Option<K> {
        match self.slots.get(item) {
            Some(&slot) if slot != ABSENT => Some(self.entries[slot].1),
            _ => None,
        }
    }

    /// Push `item` with `key`.
    ///
    /// `item` must be below the capacity and not already queued; use
    /// [`PriorityHeap::update()`] for items that are already present.
    pub fn add(&mut self, item: usize, key: K) {
        debug_assert!(item < self.capacity(), "item {item} exceeds heap capacity");
        debug_assert!(!self.contains(item), "item {item} is already queued");

        let slot = self.entries.len();
        self.entries.push((item, key));
        self.slots[item] = slot;
        self.sift_up(slot);
    }

    /// Pop the item with the smallest key.
    pub fn remove_first(&mut self) -> Option<(usize, K)> {
        if self.entries.is_empty() {
            return None;
        }

        let first = self.entries.swap_remove(0);
        self.slots[first.0] = ABSENT;

        if !self.entries.is_empty() {
            self.slots[self.entries[0].0] = 0;
            self.sift_down(0);
        }

        Some(first)
    }

    /// Lower the key of a queued item and restore heap order.
    ///
    /// Keys only ever decrease during a search, so the item only moves towards the root.
    /// Returns false if the item was not queued.
    pub fn update(&mut self, item: usize, key: K) -> bool {
        let Some(&slot) = self.slots.get(item).filter(|&&slot| slot != ABSENT) else {
            return false;
        };

        debug_assert!(key <= self.entries[slot].1, "update must not raise a key");
        self.entries[slot].1 = key;
        self.sift_up(slot);
        true
    }

    /// Empty the heap. Only the slots of queued items are touched.
    pub fn clear(&mut self) {
        for (item, _) in self.entries.drain(..) {
            self.slots[item] = ABSENT;
        }
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.entries[slot].1 >= self.entries[parent].1 {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.entries.len();
        loop {
            let left = slot * 2 + 1;
            let right = left + 1;

            if left >= len {
                break;
            }

            let smallest = if right < len && self.entries[right].1 < self.entries[left].1 {
                right
            } else {
                left
            };

            if self.entries[smallest].1 >= self.entries[slot].1 {
                break;
            }

            self.swap(slot, smallest);
            slot = smallest;
        }
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.slots[self.entries[a].0] = a;
        self.slots[self.entries[b].0] = b;
    }

    #[cfg(test)]
    fn is_valid(&self) -> bool {
        let ordered = (1..self.entries.len()).all(|i| self.entries[(i - 1) / 2].1 <= self.entries[i].1);
        let indexed = self
            .entries
            .iter()
            .enumerate()
            .all(|(slot, (item, _))| self.slots[*item] == slot);
        let absent = self.slots.iter().filter(|&&slot| slot != ABSENT).count() == self.entries.len();
        ordered && indexed && absent
    }
}
