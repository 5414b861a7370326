//! Round-robin cursor over a changing set of items.

use serde::{Deserialize, Serialize};

/// Cyclic rotation. `next` hands out items in insertion order and wraps;
/// removals keep the cursor on the item that would have come next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation<T> {
    items: Vec<T>,
    cursor: usize,
}

impl<T> Default for Rotation<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
        }
    }
}

impl<T: PartialEq + Clone> Rotation<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a rotation from saved parts. The cursor wraps into range.
    pub fn from_parts(items: Vec<T>, cursor: usize) -> Self {
        let cursor = if items.is_empty() { 0 } else { cursor % items.len() };
        Self { items, cursor }
    }

    /// Append `item` at the end of the cycle. Duplicates are ignored.
    pub fn add(&mut self, item: T) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, item: &T) -> bool {
        let Some(idx) = self.items.iter().position(|i| i == item) else {
            return false;
        };
        self.items.remove(idx);
        if idx < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.items.len() {
            self.cursor = 0;
        }
        true
    }

    /// Next item in the cycle, or `None` when empty.
    pub fn next(&mut self) -> Option<T> {
        let item = self.items.get(self.cursor)?.clone();
        self.cursor = (self.cursor + 1) % self.items.len();
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let dropped: Vec<T> = self.items.iter().filter(|i| !keep(i)).cloned().collect();
        for item in &dropped {
            self.remove(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_in_insertion_order() {
        let mut r = Rotation::new();
        for i in 0..3 {
            r.add(i);
        }
        let seen: Vec<_> = (0..7).filter_map(|_| r.next()).collect();
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_empty_rotation_yields_nothing() {
        let mut r: Rotation<u32> = Rotation::new();
        assert_eq!(r.next(), None);
        assert!(!r.remove(&3));
    }

    #[test]
    fn test_duplicate_add_ignored() {
        let mut r = Rotation::new();
        assert!(r.add('a'));
        assert!(!r.add('a'));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_remove_before_cursor_keeps_order() {
        let mut r = Rotation::new();
        for i in 0..4 {
            r.add(i);
        }
        assert_eq!(r.next(), Some(0));
        assert_eq!(r.next(), Some(1));
        // Cursor points at 2; removing 0 must not skip it.
        r.remove(&0);
        assert_eq!(r.next(), Some(2));
        assert_eq!(r.next(), Some(3));
        assert_eq!(r.next(), Some(1));
    }

    #[test]
    fn test_remove_at_cursor_moves_to_following() {
        let mut r = Rotation::new();
        for i in 0..3 {
            r.add(i);
        }
        assert_eq!(r.next(), Some(0));
        r.remove(&1);
        assert_eq!(r.next(), Some(2));
        assert_eq!(r.next(), Some(0));
    }

    #[test]
    fn test_remove_last_wraps_cursor() {
        let mut r = Rotation::new();
        for i in 0..3 {
            r.add(i);
        }
        r.next();
        r.next();
        r.remove(&2);
        assert_eq!(r.next(), Some(0), "cursor wraps when its item is gone");
    }

    #[test]
    fn test_added_mid_cycle_served_this_cycle() {
        let mut r = Rotation::new();
        r.add(0);
        r.add(1);
        assert_eq!(r.next(), Some(0));
        r.add(2);
        assert_eq!(r.next(), Some(1));
        assert_eq!(r.next(), Some(2));
    }

    #[test]
    fn test_from_parts_wraps_cursor() {
        let mut r = Rotation::from_parts(vec![5, 6], 3);
        assert_eq!(r.cursor(), 1);
        assert_eq!(r.next(), Some(6));
    }

    #[test]
    fn test_retain_drops_members() {
        let mut r = Rotation::new();
        for i in 0..5 {
            r.add(i);
        }
        r.retain(|i| i % 2 == 0);
        assert_eq!(r.items(), &[0, 2, 4]);
    }
}
