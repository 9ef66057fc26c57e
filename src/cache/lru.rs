//! LRU List Module
//!
//! Implements the recency order as an intrusive doubly linked list over a
//! slab of entries, giving O(1) promotion, unlink and eviction.

use crate::cache::CacheEntry;

// == LRU List ==
/// Recency-ordered storage for cache entries.
///
/// - `head` = most recently used
/// - `tail` = least recently used (next eviction candidate)
///
/// Freed slots are recycled, so indices handed out by `push_front` stay
/// valid until that entry is removed.
#[derive(Debug)]
pub struct LruList<K, V> {
    slots: Vec<Option<CacheEntry<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<K, V> Default for LruList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> LruList<K, V> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Stores an entry at the most-recently-used end and returns its index.
    pub fn push_front(&mut self, mut entry: CacheEntry<K, V>) -> usize {
        entry.prev = None;
        entry.next = None;

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(entry);
                idx
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };

        self.link_front(idx);
        self.len += 1;
        idx
    }

    // == Touch ==
    /// Moves an entry to the most-recently-used end.
    pub fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) || self.get(idx).is_none() {
            return;
        }
        self.unlink(idx);
        self.link_front(idx);
    }

    // == Remove ==
    /// Detaches and returns the entry at `idx`.
    pub fn remove(&mut self, idx: usize) -> Option<CacheEntry<K, V>> {
        self.get(idx)?;
        self.unlink(idx);

        let entry = self.slots[idx].take();
        self.free.push(idx);
        self.len -= 1;
        entry
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used entry.
    pub fn pop_back(&mut self) -> Option<CacheEntry<K, V>> {
        let tail = self.tail?;
        self.remove(tail)
    }

    // == Peek Oldest ==
    /// Returns the least recently used entry without removing it.
    pub fn peek_back(&self) -> Option<&CacheEntry<K, V>> {
        self.tail.and_then(|idx| self.get(idx))
    }

    /// Returns the most recently used entry.
    pub fn peek_front(&self) -> Option<&CacheEntry<K, V>> {
        self.head.and_then(|idx| self.get(idx))
    }

    pub fn get(&self, idx: usize) -> Option<&CacheEntry<K, V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut CacheEntry<K, V>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    // == Iteration ==
    /// Iterates from most to least recently used.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cursor: self.head,
            forward: true,
        }
    }

    /// Iterates from least to most recently used.
    pub fn iter_lru(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cursor: self.tail,
            forward: false,
        }
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every entry and releases the slab.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(entry) = self.get_mut(idx) {
            entry.prev = None;
            entry.next = old_head;
        }
        match old_head {
            Some(head) => {
                if let Some(entry) = self.get_mut(head) {
                    entry.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.get(idx) {
            Some(entry) => (entry.prev, entry.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(entry) = self.get_mut(p) {
                    entry.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(entry) = self.get_mut(n) {
                    entry.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(entry) = self.get_mut(idx) {
            entry.prev = None;
            entry.next = None;
        }
    }
}

// == Iterator ==
/// Borrowing iterator over entries in recency order.
pub struct Iter<'a, K, V> {
    list: &'a LruList<K, V>,
    cursor: Option<usize>,
    forward: bool,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = &'a CacheEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.list.get(self.cursor?)?;
        self.cursor = if self.forward { entry.next } else { entry.prev };
        Some(entry)
    }
}
