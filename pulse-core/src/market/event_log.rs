//! Capped most-recent-first event log
//!
//! Backed by a `VecDeque`: `push` is a `push_front` plus at most one
//! `pop_back`, so each push is O(1) amortized and the log never holds more
//! than `capacity` entries.

use crate::core::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedLog<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> BoundedLog<T> {
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        if capacity == 0 {
            return Err(EngineError::invalid("log.capacity", "must be greater than zero"));
        }
        Ok(Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
        })
    }

    /// Prepend `event`; returns the evicted oldest entry, if any
    pub fn push(&mut self, event: T) -> Option<T> {
        self.entries.push_front(event);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Push events in arrival order (the last one ends up at index 0)
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, events: I) {
        for event in events {
            self.push(event);
        }
    }

    /// Newest entry
    pub fn latest(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Clone> BoundedLog<T> {
    /// Newest-first copy for publishing
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut log = BoundedLog::new(3).unwrap();
        assert_eq!(log.push('A'), None);
        assert_eq!(log.push('B'), None);
        assert_eq!(log.push('C'), None);
        assert_eq!(log.push('D'), Some('A'));

        assert_eq!(log.to_vec(), vec!['D', 'C', 'B']);
        assert_eq!(log.latest(), Some(&'D'));
    }

    #[test]
    fn test_capacity_one() {
        let mut log = BoundedLog::new(1).unwrap();
        log.extend([1, 2, 3]);
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest(), Some(&3));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(BoundedLog::<u8>::new(0).is_err());
    }
}
