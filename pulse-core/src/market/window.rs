//! Fixed-capacity, bucket-keyed sliding window
//!
//! Shared by chart series and metric histories. Rules per append:
//! 1. Same bucket as the newest point: replace it in place
//! 2. Newer bucket: push to the back
//! 3. Older bucket: dropped, the series stays ordered
//! 4. Evict from the front until `len <= capacity`

use crate::core::{EngineError, TimeBucket};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Anything keyed by a time bucket
pub trait Bucketed {
    fn bucket(&self) -> TimeBucket;
}

/// What `SlidingWindow::append` did with the point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// New bucket pushed; `evicted` oldest points dropped
    Appended { evicted: usize },
    /// Newest point replaced in place
    Coalesced,
    /// Point's bucket precedes the newest point; ignored
    OutOfOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlidingWindow<T> {
    capacity: usize,
    points: VecDeque<T>,
}

impl<T: Bucketed> SlidingWindow<T> {
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        if capacity == 0 {
            return Err(EngineError::invalid("window.capacity", "must be greater than zero"));
        }
        Ok(Self {
            capacity,
            points: VecDeque::with_capacity(capacity + 1),
        })
    }

    pub fn append(&mut self, point: T) -> AppendOutcome {
        if let Some(last) = self.points.back_mut() {
            let (incoming, newest) = (point.bucket(), last.bucket());
            if incoming == newest {
                *last = point;
                return AppendOutcome::Coalesced;
            }
            if incoming < newest {
                return AppendOutcome::OutOfOrder;
            }
        }

        self.points.push_back(point);
        let mut evicted = 0;
        while self.points.len() > self.capacity {
            self.points.pop_front();
            evicted += 1;
        }
        AppendOutcome::Appended { evicted }
    }

    pub fn last(&self) -> Option<&T> {
        self.points.back()
    }

    pub fn first(&self) -> Option<&T> {
        self.points.front()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.points.iter()
    }
}

impl<T: Bucketed + Clone> SlidingWindow<T> {
    /// Oldest-first copy for publishing
    pub fn to_vec(&self) -> Vec<T> {
        self.points.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Sample {
        bucket: TimeBucket,
        value: f64,
    }

    impl Bucketed for Sample {
        fn bucket(&self) -> TimeBucket {
            self.bucket
        }
    }

    fn sample(bucket: u64, value: f64) -> Sample {
        Sample {
            bucket: TimeBucket(bucket),
            value,
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(SlidingWindow::<Sample>::new(0).is_err());
    }

    #[test]
    fn test_same_bucket_coalesces() {
        // 09:00 and 09:01 as minute buckets
        let (nine, nine_one) = (540, 541);
        let mut window = SlidingWindow::new(2).unwrap();
        window.append(sample(nine, 1.0));
        window.append(sample(nine_one, 2.0));

        assert_eq!(window.append(sample(nine_one, 3.0)), AppendOutcome::Coalesced);
        assert_eq!(window.len(), 2);
        assert_eq!(window.last().unwrap().value, 3.0);
        assert_eq!(window.first().unwrap().bucket, TimeBucket(nine));
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut window = SlidingWindow::new(3).unwrap();
        for b in 0..3 {
            window.append(sample(b, b as f64));
        }
        assert_eq!(window.append(sample(3, 3.0)), AppendOutcome::Appended { evicted: 1 });
        let buckets: Vec<u64> = window.iter().map(|s| s.bucket.0).collect();
        assert_eq!(buckets, vec![1, 2, 3]);
    }

    #[test]
    fn test_out_of_order_ignored() {
        let mut window = SlidingWindow::new(3).unwrap();
        window.append(sample(5, 1.0));
        assert_eq!(window.append(sample(4, 9.0)), AppendOutcome::OutOfOrder);
        assert_eq!(window.len(), 1);
        assert_eq!(window.last().unwrap().value, 1.0);
    }
}
