//! The shared queue of ports still waiting to be probed.

use crate::types::Port;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// A pre-filled, never-replenished FIFO of ports.
///
/// Every port is handed out by [`claim`](Self::claim) exactly once; once it
/// returns `None` the queue stays empty.
#[derive(Debug)]
pub struct WorkQueue {
    pending: Mutex<VecDeque<Port>>,
}

impl WorkQueue {
    pub fn new(ports: impl IntoIterator<Item = Port>) -> Self {
        Self {
            pending: Mutex::new(ports.into_iter().collect()),
        }
    }

    /// Atomically take the next port, or `None` if the queue is drained.
    pub fn claim(&self) -> Option<Port> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_claims_in_order_then_drains() {
        let queue = WorkQueue::new([22, 80, 443].into_iter().filter_map(Port::new));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.claim().map(u16::from), Some(22));
        assert_eq!(queue.claim().map(u16::from), Some(80));
        assert_eq!(queue.claim().map(u16::from), Some(443));
        assert_eq!(queue.claim(), None);
        assert_eq!(queue.claim(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_claims_are_disjoint() {
        let queue = Arc::new(WorkQueue::new((1..=5000).filter_map(Port::new)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let mut mine = Vec::new();
                    while let Some(port) = queue.claim() {
                        mine.push(port);
                    }
                    mine
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for port in handle.join().unwrap() {
                assert!(seen.insert(port), "port {} claimed twice", port);
                total += 1;
            }
        }
        assert_eq!(total, 5000);
    }
}
