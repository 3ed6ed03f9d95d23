//! Partitioning of a single host resource dimension among consumers.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Denial of an allocation request that exceeds the remaining capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsufficientCapacity {
    pub requested: u64,
    pub available: u64,
}

impl Display for InsufficientCapacity {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "insufficient capacity: requested {}, available {}",
            self.requested, self.available
        )
    }
}

impl std::error::Error for InsufficientCapacity {}

/// Tracks total vs. allocated capacity of one resource dimension on one host.
///
/// This is the single enforcement point for the dimension: the sum of
/// allocations can never exceed the total, and no other component mutates the
/// resource.
pub struct Provisioner {
    total: u64,
    allocations: HashMap<u32, u64>,
}

impl Provisioner {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            allocations: HashMap::new(),
        }
    }

    /// Reserves `amount` for the consumer.
    ///
    /// Succeeds iff the amount fits into the remaining capacity; on denial no
    /// state is changed. A repeated call for the same consumer adds to its
    /// existing reservation.
    pub fn allocate(&mut self, consumer: u32, amount: u64) -> Result<(), InsufficientCapacity> {
        let available = self.available();
        if amount > available {
            return Err(InsufficientCapacity {
                requested: amount,
                available,
            });
        }
        *self.allocations.entry(consumer).or_insert(0) += amount;
        Ok(())
    }

    /// Releases whatever the consumer holds and returns the released amount.
    /// No-op returning 0 if the consumer holds nothing.
    pub fn deallocate(&mut self, consumer: u32) -> u64 {
        self.allocations.remove(&consumer).unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn allocated(&self) -> u64 {
        self.allocations.values().sum()
    }

    pub fn available(&self) -> u64 {
        self.total - self.allocated()
    }

    pub fn allocated_to(&self, consumer: u32) -> u64 {
        self.allocations.get(&consumer).copied().unwrap_or(0)
    }
}
