//! Host-level apportioning of aggregate PE capacity among resident VMs.

use std::collections::BTreeMap;

use crate::core::common::fair_share;

/// Strategy deciding how much of the host's aggregate MIPS each resident VM
/// receives at the current instant.
///
/// Allocations are recomputed whenever the resident set changes; there is no
/// fixed-interval re-evaluation.
pub trait VmScheduler {
    fn add_vm(&mut self, vm_id: u32, pe_count: u32, mips_per_pe: f64);
    fn remove_vm(&mut self, vm_id: u32);
    /// Aggregate MIPS currently allocated to the VM, 0 if not resident.
    fn allocated_mips(&self, vm_id: u32) -> f64;
    /// Number of PEs requested by the VM, 0 if not resident.
    fn pe_count(&self, vm_id: u32) -> u32;
    fn total_capacity(&self) -> f64;
    /// Sum of current allocations; never exceeds the total capacity.
    fn total_allocated(&self) -> f64;
}

struct MipsRequest {
    pe_count: u32,
    mips_per_pe: f64,
}

/// Proportional time-sharing: full requests when they fit the host capacity,
/// otherwise every VM's allocation is scaled down by the same ratio.
pub struct TimeSharedVmScheduler {
    capacity: f64,
    requests: BTreeMap<u32, MipsRequest>,
    shares: BTreeMap<u32, f64>,
}

impl TimeSharedVmScheduler {
    pub fn new(capacity: f64) -> Self {
        Self {
            capacity,
            requests: BTreeMap::new(),
            shares: BTreeMap::new(),
        }
    }

    fn recompute(&mut self) {
        let requested: Vec<f64> = self
            .requests
            .values()
            .map(|r| r.pe_count as f64 * r.mips_per_pe)
            .collect();
        let shares = fair_share(self.capacity, &requested);
        self.shares = self.requests.keys().copied().zip(shares).collect();
    }
}

impl VmScheduler for TimeSharedVmScheduler {
    fn add_vm(&mut self, vm_id: u32, pe_count: u32, mips_per_pe: f64) {
        self.requests.insert(vm_id, MipsRequest { pe_count, mips_per_pe });
        self.recompute();
    }

    fn remove_vm(&mut self, vm_id: u32) {
        self.requests.remove(&vm_id);
        self.recompute();
    }

    fn allocated_mips(&self, vm_id: u32) -> f64 {
        self.shares.get(&vm_id).copied().unwrap_or(0.)
    }

    fn pe_count(&self, vm_id: u32) -> u32 {
        self.requests.get(&vm_id).map(|r| r.pe_count).unwrap_or(0)
    }

    fn total_capacity(&self) -> f64 {
        self.capacity
    }

    fn total_allocated(&self) -> f64 {
        self.shares.values().sum()
    }
}
