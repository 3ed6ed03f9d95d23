//! VM-to-host placement policies.

use std::collections::BTreeMap;

use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::host::Host;

/// Strategy choosing which host receives a VM at placement time.
///
/// The policy only selects; the datacenter performs the atomic reservation.
/// Returns `None` when no host can satisfy the request, in which case the VM
/// stays pending and is retried on the next allocation-changing event.
pub trait VmAllocationPolicy {
    fn select_host(&self, alloc: &Allocation, hosts: &BTreeMap<u32, Host>) -> Option<u32>;
}

/// Default policy: scan hosts in a fixed order and pick the first one with
/// enough free PEs, RAM, bandwidth and storage.
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for FirstFit {
    fn default() -> Self {
        Self::new()
    }
}

impl VmAllocationPolicy for FirstFit {
    fn select_host(&self, alloc: &Allocation, hosts: &BTreeMap<u32, Host>) -> Option<u32> {
        hosts
            .values()
            .find(|host| host.can_allocate(alloc) == AllocationVerdict::Success)
            .map(|host| host.id)
    }
}

/// Picks the suitable host with the least unallocated MIPS, packing VMs
/// tightly.
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for BestFit {
    fn default() -> Self {
        Self::new()
    }
}

impl VmAllocationPolicy for BestFit {
    fn select_host(&self, alloc: &Allocation, hosts: &BTreeMap<u32, Host>) -> Option<u32> {
        let mut result = None;
        let mut min_free_mips = f64::INFINITY;
        for host in hosts.values() {
            if host.can_allocate(alloc) == AllocationVerdict::Success {
                let free_mips = host.total_mips() - host.total_allocated_mips();
                if free_mips < min_free_mips {
                    min_free_mips = free_mips;
                    result = Some(host.id);
                }
            }
        }
        result
    }
}

/// Picks the suitable host with the most unallocated MIPS, spreading load.
pub struct WorstFit;

impl WorstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for WorstFit {
    fn default() -> Self {
        Self::new()
    }
}

impl VmAllocationPolicy for WorstFit {
    fn select_host(&self, alloc: &Allocation, hosts: &BTreeMap<u32, Host>) -> Option<u32> {
        let mut result = None;
        let mut max_free_mips = f64::NEG_INFINITY;
        for host in hosts.values() {
            if host.can_allocate(alloc) == AllocationVerdict::Success {
                let free_mips = host.total_mips() - host.total_allocated_mips();
                if free_mips > max_free_mips {
                    max_free_mips = free_mips;
                    result = Some(host.id);
                }
            }
        }
        result
    }
}
