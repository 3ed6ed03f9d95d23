//! Physical host state: processing elements, provisioners and resident VMs.

use std::collections::BTreeSet;

use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::provisioner::Provisioner;
use crate::core::vm_scheduler::{TimeSharedVmScheduler, VmScheduler};

/// Status of a processing element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeStatus {
    Free,
    Busy,
}

/// One simulated CPU core with a fixed MIPS rating.
#[derive(Clone, Debug)]
pub struct Pe {
    pub id: u32,
    pub mips: f64,
    pub status: PeStatus,
}

/// A physical host owning an ordered set of PEs, scalar resource provisioners
/// and a VM scheduler partitioning its CPU capacity.
pub struct Host {
    pub id: u32,
    pes: Vec<Pe>,
    ram: Provisioner,
    bandwidth: Provisioner,
    storage: Provisioner,
    vm_scheduler: Box<dyn VmScheduler>,
    vms: BTreeSet<u32>,
}

impl Host {
    pub fn new(id: u32, pe_count: u32, mips_per_pe: f64, ram: u64, bandwidth: u64, storage: u64) -> Self {
        let pes = (0..pe_count)
            .map(|pe_id| Pe {
                id: pe_id,
                mips: mips_per_pe,
                status: PeStatus::Free,
            })
            .collect::<Vec<_>>();
        let capacity = pes.iter().map(|pe| pe.mips).sum();
        Self {
            id,
            pes,
            ram: Provisioner::new(ram),
            bandwidth: Provisioner::new(bandwidth),
            storage: Provisioner::new(storage),
            vm_scheduler: Box::new(TimeSharedVmScheduler::new(capacity)),
            vms: BTreeSet::new(),
        }
    }

    /// Aggregate MIPS rating over all PEs.
    pub fn total_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.mips).sum()
    }

    pub fn free_pes(&self) -> u32 {
        self.pes.iter().filter(|pe| pe.status == PeStatus::Free).count() as u32
    }

    /// Checks whether the allocation fits all four resource dimensions.
    /// Read-only, used by placement policies.
    pub fn can_allocate(&self, alloc: &Allocation) -> AllocationVerdict {
        if self.free_pes() < alloc.pe_count {
            return AllocationVerdict::NotEnoughPes;
        }
        if self.ram.available() < alloc.ram {
            return AllocationVerdict::NotEnoughRam;
        }
        if self.bandwidth.available() < alloc.bandwidth {
            return AllocationVerdict::NotEnoughBandwidth;
        }
        if self.storage.available() < alloc.storage {
            return AllocationVerdict::NotEnoughStorage;
        }
        AllocationVerdict::Success
    }

    /// Reserves all resource dimensions for the VM atomically.
    ///
    /// On any denial the already reserved dimensions are rolled back and the
    /// verdict names the failed dimension, leaving the host unchanged.
    pub fn allocate(&mut self, alloc: &Allocation) -> AllocationVerdict {
        if self.free_pes() < alloc.pe_count {
            return AllocationVerdict::NotEnoughPes;
        }
        if self.ram.allocate(alloc.vm_id, alloc.ram).is_err() {
            return AllocationVerdict::NotEnoughRam;
        }
        if self.bandwidth.allocate(alloc.vm_id, alloc.bandwidth).is_err() {
            self.ram.deallocate(alloc.vm_id);
            return AllocationVerdict::NotEnoughBandwidth;
        }
        if self.storage.allocate(alloc.vm_id, alloc.storage).is_err() {
            self.ram.deallocate(alloc.vm_id);
            self.bandwidth.deallocate(alloc.vm_id);
            return AllocationVerdict::NotEnoughStorage;
        }
        self.set_pe_statuses(alloc.pe_count, PeStatus::Busy);
        self.vm_scheduler.add_vm(alloc.vm_id, alloc.pe_count, alloc.mips_per_pe);
        self.vms.insert(alloc.vm_id);
        AllocationVerdict::Success
    }

    /// Releases every reservation held by the VM. No-op for non-resident VMs.
    pub fn release(&mut self, vm_id: u32) {
        if !self.vms.remove(&vm_id) {
            return;
        }
        let pe_count = self.vm_scheduler.pe_count(vm_id);
        self.ram.deallocate(vm_id);
        self.bandwidth.deallocate(vm_id);
        self.storage.deallocate(vm_id);
        self.vm_scheduler.remove_vm(vm_id);
        self.set_pe_statuses(pe_count, PeStatus::Free);
    }

    fn set_pe_statuses(&mut self, count: u32, status: PeStatus) {
        let from = match status {
            PeStatus::Busy => PeStatus::Free,
            PeStatus::Free => PeStatus::Busy,
        };
        let mut left = count;
        for pe in self.pes.iter_mut() {
            if left == 0 {
                break;
            }
            if pe.status == from {
                pe.status = status;
                left -= 1;
            }
        }
    }

    /// Aggregate MIPS currently allocated to the VM by the host scheduler.
    pub fn allocated_mips_for(&self, vm_id: u32) -> f64 {
        self.vm_scheduler.allocated_mips(vm_id)
    }

    pub fn total_allocated_mips(&self) -> f64 {
        self.vm_scheduler.total_allocated()
    }

    pub fn vms(&self) -> impl Iterator<Item = u32> + '_ {
        self.vms.iter().copied()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    pub fn ram_total(&self) -> u64 {
        self.ram.total()
    }

    pub fn ram_available(&self) -> u64 {
        self.ram.available()
    }

    pub fn bandwidth_total(&self) -> u64 {
        self.bandwidth.total()
    }

    pub fn bandwidth_available(&self) -> u64 {
        self.bandwidth.available()
    }

    pub fn storage_total(&self) -> u64 {
        self.storage.total()
    }

    pub fn storage_available(&self) -> u64 {
        self.storage.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(vm_id: u32, pe_count: u32, mips: f64, ram: u64) -> Allocation {
        Allocation {
            vm_id,
            pe_count,
            mips_per_pe: mips,
            ram,
            bandwidth: 1000,
            storage: 10000,
        }
    }

    #[test]
    fn allocation_is_atomic_across_dimensions() {
        let mut host = Host::new(0, 2, 1000., 4096, 10000, 1_000_000);
        // RAM fits but bandwidth does not; nothing must be committed
        let a = Allocation {
            vm_id: 1,
            pe_count: 1,
            mips_per_pe: 1000.,
            ram: 512,
            bandwidth: 20000,
            storage: 10000,
        };
        assert_eq!(host.allocate(&a), AllocationVerdict::NotEnoughBandwidth);
        assert_eq!(host.ram_available(), 4096);
        assert_eq!(host.free_pes(), 2);
        assert_eq!(host.vm_count(), 0);
    }

    #[test]
    fn release_restores_pre_allocation_state() {
        let mut host = Host::new(0, 2, 1000., 4096, 10000, 1_000_000);
        assert_eq!(host.allocate(&alloc(1, 1, 1000., 512)), AllocationVerdict::Success);
        assert_eq!(host.free_pes(), 1);
        assert_eq!(host.ram_available(), 3584);
        host.release(1);
        assert_eq!(host.free_pes(), 2);
        assert_eq!(host.ram_available(), 4096);
        assert_eq!(host.total_allocated_mips(), 0.);
    }

    #[test]
    fn pe_shortage_is_detected() {
        let mut host = Host::new(0, 2, 1000., 4096, 10000, 1_000_000);
        assert_eq!(host.allocate(&alloc(1, 2, 1000., 512)), AllocationVerdict::Success);
        assert_eq!(host.can_allocate(&alloc(2, 1, 1000., 512)), AllocationVerdict::NotEnoughPes);
    }
}
