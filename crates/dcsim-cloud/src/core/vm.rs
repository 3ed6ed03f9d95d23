//! Representations of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use dcsim_core::Id;

use crate::core::cloudlet_scheduler::TimeSharedCloudletScheduler;
use crate::core::common::Allocation;
use crate::core::config::VmSpec;

/// Lifecycle state of a VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    /// Requested, not yet placed on a host.
    Created,
    /// Placed on a host with resources reserved, executing cloudlets.
    Running,
    /// Explicitly released or abandoned.
    Destroyed,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Created => write!(f, "created"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// A virtual machine: a resource request plus the cloudlet scheduler that
/// apportions whatever MIPS the host currently grants it.
///
/// Only the datacenter mutates the host assignment; only the cloudlet
/// scheduler mutates the set of bound cloudlets.
pub struct Vm {
    pub id: u32,
    pub broker_id: Id,
    pub mips_per_pe: f64,
    pub pe_count: u32,
    pub ram: u64,
    pub bandwidth: u64,
    pub storage: u64,
    pub host_id: Option<u32>,
    pub status: VmStatus,
    /// Simulation time of the creation request, used for the allocation
    /// timeout check.
    pub allocation_start_time: f64,
    pub scheduler: TimeSharedCloudletScheduler,
}

impl Serialize for Vm {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Vm", 5)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("pe_count", &self.pe_count)?;
        state.serialize_field("mips_per_pe", &self.mips_per_pe)?;
        state.serialize_field("ram", &self.ram)?;
        state.serialize_field("bandwidth", &self.bandwidth)?;
        state.end()
    }
}

impl Vm {
    pub fn from_spec(spec: &VmSpec, broker_id: Id, allocation_start_time: f64) -> Self {
        Self {
            id: spec.id,
            broker_id,
            mips_per_pe: spec.mips_per_pe,
            pe_count: spec.pe_count,
            ram: spec.ram,
            bandwidth: spec.bandwidth,
            storage: spec.storage,
            host_id: None,
            status: VmStatus::Created,
            allocation_start_time,
            scheduler: TimeSharedCloudletScheduler::new(spec.pe_count),
        }
    }

    /// The resource request used for placement.
    pub fn allocation(&self) -> Allocation {
        Allocation {
            vm_id: self.id,
            pe_count: self.pe_count,
            mips_per_pe: self.mips_per_pe,
            ram: self.ram,
            bandwidth: self.bandwidth,
            storage: self.storage,
        }
    }
}
