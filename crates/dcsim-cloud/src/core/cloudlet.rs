//! Representations of workload units (cloudlets) and their lifecycle.

use std::fmt::{Display, Formatter};

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use dcsim_core::Id;

use crate::core::config::CloudletSpec;
use crate::core::utilization_model::{UtilizationModel, UtilizationModelConstant, UtilizationModelFull};

/// Lifecycle state of a cloudlet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CloudletStatus {
    /// Constructed, not yet submitted.
    Created,
    /// Submitted, awaiting execution capacity on its VM.
    Queued,
    /// Bound to a running VM, accumulating executed length.
    InExec,
    /// Executed length reached total length.
    Success,
    /// VM destroyed before completion, or invalid submission.
    Failed,
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Created => write!(f, "created"),
            CloudletStatus::Queued => write!(f, "queued"),
            CloudletStatus::InExec => write!(f, "in_exec"),
            CloudletStatus::Success => write!(f, "success"),
            CloudletStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A unit of simulated workload with a fixed instruction-count length.
#[derive(Clone)]
pub struct Cloudlet {
    pub id: u32,
    pub broker_id: Id,
    /// Total length in million instructions.
    pub length: f64,
    /// Number of PEs the cloudlet occupies while executing.
    pub pes: u32,
    pub input_size: u64,
    pub output_size: u64,
    pub vm_id: u32,
    pub status: CloudletStatus,
    cpu_utilization: Box<dyn UtilizationModel>,
    ram_utilization: Box<dyn UtilizationModel>,
    bw_utilization: Box<dyn UtilizationModel>,
    executed: f64,
    pub exec_start_time: f64,
    pub finish_time: f64,
}

impl Serialize for Cloudlet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Cloudlet", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("length", &self.length)?;
        state.serialize_field("pes", &self.pes)?;
        state.serialize_field("vm_id", &self.vm_id)?;
        state.end()
    }
}

impl Cloudlet {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u32,
        broker_id: Id,
        length: f64,
        pes: u32,
        input_size: u64,
        output_size: u64,
        vm_id: u32,
        cpu_utilization: Box<dyn UtilizationModel>,
        ram_utilization: Box<dyn UtilizationModel>,
        bw_utilization: Box<dyn UtilizationModel>,
    ) -> Self {
        Self {
            id,
            broker_id,
            length,
            pes,
            input_size,
            output_size,
            vm_id,
            status: CloudletStatus::Created,
            cpu_utilization,
            ram_utilization,
            bw_utilization,
            executed: 0.,
            exec_start_time: -1.,
            finish_time: -1.,
        }
    }

    /// Builds a cloudlet from its plain configuration struct.
    ///
    /// Missing utilization fractions default to full (100%) utilization.
    pub fn from_spec(spec: &CloudletSpec, broker_id: Id, vm_id: u32) -> Self {
        fn model(fraction: Option<f64>) -> Box<dyn UtilizationModel> {
            match fraction {
                Some(f) => Box::new(UtilizationModelConstant::new(f)),
                None => Box::new(UtilizationModelFull::new()),
            }
        }
        Self::new(
            spec.id,
            broker_id,
            spec.length,
            spec.pes,
            spec.input_size,
            spec.output_size,
            vm_id,
            model(spec.cpu_utilization),
            model(spec.ram_utilization),
            model(spec.bw_utilization),
        )
    }

    pub fn executed(&self) -> f64 {
        self.executed
    }

    pub fn remaining(&self) -> f64 {
        (self.length - self.executed).max(0.)
    }

    /// Completion check with a tolerance relative to the total length, so
    /// that a share-scaled advance ending a few ulps short still completes.
    pub fn is_finished(&self) -> bool {
        self.executed >= self.length - dcsim_core::EPSILON * self.length.max(1.)
    }

    /// Advances the executed length by `mips * interval` million instructions.
    pub fn advance(&mut self, mips: f64, interval: f64) {
        self.executed += mips * interval;
    }

    pub fn cpu_utilization(&self, time: f64) -> f64 {
        self.cpu_utilization.utilization(time)
    }

    pub fn ram_utilization(&self, time: f64) -> f64 {
        self.ram_utilization.utilization(time)
    }

    pub fn bw_utilization(&self, time: f64) -> f64 {
        self.bw_utilization.utilization(time)
    }
}

/// Completion record returned to the broker.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CloudletResult {
    pub id: u32,
    pub status: CloudletStatus,
    pub datacenter_id: u32,
    /// `None` when the cloudlet was never bound to a VM.
    pub vm_id: Option<u32>,
    /// Actual CPU time consumed, `finish_time - start_time`.
    pub exec_time: f64,
    pub start_time: f64,
    pub finish_time: f64,
    /// Cost of processing, derived from the datacenter pricing; accounting
    /// only, never affects scheduling.
    pub processing_cost: f64,
}
