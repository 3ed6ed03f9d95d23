//! Event payloads exchanged between broker and datacenter.

/// VM lifecycle events.
pub mod allocation {
    use serde::Serialize;

    use crate::core::vm::Vm;

    /// Broker asks the datacenter to place and start a VM.
    #[derive(Serialize)]
    pub struct VmCreationRequest {
        pub vm: Vm,
    }

    /// Datacenter reports a successfully started VM.
    #[derive(Clone, Serialize)]
    pub struct VmCreated {
        pub vm_id: u32,
    }

    /// Datacenter abandons a VM whose placement timed out.
    #[derive(Clone, Serialize)]
    pub struct VmCreationFailed {
        pub vm_id: u32,
    }

    /// Broker asks the datacenter to destroy a VM.
    #[derive(Clone, Serialize)]
    pub struct VmDestructionRequest {
        pub vm_id: u32,
    }

    /// Datacenter confirms a destroyed VM and its released resources.
    #[derive(Clone, Serialize)]
    pub struct VmDeleted {
        pub vm_id: u32,
    }

    /// Periodic self-message retrying placement of pending VMs.
    #[derive(Clone, Serialize)]
    pub struct RetryPendingVms {}
}

/// Cloudlet lifecycle events.
pub mod cloudlet {
    use serde::Serialize;

    use crate::core::cloudlet::{Cloudlet, CloudletResult};

    /// Broker submits a cloudlet for execution on its bound VM.
    #[derive(Serialize)]
    pub struct CloudletSubmitRequest {
        pub cloudlet: Cloudlet,
    }

    /// Datacenter returns a finished or failed cloudlet to its broker.
    #[derive(Clone, Serialize)]
    pub struct CloudletReturn {
        pub result: CloudletResult,
    }
}

/// Internal processing ticks.
pub mod processing {
    use serde::Serialize;

    /// Self-message advancing cloudlet progress on one host, scheduled for
    /// the next predicted completion and rescheduled whenever rates change.
    #[derive(Clone, Serialize)]
    pub struct UpdateHostProcessing {
        pub host_id: u32,
    }
}
