//! Datacenter component orchestrating hosts, VM placement and cloudlet
//! execution.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use dcsim_core::cast;
use dcsim_core::{log_debug, log_error, log_info, log_warn};
use dcsim_core::{Event, EventHandler, EventId, SimulationContext};

use crate::core::cloudlet::{Cloudlet, CloudletResult, CloudletStatus};
use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::config::{DatacenterCharacteristics, HostConfig, SimulationConfig};
use crate::core::events::allocation::{
    RetryPendingVms, VmCreated, VmCreationFailed, VmCreationRequest, VmDeleted, VmDestructionRequest,
};
use crate::core::events::cloudlet::{CloudletReturn, CloudletSubmitRequest};
use crate::core::events::processing::UpdateHostProcessing;
use crate::core::host::Host;
use crate::core::vm::{Vm, VmStatus};
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// A datacenter owning a set of hosts and the VMs placed on them.
///
/// Placement is retried both when resources are released and periodically
/// with `allocation_retry_period`; a VM pending longer than
/// `vm_allocation_timeout` is abandoned. Cloudlet progress is advanced
/// lazily via per-host self-messages scheduled for the next predicted
/// completion.
pub struct Datacenter {
    characteristics: DatacenterCharacteristics,
    hosts: BTreeMap<u32, Host>,
    vms: BTreeMap<u32, Vm>,
    pending_vms: VecDeque<u32>,
    vm_allocation_policy: Box<dyn VmAllocationPolicy>,
    /// Scheduled processing tick per host, canceled and rescheduled whenever
    /// allocation rates on that host change.
    update_events: HashMap<u32, EventId>,
    retry_event: Option<EventId>,
    config: Rc<SimulationConfig>,
    ctx: SimulationContext,
}

impl Datacenter {
    pub fn new(
        characteristics: DatacenterCharacteristics,
        vm_allocation_policy: Box<dyn VmAllocationPolicy>,
        config: Rc<SimulationConfig>,
        ctx: SimulationContext,
    ) -> Self {
        let mut dc = Self {
            characteristics,
            hosts: BTreeMap::new(),
            vms: BTreeMap::new(),
            pending_vms: VecDeque::new(),
            vm_allocation_policy,
            update_events: HashMap::new(),
            retry_event: None,
            config: config.clone(),
            ctx,
        };
        for host_config in &config.hosts {
            dc.add_host(host_config);
        }
        dc
    }

    pub fn id(&self) -> dcsim_core::Id {
        self.ctx.id()
    }

    /// Creates a host with sequentially assigned id and returns it.
    pub fn add_host(&mut self, config: &HostConfig) -> u32 {
        let id = self.hosts.len() as u32;
        self.hosts.insert(
            id,
            Host::new(
                id,
                config.pe_count,
                config.mips_per_pe,
                config.ram,
                config.bandwidth,
                config.storage,
            ),
        );
        log_debug!(
            self.ctx,
            "created host {} with {} PEs of {} MIPS",
            id,
            config.pe_count,
            config.mips_per_pe
        );
        id
    }

    pub fn host(&self, id: u32) -> Option<&Host> {
        self.hosts.get(&id)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn vm_status(&self, vm_id: u32) -> Option<VmStatus> {
        self.vms.get(&vm_id).map(|vm| vm.status)
    }

    pub fn vm_host(&self, vm_id: u32) -> Option<u32> {
        self.vms.get(&vm_id).and_then(|vm| vm.host_id)
    }

    pub fn characteristics(&self) -> &DatacenterCharacteristics {
        &self.characteristics
    }

    /// Placement feasibility check against one host.
    pub fn can_allocate(&self, host_id: u32, alloc: &Allocation) -> AllocationVerdict {
        match self.hosts.get(&host_id) {
            Some(host) => host.can_allocate(alloc),
            None => AllocationVerdict::HostNotFound,
        }
    }

    fn on_vm_creation_request(&mut self, vm: Vm) {
        let vm_id = vm.id;
        if self.vms.contains_key(&vm_id) {
            log_error!(self.ctx, "VM {} already exists, ignoring creation request", vm_id);
            return;
        }
        self.vms.insert(vm_id, vm);
        self.pending_vms.push_back(vm_id);
        self.place_pending_vms();
    }

    /// Tries to place each pending VM in submission order, keeping the ones
    /// that still do not fit and abandoning the ones past the timeout.
    fn place_pending_vms(&mut self) {
        let time = self.ctx.time();
        let mut still_pending = VecDeque::new();
        while let Some(vm_id) = self.pending_vms.pop_front() {
            let vm = self.vms.get_mut(&vm_id).unwrap();
            if time - vm.allocation_start_time > self.config.vm_allocation_timeout {
                vm.status = VmStatus::Destroyed;
                let broker_id = vm.broker_id;
                log_warn!(self.ctx, "VM {} allocation timed out, abandoning", vm_id);
                self.ctx.emit_now(VmCreationFailed { vm_id }, broker_id);
                continue;
            }
            let alloc = vm.allocation();
            match self.vm_allocation_policy.select_host(&alloc, &self.hosts) {
                Some(host_id) => {
                    // settle in-flight progress at the pre-placement rates,
                    // the reservation below changes the shares
                    self.update_host_processing(host_id);
                    let verdict = self.hosts.get_mut(&host_id).unwrap().allocate(&alloc);
                    if verdict != AllocationVerdict::Success {
                        // the policy checked capacity, a non-success verdict
                        // means the policy and host disagree
                        log_error!(
                            self.ctx,
                            "placement of VM {} on host {} rejected: {:?}",
                            vm_id,
                            host_id,
                            verdict
                        );
                        still_pending.push_back(vm_id);
                        continue;
                    }
                    let vm = self.vms.get_mut(&vm_id).unwrap();
                    vm.host_id = Some(host_id);
                    vm.status = VmStatus::Running;
                    let broker_id = vm.broker_id;
                    log_info!(self.ctx, "VM {} started on host {}", vm_id, host_id);
                    self.ctx.emit_now(VmCreated { vm_id }, broker_id);
                    // rates of other VMs on this host may have dropped
                    self.update_host_processing(host_id);
                }
                None => {
                    still_pending.push_back(vm_id);
                }
            }
        }
        self.pending_vms = still_pending;
        self.schedule_retry();
    }

    fn schedule_retry(&mut self) {
        if self.pending_vms.is_empty() {
            if let Some(event_id) = self.retry_event.take() {
                self.ctx.cancel_event(event_id);
            }
        } else if self.retry_event.is_none() {
            let delay = self.config.allocation_retry_period;
            self.retry_event = Some(self.ctx.emit_self(RetryPendingVms {}, delay));
        }
    }

    fn on_retry_pending_vms(&mut self) {
        self.retry_event = None;
        self.place_pending_vms();
    }

    fn on_vm_destruction_request(&mut self, vm_id: u32) {
        let Some(vm) = self.vms.get_mut(&vm_id) else {
            log_error!(self.ctx, "cannot destroy unknown VM {}", vm_id);
            return;
        };
        if vm.status == VmStatus::Destroyed {
            log_error!(self.ctx, "cannot destroy VM {} twice", vm_id);
            return;
        }
        let broker_id = vm.broker_id;
        match vm.host_id {
            Some(host_id) => {
                // settle progress up to now before failing the leftovers
                self.update_host_processing(host_id);
                let vm = self.vms.get_mut(&vm_id).unwrap();
                vm.status = VmStatus::Destroyed;
                vm.host_id = None;
                let failed = vm.scheduler.fail_all(self.ctx.time());
                for cloudlet in failed {
                    let result = self.make_result(&cloudlet);
                    let dst = cloudlet.broker_id;
                    log_warn!(
                        self.ctx,
                        "cloudlet {} failed, VM {} destroyed before completion",
                        result.id,
                        vm_id
                    );
                    self.ctx.emit_now(CloudletReturn { result }, dst);
                }
                self.hosts.get_mut(&host_id).unwrap().release(vm_id);
                log_info!(self.ctx, "VM {} destroyed, host {} resources released", vm_id, host_id);
                self.ctx.emit_now(VmDeleted { vm_id }, broker_id);
                // survivors on this host run faster now
                self.update_host_processing(host_id);
                // freed resources may admit pending VMs
                self.place_pending_vms();
            }
            None => {
                vm.status = VmStatus::Destroyed;
                self.pending_vms.retain(|id| *id != vm_id);
                log_info!(self.ctx, "pending VM {} destroyed before placement", vm_id);
                self.ctx.emit_now(VmDeleted { vm_id }, broker_id);
                self.schedule_retry();
            }
        }
    }

    fn on_cloudlet_submit(&mut self, cloudlet: Cloudlet) {
        let vm_id = cloudlet.vm_id;
        let host_id = match self.vms.get(&vm_id) {
            Some(vm) if vm.status != VmStatus::Destroyed => vm.host_id,
            _ => {
                log_error!(
                    self.ctx,
                    "cloudlet {} references missing or destroyed VM {}",
                    cloudlet.id,
                    vm_id
                );
                let mut failed = cloudlet;
                failed.status = CloudletStatus::Failed;
                failed.finish_time = self.ctx.time();
                let result = self.make_result(&failed);
                let dst = failed.broker_id;
                self.ctx.emit_now(CloudletReturn { result }, dst);
                return;
            }
        };
        // settle progress of co-located cloudlets before the share changes
        if let Some(host_id) = host_id {
            self.update_host_processing(host_id);
        }
        let cloudlet_id = cloudlet.id;
        let vm = self.vms.get_mut(&vm_id).unwrap();
        if let Err(denial) = vm.scheduler.submit(cloudlet) {
            log_warn!(self.ctx, "cloudlet {} queued on VM {}: {}", cloudlet_id, vm_id, denial);
        } else {
            log_debug!(self.ctx, "cloudlet {} submitted to VM {}", cloudlet_id, vm_id);
        }
        if let Some(host_id) = host_id {
            self.update_host_processing(host_id);
        }
    }

    /// Advances every VM on the host to the current time, returns finished
    /// cloudlets to their brokers and reschedules the host's processing tick
    /// for the next predicted completion.
    fn update_host_processing(&mut self, host_id: u32) {
        if let Some(event_id) = self.update_events.remove(&host_id) {
            self.ctx.cancel_event(event_id);
        }
        let time = self.ctx.time();
        let vm_ids: Vec<u32> = self.hosts[&host_id].vms().collect();
        let mut next_tick = f64::INFINITY;
        for vm_id in vm_ids {
            let allocated_mips = self.hosts[&host_id].allocated_mips_for(vm_id);
            let vm = self.vms.get_mut(&vm_id).unwrap();
            let next = vm.scheduler.update_processing(time, allocated_mips);
            let finished = vm.scheduler.drain_finished();
            for cloudlet in finished {
                let result = self.make_result(&cloudlet);
                let dst = cloudlet.broker_id;
                log_info!(
                    self.ctx,
                    "cloudlet {} finished on VM {} after {:.3}s",
                    result.id,
                    vm_id,
                    result.exec_time
                );
                self.ctx.emit_now(CloudletReturn { result }, dst);
            }
            if let Some(delay) = next {
                next_tick = next_tick.min(delay);
            }
        }
        if next_tick.is_finite() {
            let event_id = self.ctx.emit_self(UpdateHostProcessing { host_id }, next_tick);
            self.update_events.insert(host_id, event_id);
        }
    }

    fn on_update_host_processing(&mut self, host_id: u32) {
        self.update_events.remove(&host_id);
        self.update_host_processing(host_id);
    }

    fn make_result(&self, cloudlet: &Cloudlet) -> CloudletResult {
        let exec_time = if cloudlet.exec_start_time >= 0. {
            cloudlet.finish_time - cloudlet.exec_start_time
        } else {
            0.
        };
        let pricing = &self.characteristics;
        let processing_cost = pricing.cost_per_sec * exec_time
            + pricing.cost_per_bw * (cloudlet.input_size + cloudlet.output_size) as f64;
        CloudletResult {
            id: cloudlet.id,
            status: cloudlet.status,
            datacenter_id: self.ctx.id(),
            vm_id: Some(cloudlet.vm_id),
            exec_time,
            start_time: cloudlet.exec_start_time,
            finish_time: cloudlet.finish_time,
            processing_cost,
        }
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreationRequest { vm } => {
                self.on_vm_creation_request(vm);
            }
            VmDestructionRequest { vm_id } => {
                self.on_vm_destruction_request(vm_id);
            }
            RetryPendingVms {} => {
                self.on_retry_pending_vms();
            }
            CloudletSubmitRequest { cloudlet } => {
                self.on_cloudlet_submit(cloudlet);
            }
            UpdateHostProcessing { host_id } => {
                self.on_update_host_processing(host_id);
            }
        })
    }
}
