//! Broker component submitting VMs and cloudlets and collecting results.

use std::collections::HashMap;

use indexmap::IndexMap;

use dcsim_core::cast;
use dcsim_core::{log_debug, log_error, log_info, log_warn};
use dcsim_core::{Event, EventHandler, Id, SimulationContext};

use crate::core::cloudlet::{Cloudlet, CloudletResult, CloudletStatus};
use crate::core::config::{CloudletSpec, VmSpec};
use crate::core::events::allocation::{
    VmCreated, VmCreationFailed, VmCreationRequest, VmDeleted, VmDestructionRequest,
};
use crate::core::events::cloudlet::{CloudletReturn, CloudletSubmitRequest};
use crate::core::vm::{Vm, VmStatus};

/// A broker owning a set of VMs in one datacenter.
///
/// Cloudlets referencing a VM whose creation is not yet acknowledged are held
/// back and submitted on `VmCreated`, so the datacenter never sees a cloudlet
/// for a VM it has not started. Cloudlets without an explicit VM binding are
/// spread over the broker's VMs in round-robin submission order.
pub struct Broker {
    datacenter_id: Id,
    /// Status of every submitted VM in submission order.
    vms: IndexMap<u32, VmStatus>,
    /// Cloudlets deferred until their VM is acknowledged, keyed by VM id.
    deferred_cloudlets: HashMap<u32, Vec<CloudletSpec>>,
    results: Vec<CloudletResult>,
    round_robin_cursor: usize,
    ctx: SimulationContext,
}

impl Broker {
    pub fn new(datacenter_id: Id, ctx: SimulationContext) -> Self {
        Self {
            datacenter_id,
            vms: IndexMap::new(),
            deferred_cloudlets: HashMap::new(),
            results: Vec::new(),
            round_robin_cursor: 0,
            ctx,
        }
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    /// Requests creation of every VM in the list.
    pub fn submit_vm_list(&mut self, vm_specs: Vec<VmSpec>) {
        for spec in vm_specs {
            if self.vms.contains_key(&spec.id) {
                log_error!(self.ctx, "VM {} already submitted, skipping", spec.id);
                continue;
            }
            self.vms.insert(spec.id, VmStatus::Created);
            let vm = Vm::from_spec(&spec, self.ctx.id(), self.ctx.time());
            self.ctx.emit_now(VmCreationRequest { vm }, self.datacenter_id);
        }
    }

    /// Submits cloudlets, binding unbound ones to the broker's VMs in
    /// round-robin order. A cloudlet referencing a VM this broker never
    /// submitted is failed immediately.
    pub fn submit_cloudlet_list(&mut self, cloudlet_specs: Vec<CloudletSpec>) {
        for spec in cloudlet_specs {
            let vm_id = match spec.vm_id {
                Some(vm_id) => vm_id,
                None => match self.next_vm_round_robin() {
                    Some(vm_id) => vm_id,
                    None => {
                        log_error!(self.ctx, "no VMs to bind cloudlet {} to", spec.id);
                        self.fail_cloudlet(&spec, None);
                        continue;
                    }
                },
            };
            match self.vms.get(&vm_id) {
                None => {
                    log_error!(
                        self.ctx,
                        "cloudlet {} references VM {} not submitted by this broker",
                        spec.id,
                        vm_id
                    );
                    self.fail_cloudlet(&spec, Some(vm_id));
                }
                Some(VmStatus::Destroyed) => {
                    log_error!(self.ctx, "cloudlet {} references destroyed VM {}", spec.id, vm_id);
                    self.fail_cloudlet(&spec, Some(vm_id));
                }
                Some(VmStatus::Created) => {
                    log_debug!(self.ctx, "deferring cloudlet {} until VM {} is created", spec.id, vm_id);
                    self.deferred_cloudlets.entry(vm_id).or_default().push(spec);
                }
                Some(VmStatus::Running) => {
                    let cloudlet = Cloudlet::from_spec(&spec, self.ctx.id(), vm_id);
                    self.ctx.emit_now(CloudletSubmitRequest { cloudlet }, self.datacenter_id);
                }
            }
        }
    }

    /// Requests destruction of a previously submitted VM.
    pub fn destroy_vm(&mut self, vm_id: u32) {
        if !self.vms.contains_key(&vm_id) {
            log_error!(self.ctx, "cannot destroy VM {} not submitted by this broker", vm_id);
            return;
        }
        self.ctx.emit_now(VmDestructionRequest { vm_id }, self.datacenter_id);
    }

    /// Results collected so far, in arrival order.
    pub fn received_cloudlets(&self) -> &[CloudletResult] {
        &self.results
    }

    pub fn vm_status(&self, vm_id: u32) -> Option<VmStatus> {
        self.vms.get(&vm_id).copied()
    }

    fn next_vm_round_robin(&mut self) -> Option<u32> {
        if self.vms.is_empty() {
            return None;
        }
        let index = self.round_robin_cursor % self.vms.len();
        self.round_robin_cursor += 1;
        self.vms.get_index(index).map(|(vm_id, _)| *vm_id)
    }

    fn fail_cloudlet(&mut self, spec: &CloudletSpec, vm_id: Option<u32>) {
        self.results.push(CloudletResult {
            id: spec.id,
            status: CloudletStatus::Failed,
            datacenter_id: self.datacenter_id,
            vm_id,
            exec_time: 0.,
            start_time: -1.,
            finish_time: self.ctx.time(),
            processing_cost: 0.,
        });
    }

    fn on_vm_created(&mut self, vm_id: u32) {
        log_info!(self.ctx, "VM {} created", vm_id);
        self.vms.insert(vm_id, VmStatus::Running);
        for spec in self.deferred_cloudlets.remove(&vm_id).unwrap_or_default() {
            let cloudlet = Cloudlet::from_spec(&spec, self.ctx.id(), vm_id);
            self.ctx.emit_now(CloudletSubmitRequest { cloudlet }, self.datacenter_id);
        }
    }

    fn on_vm_creation_failed(&mut self, vm_id: u32) {
        log_warn!(self.ctx, "VM {} creation failed", vm_id);
        self.vms.insert(vm_id, VmStatus::Destroyed);
        for spec in self.deferred_cloudlets.remove(&vm_id).unwrap_or_default() {
            self.fail_cloudlet(&spec, Some(vm_id));
        }
    }

    fn on_vm_deleted(&mut self, vm_id: u32) {
        log_info!(self.ctx, "VM {} deleted", vm_id);
        self.vms.insert(vm_id, VmStatus::Destroyed);
    }

    fn on_cloudlet_return(&mut self, result: CloudletResult) {
        log_info!(
            self.ctx,
            "received cloudlet {} with status {}",
            result.id,
            result.status
        );
        self.results.push(result);
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreated { vm_id } => {
                self.on_vm_created(vm_id);
            }
            VmCreationFailed { vm_id } => {
                self.on_vm_creation_failed(vm_id);
            }
            VmDeleted { vm_id } => {
                self.on_vm_deleted(vm_id);
            }
            CloudletReturn { result } => {
                self.on_cloudlet_return(result);
            }
        })
    }
}
