//! Facade wiring one datacenter and one broker on top of the engine.

use std::cell::RefCell;
use std::rc::Rc;

use sugars::{rc, refcell};

use dcsim_core::Simulation;

use crate::core::broker::Broker;
use crate::core::cloudlet::CloudletResult;
use crate::core::config::{CloudletSpec, DatacenterCharacteristics, HostConfig, SimulationConfig, VmSpec};
use crate::core::datacenter::Datacenter;
use crate::core::vm::VmStatus;
use crate::core::vm_allocation_policy::{FirstFit, VmAllocationPolicy};

/// Entry point of a cloud simulation: owns the engine, one datacenter and
/// one broker, and forwards scenario submission and queries to them.
pub struct CloudSimulation {
    datacenter: Rc<RefCell<Datacenter>>,
    broker: Rc<RefCell<Broker>>,
    sim: Simulation,
}

impl CloudSimulation {
    /// Creates a simulation with the default first-fit placement policy.
    pub fn new(sim: Simulation, config: SimulationConfig) -> Self {
        Self::with_policy(sim, config, Box::new(FirstFit::new()))
    }

    pub fn with_policy(
        mut sim: Simulation,
        config: SimulationConfig,
        vm_allocation_policy: Box<dyn VmAllocationPolicy>,
    ) -> Self {
        let config = rc!(config);
        let datacenter = rc!(refcell!(Datacenter::new(
            DatacenterCharacteristics::default(),
            vm_allocation_policy,
            config.clone(),
            sim.create_context("datacenter"),
        )));
        let datacenter_id = sim.add_handler("datacenter", datacenter.clone());
        let broker = rc!(refcell!(Broker::new(datacenter_id, sim.create_context("broker"))));
        sim.add_handler("broker", broker.clone());
        Self {
            datacenter,
            broker,
            sim,
        }
    }

    /// Creates a host in the datacenter and returns its id.
    pub fn add_host(&mut self, pe_count: u32, mips_per_pe: f64, ram: u64, bandwidth: u64, storage: u64) -> u32 {
        self.datacenter.borrow_mut().add_host(&HostConfig {
            pe_count,
            mips_per_pe,
            ram,
            bandwidth,
            storage,
        })
    }

    pub fn submit_vm_list(&mut self, vm_specs: Vec<VmSpec>) {
        self.broker.borrow_mut().submit_vm_list(vm_specs);
    }

    pub fn submit_cloudlet_list(&mut self, cloudlet_specs: Vec<CloudletSpec>) {
        self.broker.borrow_mut().submit_cloudlet_list(cloudlet_specs);
    }

    pub fn destroy_vm(&mut self, vm_id: u32) {
        self.broker.borrow_mut().destroy_vm(vm_id);
    }

    /// Runs the simulation until there are no pending events left.
    pub fn run(&mut self) {
        self.sim.step_until_no_events();
    }

    /// Cancels all pending events, stopping the simulation where it stands.
    pub fn stop(&mut self) {
        self.sim.cancel_events(|_| true);
    }

    /// Results of finished and failed cloudlets in arrival order.
    pub fn cloudlet_received_list(&self) -> Vec<CloudletResult> {
        self.broker.borrow().received_cloudlets().to_vec()
    }

    pub fn vm_status(&self, vm_id: u32) -> Option<VmStatus> {
        self.datacenter.borrow().vm_status(vm_id)
    }

    pub fn datacenter(&self) -> Rc<RefCell<Datacenter>> {
        self.datacenter.clone()
    }

    pub fn broker(&self) -> Rc<RefCell<Broker>> {
        self.broker.clone()
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.sim.step_for_duration(duration)
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }
}
