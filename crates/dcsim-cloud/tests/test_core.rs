use dcsim_core::{Simulation, EPSILON};

use dcsim_cloud::core::cloudlet::CloudletStatus;
use dcsim_cloud::core::common::{Allocation, AllocationVerdict};
use dcsim_cloud::core::config::{CloudletSpec, SimulationConfig, VmSpec};
use dcsim_cloud::core::vm::VmStatus;
use dcsim_cloud::simulation::CloudSimulation;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config() -> SimulationConfig {
    SimulationConfig {
        allocation_retry_period: 500.,
        vm_allocation_timeout: 2000.,
        hosts: Vec::new(),
    }
}

fn vm(id: u32, mips_per_pe: f64, pe_count: u32, ram: u64) -> VmSpec {
    VmSpec {
        id,
        mips_per_pe,
        pe_count,
        ram,
        bandwidth: 1000,
        storage: 10000,
    }
}

fn cloudlet(id: u32, length: f64, vm_id: Option<u32>) -> CloudletSpec {
    CloudletSpec {
        id,
        length,
        pes: 1,
        input_size: 300,
        output_size: 300,
        vm_id,
        cpu_utilization: None,
        ram_utilization: None,
        bw_utilization: None,
    }
}

#[test]
fn test_capacity_invariant_holds_after_every_event() {
    init_logger();
    let mut cloud = CloudSimulation::new(Simulation::new(123), config());
    cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
    // three VMs of two PEs each, only one fits the host
    cloud.submit_vm_list(vec![vm(0, 1000., 2, 2048), vm(1, 1000., 2, 1024), vm(2, 1000., 2, 1024)]);
    cloud.submit_cloudlet_list(vec![cloudlet(0, 40000., Some(0))]);

    loop {
        let more = cloud.steps(1);
        let dc = cloud.datacenter();
        let dc = dc.borrow();
        let host = dc.host(0).unwrap();
        assert!(host.total_allocated_mips() <= host.total_mips() + EPSILON);
        assert!(host.ram_available() <= host.ram_total());
        assert!(host.bandwidth_available() <= host.bandwidth_total());
        assert!(host.storage_available() <= host.storage_total());
        assert!(host.free_pes() <= 2);
        if !more {
            break;
        }
    }

    assert_eq!(cloud.vm_status(0), Some(VmStatus::Running));
    // unplaceable VMs are abandoned after the allocation timeout
    assert_eq!(cloud.vm_status(1), Some(VmStatus::Destroyed));
    assert_eq!(cloud.vm_status(2), Some(VmStatus::Destroyed));
    assert!(cloud.current_time() >= 2000.);
}

#[test]
fn test_two_saturating_vms_get_half_capacity_each() {
    init_logger();
    let mut cloud = CloudSimulation::new(Simulation::new(123), config());
    cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
    // each VM requests the full host capacity of 2000 MIPS
    cloud.submit_vm_list(vec![vm(0, 2000., 1, 1024), vm(1, 2000., 1, 1024)]);
    cloud.steps(10);

    let dc = cloud.datacenter();
    let dc = dc.borrow();
    let host = dc.host(0).unwrap();
    assert!((host.allocated_mips_for(0) - 1000.).abs() < EPSILON);
    assert!((host.allocated_mips_for(1) - 1000.).abs() < EPSILON);
}

#[test]
fn test_identical_runs_produce_identical_results() {
    init_logger();
    let run = || {
        let mut cloud = CloudSimulation::new(Simulation::new(42), config());
        cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
        cloud.submit_vm_list(vec![vm(0, 1000., 1, 512), vm(1, 1000., 1, 512)]);
        cloud.submit_cloudlet_list((0..6).map(|id| cloudlet(id, 10000. * (id + 1) as f64, None)).collect());
        cloud.run();
        cloud.cloudlet_received_list()
    };
    let first = run();
    let second = run();
    assert_eq!(first.len(), 6);
    assert_eq!(first, second);
}

#[test]
fn test_vm_destruction_releases_exactly_held_resources() {
    init_logger();
    let mut cloud = CloudSimulation::new(Simulation::new(123), config());
    cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
    cloud.submit_vm_list(vec![vm(0, 1000., 1, 512)]);
    cloud.steps(10);

    let before = {
        let dc = cloud.datacenter();
        let dc = dc.borrow();
        let host = dc.host(0).unwrap();
        (
            host.free_pes(),
            host.ram_available(),
            host.bandwidth_available(),
            host.storage_available(),
            host.total_allocated_mips(),
        )
    };

    cloud.submit_vm_list(vec![vm(1, 1000., 1, 1024)]);
    cloud.steps(10);
    {
        let dc = cloud.datacenter();
        let dc = dc.borrow();
        let host = dc.host(0).unwrap();
        assert_eq!(host.free_pes(), before.0 - 1);
        assert_eq!(host.ram_available(), before.1 - 1024);
    }

    cloud.destroy_vm(1);
    cloud.run();

    let dc = cloud.datacenter();
    let dc = dc.borrow();
    let host = dc.host(0).unwrap();
    let after = (
        host.free_pes(),
        host.ram_available(),
        host.bandwidth_available(),
        host.storage_available(),
        host.total_allocated_mips(),
    );
    assert_eq!(after, before);
}

#[test]
fn test_uncontended_cloudlet_finishes_at_length_over_rate() {
    init_logger();
    let mut cloud = CloudSimulation::new(Simulation::new(123), config());
    cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
    cloud.submit_vm_list(vec![vm(0, 1000., 1, 512)]);
    cloud.submit_cloudlet_list(vec![cloudlet(0, 40000., Some(0))]);
    cloud.run();

    let results = cloud.cloudlet_received_list();
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.status, CloudletStatus::Success);
    assert_eq!(result.start_time, 0.);
    assert!((result.finish_time - 40.).abs() < EPSILON);
    assert!((result.exec_time - 40.).abs() < EPSILON);
}

#[test]
fn test_placement_on_busy_host_rescales_only_future_progress() {
    init_logger();
    let mut cloud = CloudSimulation::new(Simulation::new(123), config());
    cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
    cloud.submit_vm_list(vec![vm(0, 2000., 1, 512)]);
    cloud.submit_cloudlet_list(vec![cloudlet(0, 40000., Some(0))]);
    cloud.step_for_duration(10.);

    // a second saturating VM halves VM 0's rate from t=10 on
    cloud.submit_vm_list(vec![vm(1, 2000., 1, 512)]);
    cloud.run();
    assert_eq!(cloud.vm_status(1), Some(VmStatus::Running));

    // 20000 MI at 2000 MIPS until t=10, the remaining 20000 MI at 1000 MIPS
    let results = cloud.cloudlet_received_list();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, CloudletStatus::Success);
    assert!((results[0].finish_time - 30.).abs() < EPSILON);
    assert!((results[0].exec_time - 30.).abs() < EPSILON);
}

#[test]
fn test_pending_vm_is_placed_after_deletion_frees_capacity() {
    init_logger();
    let mut cloud = CloudSimulation::new(Simulation::new(123), config());
    cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
    cloud.submit_vm_list(vec![vm(0, 1000., 2, 2048)]);
    cloud.steps(10);
    assert_eq!(cloud.vm_status(0), Some(VmStatus::Running));

    cloud.submit_vm_list(vec![vm(1, 1000., 2, 2048)]);
    cloud.steps(1);
    assert_eq!(cloud.vm_status(1), Some(VmStatus::Created));

    cloud.destroy_vm(0);
    cloud.run();
    assert_eq!(cloud.vm_status(0), Some(VmStatus::Destroyed));
    assert_eq!(cloud.vm_status(1), Some(VmStatus::Running));
}

#[test]
fn test_vm_destruction_fails_bound_cloudlets() {
    init_logger();
    let mut cloud = CloudSimulation::new(Simulation::new(123), config());
    cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
    cloud.submit_vm_list(vec![vm(0, 1000., 1, 512)]);
    cloud.submit_cloudlet_list(vec![cloudlet(0, 40000., Some(0))]);
    // let the cloudlet start, then kill its VM halfway through
    cloud.step_for_duration(20.);
    cloud.destroy_vm(0);
    cloud.run();

    let results = cloudlets_sorted(&cloud);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, CloudletStatus::Failed);
    assert!((results[0].finish_time - 20.).abs() < EPSILON);
}

#[test]
fn test_feasibility_check_reports_missing_host() {
    init_logger();
    let mut cloud = CloudSimulation::new(Simulation::new(123), config());
    cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
    let alloc = Allocation {
        vm_id: 0,
        pe_count: 1,
        mips_per_pe: 1000.,
        ram: 512,
        bandwidth: 1000,
        storage: 10000,
    };
    let dc = cloud.datacenter();
    let dc = dc.borrow();
    assert_eq!(dc.can_allocate(0, &alloc), AllocationVerdict::Success);
    assert_eq!(dc.can_allocate(1, &alloc), AllocationVerdict::HostNotFound);
}

#[test]
fn test_cloudlet_with_unknown_vm_reference_is_failed_immediately() {
    init_logger();
    let mut cloud = CloudSimulation::new(Simulation::new(123), config());
    cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
    cloud.submit_vm_list(vec![vm(0, 1000., 1, 512)]);
    cloud.submit_cloudlet_list(vec![cloudlet(0, 40000., Some(99)), cloudlet(1, 40000., Some(0))]);
    cloud.run();

    let results = cloudlets_sorted(&cloud);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, CloudletStatus::Failed);
    assert_eq!(results[0].vm_id, Some(99));
    // the valid cloudlet is unaffected
    assert_eq!(results[1].status, CloudletStatus::Success);
    assert!((results[1].finish_time - 40.).abs() < EPSILON);
}

#[test]
fn test_unbound_cloudlet_without_vms_is_failed_without_vm_binding() {
    init_logger();
    let mut cloud = CloudSimulation::new(Simulation::new(123), config());
    cloud.add_host(2, 1000., 4096, 10000, 1_000_000);
    // no VMs submitted, round-robin binding has nothing to pick
    cloud.submit_cloudlet_list(vec![cloudlet(0, 40000., None)]);
    cloud.run();

    let results = cloud.cloudlet_received_list();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, CloudletStatus::Failed);
    assert_eq!(results[0].vm_id, None);
}

fn cloudlets_sorted(cloud: &CloudSimulation) -> Vec<dcsim_cloud::core::cloudlet::CloudletResult> {
    let mut results = cloud.cloudlet_received_list();
    results.sort_by_key(|r| r.id);
    results
}
