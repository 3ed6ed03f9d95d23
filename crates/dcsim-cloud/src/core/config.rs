//! Simulation configuration and plain scenario description structs.

use serde::{Deserialize, Serialize};

/// Engine-level configuration knobs.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    /// Delay before a failed VM placement is retried, in addition to the
    /// retries triggered by allocation-changing events.
    pub allocation_retry_period: f64,
    /// A VM that stays unplaced longer than this is abandoned and reported
    /// to the broker as failed.
    pub vm_allocation_timeout: f64,
    /// Hosts to create on simulation startup.
    pub hosts: Vec<HostConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            allocation_retry_period: 1.0,
            vm_allocation_timeout: 3600.0,
            hosts: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Loads configuration from a YAML file, panics on missing or malformed
    /// input since there is no sensible way to continue.
    pub fn from_file(file_name: &str) -> Self {
        serde_yaml::from_str(
            &std::fs::read_to_string(file_name)
                .unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
        .unwrap_or_else(|_| panic!("Can't parse YAML from file {}", file_name))
    }
}

/// Host description: PE count and rating plus scalar capacities.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    pub pe_count: u32,
    pub mips_per_pe: f64,
    pub ram: u64,
    pub bandwidth: u64,
    pub storage: u64,
}

/// VM resource request supplied by the caller.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VmSpec {
    pub id: u32,
    pub mips_per_pe: f64,
    pub pe_count: u32,
    pub ram: u64,
    pub bandwidth: u64,
    pub storage: u64,
}

/// Cloudlet description supplied by the caller.
///
/// `vm_id = None` leaves the VM choice to the broker, which binds such
/// cloudlets to its submitted VMs in round-robin order. Utilization
/// fractions default to full utilization when omitted.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CloudletSpec {
    pub id: u32,
    /// Total length in million instructions.
    pub length: f64,
    pub pes: u32,
    #[serde(default)]
    pub input_size: u64,
    #[serde(default)]
    pub output_size: u64,
    #[serde(default)]
    pub vm_id: Option<u32>,
    #[serde(default)]
    pub cpu_utilization: Option<f64>,
    #[serde(default)]
    pub ram_utilization: Option<f64>,
    #[serde(default)]
    pub bw_utilization: Option<f64>,
}

/// Static datacenter properties and pricing.
///
/// Pricing feeds cost accounting in cloudlet results only and never affects
/// scheduling decisions.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatacenterCharacteristics {
    pub arch: String,
    pub os: String,
    pub vmm: String,
    pub time_zone: f64,
    pub cost_per_sec: f64,
    pub cost_per_mem: f64,
    pub cost_per_storage: f64,
    pub cost_per_bw: f64,
}

impl Default for DatacenterCharacteristics {
    fn default() -> Self {
        Self {
            arch: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "Xen".to_string(),
            time_zone: 10.0,
            cost_per_sec: 3.0,
            cost_per_mem: 0.05,
            cost_per_storage: 0.1,
            cost_per_bw: 0.1,
        }
    }
}
