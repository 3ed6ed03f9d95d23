//! Shared types of the cloud model.

use serde::Serialize;

use dcsim_core::EPSILON;

/// Resource request of one VM, used for placement feasibility checks and
/// host-side bookkeeping.
#[derive(Serialize, Clone, Debug)]
pub struct Allocation {
    pub vm_id: u32,
    pub pe_count: u32,
    pub mips_per_pe: f64,
    pub ram: u64,
    pub bandwidth: u64,
    pub storage: u64,
}

impl Allocation {
    /// Total MIPS rate requested across all PEs.
    pub fn requested_mips(&self) -> f64 {
        self.pe_count as f64 * self.mips_per_pe
    }
}

/// Outcome of a placement feasibility check.
///
/// All four resource dimensions are checked together; the verdict names the
/// first dimension that failed, and nothing is committed on failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AllocationVerdict {
    Success,
    NotEnoughPes,
    NotEnoughRam,
    NotEnoughBandwidth,
    NotEnoughStorage,
    HostNotFound,
}

/// Proportional time-share rule used by both scheduler levels.
///
/// If the requests fit into the capacity, each claimant gets its full
/// request; otherwise every request is scaled by `capacity / total`.
pub fn fair_share(capacity: f64, requests: &[f64]) -> Vec<f64> {
    let total: f64 = requests.iter().sum();
    if total <= capacity + EPSILON {
        requests.to_vec()
    } else {
        let scale = capacity / total;
        requests.iter().map(|r| r * scale).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::fair_share;

    #[test]
    fn requests_within_capacity_are_granted_in_full() {
        assert_eq!(fair_share(1000., &[400., 600.]), vec![400., 600.]);
    }

    #[test]
    fn contended_requests_are_scaled_proportionally() {
        let shares = fair_share(1000., &[1000., 1000.]);
        assert_eq!(shares, vec![500., 500.]);

        let shares = fair_share(900., &[600., 1200.]);
        assert!((shares[0] - 300.).abs() < 1e-9);
        assert!((shares[1] - 600.).abs() < 1e-9);
    }

    #[test]
    fn empty_request_set_yields_no_shares() {
        assert!(fair_share(1000., &[]).is_empty());
    }
}
