//! Models of actual resource utilization of cloudlets in time.

use dyn_clone::{clone_trait_object, DynClone};

/// Returns the fraction of the requested resource actually consumed by a
/// cloudlet at the given simulation time.
pub trait UtilizationModel: DynClone {
    fn utilization(&self, time: f64) -> f64;
}

clone_trait_object!(UtilizationModel);

/// Full utilization: the cloudlet always consumes 100% of its request.
#[derive(Clone, Default)]
pub struct UtilizationModelFull;

impl UtilizationModelFull {
    pub fn new() -> Self {
        Self {}
    }
}

impl UtilizationModel for UtilizationModelFull {
    fn utilization(&self, _time: f64) -> f64 {
        1.0
    }
}

/// Constant partial utilization.
#[derive(Clone)]
pub struct UtilizationModelConstant {
    fraction: f64,
}

impl UtilizationModelConstant {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0., 1.),
        }
    }
}

impl UtilizationModel for UtilizationModelConstant {
    fn utilization(&self, _time: f64) -> f64 {
        self.fraction
    }
}
