//! VM-level time-shared apportioning of allocated MIPS among cloudlets.

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::mem;

use dcsim_core::EPSILON;

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::common::fair_share;

/// Denial of a cloudlet that requires more PEs than its VM owns.
/// The cloudlet stays queued and is retried on the next capacity recompute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub required_pes: u32,
    pub available_pes: u32,
}

impl Display for CapacityExceeded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "cloudlet requires {} PEs, VM owns {}",
            self.required_pes, self.available_pes
        )
    }
}

impl std::error::Error for CapacityExceeded {}

/// Time-shared cloudlet scheduler of one VM.
///
/// Splits the VM's currently allocated MIPS among executing cloudlets with
/// the same proportional rule used at the host level, weighted by each
/// cloudlet's PE demand and CPU utilization model. Progress is accounted
/// lazily: `update_processing` advances executed lengths over the elapsed
/// interval and predicts the next completion, so the simulation only visits
/// this VM when something can actually change.
pub struct TimeSharedCloudletScheduler {
    pe_count: u32,
    exec: Vec<Cloudlet>,
    waiting: VecDeque<Cloudlet>,
    finished: Vec<Cloudlet>,
    prev_time: f64,
}

impl TimeSharedCloudletScheduler {
    pub fn new(pe_count: u32) -> Self {
        Self {
            pe_count,
            exec: Vec::new(),
            waiting: VecDeque::new(),
            finished: Vec::new(),
            prev_time: 0.,
        }
    }

    /// Accepts a cloudlet into the waiting queue.
    ///
    /// A cloudlet demanding more PEs than the VM owns is still kept queued
    /// but reported as `CapacityExceeded`; it will be reconsidered on every
    /// capacity recompute.
    pub fn submit(&mut self, mut cloudlet: Cloudlet) -> Result<(), CapacityExceeded> {
        cloudlet.status = CloudletStatus::Queued;
        let verdict = if cloudlet.pes > self.pe_count {
            Err(CapacityExceeded {
                required_pes: cloudlet.pes,
                available_pes: self.pe_count,
            })
        } else {
            Ok(())
        };
        self.waiting.push_back(cloudlet);
        verdict
    }

    /// Advances cloudlet progress to `time` under the given allocated MIPS,
    /// completes finished cloudlets, promotes eligible queued ones and
    /// returns the delay until the next predicted completion at current
    /// rates, or `None` when nothing is running.
    pub fn update_processing(&mut self, time: f64, allocated_mips: f64) -> Option<f64> {
        let interval = time - self.prev_time;
        if interval > 0. && !self.exec.is_empty() && allocated_mips > EPSILON {
            let shares = self.shares(allocated_mips, time);
            for (cloudlet, share) in self.exec.iter_mut().zip(shares) {
                cloudlet.advance(share, interval);
            }
        }
        self.prev_time = time;

        // completions
        let mut still_running = Vec::new();
        for mut cloudlet in mem::take(&mut self.exec) {
            if cloudlet.is_finished() {
                cloudlet.status = CloudletStatus::Success;
                cloudlet.finish_time = time;
                self.finished.push(cloudlet);
            } else {
                still_running.push(cloudlet);
            }
        }
        self.exec = still_running;

        // promotions, preserving submission order among eligible cloudlets
        let mut still_waiting = VecDeque::new();
        while let Some(mut cloudlet) = self.waiting.pop_front() {
            if cloudlet.pes <= self.pe_count {
                cloudlet.status = CloudletStatus::InExec;
                if cloudlet.exec_start_time < 0. {
                    cloudlet.exec_start_time = time;
                }
                self.exec.push(cloudlet);
            } else {
                still_waiting.push_back(cloudlet);
            }
        }
        self.waiting = still_waiting;

        self.predict_next_completion(time, allocated_mips)
    }

    fn predict_next_completion(&self, time: f64, allocated_mips: f64) -> Option<f64> {
        if self.exec.is_empty() || allocated_mips <= EPSILON {
            return None;
        }
        let shares = self.shares(allocated_mips, time);
        let mut next = f64::INFINITY;
        for (cloudlet, share) in self.exec.iter().zip(shares) {
            if share > EPSILON {
                next = next.min(cloudlet.remaining() / share);
            }
        }
        next.is_finite().then_some(next.max(0.))
    }

    fn shares(&self, capacity: f64, time: f64) -> Vec<f64> {
        let per_pe = capacity / self.pe_count as f64;
        let requests: Vec<f64> = self
            .exec
            .iter()
            .map(|c| per_pe * c.pes as f64 * c.cpu_utilization(time))
            .collect();
        fair_share(capacity, &requests)
    }

    /// Removes and returns cloudlets finished since the last drain.
    pub fn drain_finished(&mut self) -> Vec<Cloudlet> {
        mem::take(&mut self.finished)
    }

    /// Fails every bound cloudlet, e.g. on VM destruction, and returns them.
    pub fn fail_all(&mut self, time: f64) -> Vec<Cloudlet> {
        let mut failed: Vec<Cloudlet> = mem::take(&mut self.exec);
        failed.extend(mem::take(&mut self.waiting));
        for cloudlet in failed.iter_mut() {
            cloudlet.status = CloudletStatus::Failed;
            cloudlet.finish_time = time;
        }
        failed
    }

    pub fn status(&self, cloudlet_id: u32) -> Option<CloudletStatus> {
        self.exec
            .iter()
            .chain(self.waiting.iter())
            .chain(self.finished.iter())
            .find(|c| c.id == cloudlet_id)
            .map(|c| c.status)
    }

    pub fn is_idle(&self) -> bool {
        self.exec.is_empty() && self.waiting.is_empty()
    }

    pub fn running_count(&self) -> usize {
        self.exec.len()
    }

    pub fn queued_count(&self) -> usize {
        self.waiting.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utilization_model::UtilizationModelFull;

    fn cloudlet(id: u32, length: f64, pes: u32) -> Cloudlet {
        Cloudlet::new(
            id,
            0,
            length,
            pes,
            300,
            300,
            0,
            Box::new(UtilizationModelFull::new()),
            Box::new(UtilizationModelFull::new()),
            Box::new(UtilizationModelFull::new()),
        )
    }

    #[test]
    fn single_cloudlet_finishes_at_length_over_rate() {
        let mut sched = TimeSharedCloudletScheduler::new(1);
        sched.submit(cloudlet(0, 40000., 1)).unwrap();
        let next = sched.update_processing(0., 1000.).unwrap();
        assert!((next - 40.).abs() < 1e-9);
        let next = sched.update_processing(40., 1000.);
        assert!(next.is_none());
        let finished = sched.drain_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].status, CloudletStatus::Success);
        assert_eq!(finished[0].finish_time, 40.);
    }

    #[test]
    fn concurrent_cloudlets_share_mips_equally() {
        let mut sched = TimeSharedCloudletScheduler::new(1);
        for id in 0..2 {
            sched.submit(cloudlet(id, 1000., 1)).unwrap();
        }
        // two equal cloudlets at 1000 MIPS: each runs at 500, finishes at t=2
        let next = sched.update_processing(0., 1000.).unwrap();
        assert!((next - 2.).abs() < 1e-9);
        sched.update_processing(2., 1000.);
        assert_eq!(sched.drain_finished().len(), 2);
    }

    #[test]
    fn oversized_cloudlet_stays_queued() {
        let mut sched = TimeSharedCloudletScheduler::new(1);
        let err = sched.submit(cloudlet(0, 1000., 2)).unwrap_err();
        assert_eq!(
            err,
            CapacityExceeded {
                required_pes: 2,
                available_pes: 1
            }
        );
        assert!(sched.update_processing(0., 1000.).is_none());
        assert_eq!(sched.queued_count(), 1);
        assert_eq!(sched.status(0), Some(CloudletStatus::Queued));
    }

    #[test]
    fn partial_utilization_slows_progress() {
        let mut sched = TimeSharedCloudletScheduler::new(1);
        let mut c = cloudlet(0, 1000., 1);
        c = Cloudlet::new(
            c.id,
            0,
            c.length,
            c.pes,
            300,
            300,
            0,
            Box::new(crate::core::utilization_model::UtilizationModelConstant::new(0.5)),
            Box::new(UtilizationModelFull::new()),
            Box::new(UtilizationModelFull::new()),
        );
        sched.submit(c).unwrap();
        // at 50% utilization of 1000 MIPS, the 1000 MI cloudlet needs 2 seconds
        let next = sched.update_processing(0., 1000.).unwrap();
        assert!((next - 2.).abs() < 1e-9);
    }
}
