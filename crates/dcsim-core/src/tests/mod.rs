use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::{cast, Event, EventHandler, Simulation};

#[derive(Clone, Serialize)]
struct Ping {
    seq: u32,
}

#[derive(Default)]
struct Recorder {
    received: Vec<(f64, u32)>,
}

impl EventHandler for Recorder {
    fn on(&mut self, event: Event) {
        let time = event.time;
        cast!(match event.data {
            Ping { seq } => {
                self.received.push((time, seq));
            }
        })
    }
}

#[test]
fn events_are_dispatched_in_time_order() {
    let mut sim = Simulation::new(42);
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    let dst = sim.add_handler("recorder", recorder.clone());
    let mut ctx = sim.create_context("source");

    ctx.emit(Ping { seq: 2 }, dst, 5.0);
    ctx.emit(Ping { seq: 0 }, dst, 1.0);
    ctx.emit(Ping { seq: 1 }, dst, 3.0);
    sim.step_until_no_events();

    assert_eq!(sim.time(), 5.0);
    assert_eq!(
        recorder.borrow().received,
        vec![(1.0, 0), (3.0, 1), (5.0, 2)]
    );
}

#[test]
fn simultaneous_events_keep_submission_order() {
    let mut sim = Simulation::new(42);
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    let dst = sim.add_handler("recorder", recorder.clone());
    let mut ctx = sim.create_context("source");

    for seq in 0..10 {
        ctx.emit(Ping { seq }, dst, 2.0);
    }
    sim.step_until_no_events();

    let seqs: Vec<u32> = recorder.borrow().received.iter().map(|(_, s)| *s).collect();
    assert_eq!(seqs, (0..10).collect::<Vec<u32>>());
}

#[test]
fn cancelled_events_are_not_delivered() {
    let mut sim = Simulation::new(42);
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    let dst = sim.add_handler("recorder", recorder.clone());
    let mut ctx = sim.create_context("source");

    ctx.emit(Ping { seq: 0 }, dst, 1.0);
    let cancelled = ctx.emit(Ping { seq: 1 }, dst, 2.0);
    ctx.emit(Ping { seq: 2 }, dst, 3.0);
    ctx.cancel_event(cancelled);
    sim.step_until_no_events();

    let seqs: Vec<u32> = recorder.borrow().received.iter().map(|(_, s)| *s).collect();
    assert_eq!(seqs, vec![0, 2]);
    assert_eq!(sim.time(), 3.0);
}

#[test]
fn step_for_duration_advances_clock_to_end_time() {
    let mut sim = Simulation::new(42);
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    let dst = sim.add_handler("recorder", recorder.clone());
    let mut ctx = sim.create_context("source");

    ctx.emit(Ping { seq: 0 }, dst, 1.0);
    ctx.emit(Ping { seq: 1 }, dst, 10.0);

    let more = sim.step_for_duration(5.0);
    assert!(more);
    assert_eq!(sim.time(), 5.0);
    assert_eq!(recorder.borrow().received.len(), 1);

    let more = sim.step_for_duration(20.0);
    assert!(!more);
    assert_eq!(sim.time(), 25.0);
    assert_eq!(recorder.borrow().received.len(), 2);
}

#[test]
fn seeded_rng_is_reproducible() {
    let mut sim1 = Simulation::new(123);
    let mut sim2 = Simulation::new(123);
    let seq1: Vec<f64> = (0..5).map(|_| sim1.rand()).collect();
    let seq2: Vec<f64> = (0..5).map(|_| sim2.rand()).collect();
    assert_eq!(seq1, seq2);
}
