//! An M/M/1 queue that prints arrival and service event
//! logs to stdout. Arrival gaps are distributed with a
//! mean spacing of thirty seconds, and service times with
//! a mean spacing of twenty seconds.
//!
//! The counter itself is a capacity-1 `Facility`: each
//! customer behaviour claims it on arrival, holds it for
//! the customer's drawn service time, then frees it.
//! Whoever lost the capacity race sits unscheduled in the
//! facility's waiting queue until the counter frees up,
//! at which point the facility puts them back on the
//! simulation clock.
//!
//! A single arrivals behaviour spawns the customers with
//! exponentially distributed gaps and retires itself once
//! its quota runs out, so the simulation drains on its
//! own.

use tickdes::{Behaviour, BehaviourResult, EventId, Facility, SimulationController};

use rand::SeedableRng;
use rand_distr::{Distribution, Exp};
use rand_pcg::Pcg64;

use std::cell::RefCell;
use std::rc::Rc;

/// Ticks per simulated second; every delay in the run is
/// rounded up to this resolution.
const TICKS_PER_FRAME: u32 = 100;

type SharedFacility = Rc<RefCell<Facility>>;

/// Where a customer currently stands in its trip through
/// the store.
#[derive(Debug)]
enum Visit {
    AtTheDoor,
    BeingServed,
    Leaving,
}

/// A single customer: walk in, claim the counter (or get
/// in line), hold it for the drawn service time, then
/// leave.
#[derive(Debug)]
struct Customer {
    number: u32,
    service_secs: f64,
    visit: Visit,
    counter: SharedFacility,
}

impl Behaviour for Customer {
    fn step(&mut self, sim: &mut SimulationController, id: EventId) -> BehaviourResult {
        match self.visit {
            Visit::AtTheDoor => {
                println!(
                    "[{}] customer {} arrives ({} already in line)",
                    sim.time(),
                    self.number,
                    self.counter.borrow().waiting(),
                );
                self.visit = Visit::BeingServed;
                self.counter.borrow_mut().claim_default(sim, id)
            }
            Visit::BeingServed => {
                println!(
                    "[{}] customer {} reaches the counter for {:.1}s of service",
                    sim.time(),
                    self.number,
                    self.service_secs,
                );
                self.visit = Visit::Leaving;
                BehaviourResult::reschedule_secs(self.service_secs)
            }
            Visit::Leaving => {
                println!("[{}] customer {} leaves", sim.time(), self.number);
                self.counter.borrow_mut().free(sim, id);
                BehaviourResult::unschedule()
            }
        }
    }

    fn reset(&mut self) {
        self.visit = Visit::AtTheDoor;
    }
}

/// Spawns customers with exponential interarrival gaps
/// until its quota runs out.
#[derive(Debug)]
struct Arrivals {
    remaining: u32,
    spawned: u32,
    rng: Pcg64,
    gaps: Exp<f64>,
    services: Exp<f64>,
    counter: SharedFacility,
}

impl Behaviour for Arrivals {
    fn step(&mut self, sim: &mut SimulationController, _: EventId) -> BehaviourResult {
        self.remaining -= 1;
        self.spawned += 1;
        let customer = Customer {
            number: self.spawned,
            service_secs: self.services.sample(&mut self.rng),
            visit: Visit::AtTheDoor,
            counter: Rc::clone(&self.counter),
        };
        sim.schedule_new(customer, 0);

        if self.remaining == 0 {
            println!("[{}] the door closes behind the last arrival", sim.time());
            BehaviourResult::unschedule()
        } else {
            BehaviourResult::reschedule_secs(self.gaps.sample(&mut self.rng))
        }
    }

    fn reset(&mut self) {}
}

/// Set up a store with one counter, schedule the arrivals
/// source, and run ticks until the queue drains - events
/// print to stdout as they execute.
fn main() {
    let mut sim = SimulationController::new(TICKS_PER_FRAME);
    let counter = Rc::new(RefCell::new(Facility::new(1)));

    sim.schedule_new(
        Arrivals {
            remaining: 20,
            spawned: 0,
            rng: Pcg64::seed_from_u64(0x10CA1_C0FFEE),
            gaps: Exp::new(1.0 / 30.0).expect("rate is positive"),
            services: Exp::new(1.0 / 20.0).expect("rate is positive"),
            counter: Rc::clone(&counter),
        },
        1,
    );

    while sim.pending() > 0 {
        sim.run_tick().expect("a healthy simulation never loses events");
    }
    println!("[{}] everyone has been served", sim.time());
}
