//! A repair shop with one mechanic and two kinds of work:
//! routine maintenance jobs, and emergency breakdowns that
//! outrank them. A breakdown arriving while maintenance is
//! underway preempts it - the mechanic drops the routine
//! job, which parks in the facility's interrupted queue and
//! resumes once the emergency is dealt with.
//!
//! The shop floor chatter comes from a `FacilityObserver`,
//! which is where interruptions and revivals are visible as
//! such; the behaviours themselves only see their claims
//! answered with "go ahead" or "wait".

use tickdes::{
    Behaviour, BehaviourResult, EventId, Facility, FacilityObserver, SimulationController,
};

use std::cell::RefCell;
use std::rc::Rc;

const TICKS_PER_FRAME: u32 = 10;

const ROUTINE_PRIORITY: i32 = 100;
const EMERGENCY_PRIORITY: i32 = 200;

type SharedFacility = Rc<RefCell<Facility>>;

/// Narrates facility transitions to stdout.
struct ShopFloor;

impl FacilityObserver for ShopFloor {
    fn queue_enter(&mut self, event: EventId) {
        println!("    {event} gets in line");
    }

    fn queue_leave(&mut self, event: EventId) {
        println!("    {event} is next up");
    }

    fn facility_enter(&mut self, event: EventId) {
        println!("    the mechanic picks up {event}");
    }

    fn facility_interrupt(&mut self, event: EventId) {
        println!("    {event} is shoved aside!");
    }

    fn facility_leave(&mut self, event: EventId) {
        println!("    {event} is finished");
    }
}

#[derive(Debug)]
enum JobStage {
    Request,
    OnTheBench,
    Done,
}

/// One job for the mechanic, routine or emergency.
#[derive(Debug)]
struct Job {
    label: &'static str,
    priority: i32,
    work_secs: f64,
    stage: JobStage,
    mechanic: SharedFacility,
}

impl Job {
    fn new(label: &'static str, priority: i32, work_secs: f64, mechanic: &SharedFacility) -> Self {
        Self {
            label,
            priority,
            work_secs,
            stage: JobStage::Request,
            mechanic: Rc::clone(mechanic),
        }
    }
}

impl Behaviour for Job {
    fn step(&mut self, sim: &mut SimulationController, id: EventId) -> BehaviourResult {
        match self.stage {
            JobStage::Request => {
                println!("[{}] {} comes in", sim.time(), self.label);
                self.stage = JobStage::OnTheBench;
                self.mechanic.borrow_mut().claim(sim, id, self.priority)
            }
            JobStage::OnTheBench => {
                println!(
                    "[{}] work starts on {} ({:.0}s of it)",
                    sim.time(),
                    self.label,
                    self.work_secs,
                );
                self.stage = JobStage::Done;
                BehaviourResult::reschedule_secs(self.work_secs)
            }
            JobStage::Done => {
                println!("[{}] {} rolls out", sim.time(), self.label);
                self.mechanic.borrow_mut().free(sim, id);
                BehaviourResult::unschedule()
            }
        }
    }

    fn reset(&mut self) {
        self.stage = JobStage::Request;
    }
}

/// One morning at the shop: two routine jobs spaced out,
/// and a breakdown that barges in while the first one is
/// still on the bench.
fn main() {
    let mut sim = SimulationController::new(TICKS_PER_FRAME);
    let mechanic = Rc::new(RefCell::new(Facility::new(1)));
    mechanic.borrow_mut().set_observer(ShopFloor);

    sim.schedule_new(
        Job::new("the oil change", ROUTINE_PRIORITY, 30.0, &mechanic),
        1,
    );
    sim.schedule_new(
        Job::new("the tire rotation", ROUTINE_PRIORITY, 20.0, &mechanic),
        5,
    );
    let emergency = sim.add_event(Job::new(
        "the blown head gasket",
        EMERGENCY_PRIORITY,
        45.0,
        &mechanic,
    ));
    sim.schedule_secs(emergency, 10.0);

    while sim.pending() > 0 {
        sim.run_tick().expect("a healthy simulation never loses events");
    }
    println!("[{}] the shop is quiet again", sim.time());
}
