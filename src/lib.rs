//! # Overview
//!
//! tickdes is a lightweight kernel for developing discrete-event simulations that advance over a
//! discrete tick clock. It is built to be embedded: a host application feeds elapsed time into the
//! kernel once per rendered frame (or steps it tick by tick), and the kernel runs whatever
//! simulation events have come due. The kernel knows nothing about rendering, wall clocks, or
//! threads.
//!
//! The pieces fit together like this:
//!
//! * [`SimTime`] is the clock coordinate - ticks grouped into frames, where one frame is one
//!   simulated second at speed 1.
//! * The [`Behaviour`] trait expresses an event's logic as a resumable sequence of steps. Each step
//!   yields a [`BehaviourResult`] telling the kernel whether to keep going this tick, suspend until
//!   later, or retire the event - optionally with a side effect on a second, referenced event.
//! * [`SimulationController`] owns the events and the clock. Its pending queue decides who runs
//!   when, and [`run_available_ticks()`] translates host frame deltas into simulation ticks.
//! * [`Facility`] models a resource with finite concurrent capacity. Claims carry priorities, and a
//!   strong enough claim preempts a weaker holder rather than waiting its turn.
//! * [`IndexedHeap`] and [`PriorityQueue`] are the queue machinery underneath the controller and
//!   the facility, exposed because simulations tend to need the same trick the kernel does:
//!   removing and re-keying entries in the middle of a heap without scanning for them.
//!
//! Expected negative answers (unscheduling something that already stopped, say) come back as plain
//! `bool`s; breaking a documented precondition panics; and the internal inconsistencies that the
//! protocol rules out surface as [`Error`] from the run methods if they somehow happen anyway.
//!
//! # Example
//!
//! A machine that cycles forever between two seconds of work and one second of cooldown:
//!
//! ```
//! use tickdes::{Behaviour, BehaviourResult, EventId, SimulationController};
//!
//! #[derive(Debug)]
//! enum Machine {
//!     Working,
//!     CoolingDown,
//! }
//!
//! impl Behaviour for Machine {
//!     fn step(&mut self, _: &mut SimulationController, _: EventId) -> BehaviourResult {
//!         match self {
//!             Machine::Working => {
//!                 *self = Machine::CoolingDown;
//!                 BehaviourResult::reschedule_secs(2.0)
//!             }
//!             Machine::CoolingDown => {
//!                 *self = Machine::Working;
//!                 BehaviourResult::reschedule_secs(1.0)
//!             }
//!         }
//!     }
//!
//!     fn reset(&mut self) {
//!         *self = Machine::Working;
//!     }
//! }
//!
//! let mut sim = SimulationController::new(10);
//! sim.schedule_new(Machine::Working, 1);
//! for _ in 0..100 {
//!     sim.run_tick().expect("a healthy simulation never loses events");
//! }
//! ```
//!
//! # Logging
//!
//! The kernel emits [`tracing`] events at `trace` level for scheduling decisions and `debug` level
//! for facility transitions. No subscriber is installed; hosts that want the output hook up their
//! own.
//!
//! [`run_available_ticks()`]: SimulationController::run_available_ticks

mod controller;
mod error;
mod events;
mod facility;
mod heap;
mod queue;
mod time;

pub use controller::SimulationController;
pub use error::{Error, Result};
pub use events::{
    behaviours, Behaviour, BehaviourResult, Delay, EventId, Outcome, ReferencedAction,
};
pub use facility::{Facility, FacilityObserver};
pub use heap::{HeapOrder, IndexedHeap, MaxHeap, MaxOrder, MinHeap, MinOrder};
pub use queue::PriorityQueue;
pub use time::SimTime;
