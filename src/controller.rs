use crate::error::{Error, Result};
use crate::events::{Behaviour, EventId, Outcome, ReferencedAction};
use crate::queue::PriorityQueue;
use crate::time::SimTime;

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use tracing::trace;

/// An event as the controller stores it: its queue key and the behaviour
/// cursor that produces its steps.
#[derive(Debug)]
struct EventRecord {
    key: SimTime,
    behaviour: Box<dyn Behaviour>,
}

/// The clock and dispatch loop of a simulation.
///
/// A controller owns every event of its simulation: behaviours are handed in
/// once and addressed by [`EventId`] from then on. The pending queue orders
/// event ids by their queue keys, and [`run_tick()`] is the sole dispatch
/// point - it runs every due event's behaviour, lets the yielded
/// [`BehaviourResult`]s reposition or retire the events, and then moves the
/// clock one tick.
///
/// A host embeds the controller by feeding its frame deltas to
/// [`run_available_ticks()`], or calls [`run_tick()`] directly for
/// deterministic stepping.
///
/// Events due at strictly different keys always run in key order. Events due
/// at the same key run in unspecified, non-stable order; don't build logic,
/// or tests, on top of it.
///
/// [`run_tick()`]: SimulationController::run_tick
/// [`run_available_ticks()`]: SimulationController::run_available_ticks
/// [`BehaviourResult`]: crate::BehaviourResult
#[derive(Debug)]
pub struct SimulationController {
    time: SimTime,
    speed: u32,
    /// Seconds received from the host but not yet converted to whole ticks.
    accumulated: f64,
    pending: PriorityQueue<SimTime, EventId>,
    events: HashMap<EventId, EventRecord>,
    next_id: u64,
}

impl SimulationController {
    /// A controller with its clock at zero and the given tick resolution,
    /// running at speed 1.
    ///
    /// # Panics
    ///
    /// Panics if `ticks_per_frame` is zero.
    pub fn new(ticks_per_frame: u32) -> Self {
        Self {
            time: SimTime::new(ticks_per_frame),
            speed: 1,
            accumulated: 0.0,
            pending: PriorityQueue::new(),
            events: HashMap::new(),
            next_id: 0,
        }
    }

    /// The current position of the simulation clock.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// The simulation speed: how many ticks each unit of host time is worth.
    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// Change the simulation speed. A speed of 0 pauses the simulation
    /// without discarding accumulated host time.
    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed;
    }

    /// Number of events currently scheduled to run.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether the given event currently sits in the pending queue.
    pub fn scheduled(&self, event: EventId) -> bool {
        self.pending.queued(event)
    }

    /// The queue key of the given event, whether or not it is scheduled.
    /// `None` for ids this controller does not know.
    pub fn key_of(&self, event: EventId) -> Option<SimTime> {
        self.events.get(&event).map(|record| record.key)
    }

    /// Register a behaviour with this controller without scheduling it,
    /// returning the handle that identifies the new event from now on.
    pub fn add_event(&mut self, behaviour: impl Behaviour + 'static) -> EventId {
        self.add_boxed(Box::new(behaviour))
    }

    /// [`add_event()`] for behaviours that are already boxed.
    ///
    /// [`add_event()`]: SimulationController::add_event
    pub fn add_boxed(&mut self, behaviour: Box<dyn Behaviour>) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.insert(
            id,
            EventRecord {
                key: self.time,
                behaviour,
            },
        );
        id
    }

    /// Register and immediately schedule a behaviour, `tick_count` ticks
    /// from now.
    pub fn schedule_new(&mut self, behaviour: impl Behaviour + 'static, tick_count: u64) -> EventId {
        let id = self.add_event(behaviour);
        self.schedule(id, tick_count);
        id
    }

    /// Schedule the event to run `tick_count` ticks from the current time.
    /// A count of 0 is legal and means the current tick.
    ///
    /// Scheduling an event that is already queued repositions it instead of
    /// duplicating it, so an event never holds more than one slot in the
    /// queue.
    ///
    /// # Panics
    ///
    /// Panics if the id was never registered with this controller.
    pub fn schedule(&mut self, event: EventId, tick_count: u64) {
        let record = self
            .events
            .get_mut(&event)
            .expect("scheduled an event this controller does not own");
        let mut key = self.time;
        key.advance(tick_count);
        record.key = key;
        trace!(%event, %key, "schedule");
        if !self.pending.update(event, key) {
            self.pending.enqueue(key, event);
        }
    }

    /// [`schedule()`] with the offset given in simulated seconds, rounded up
    /// to whole ticks.
    ///
    /// [`schedule()`]: SimulationController::schedule
    pub fn schedule_secs(&mut self, event: EventId, seconds: f64) {
        let ticks = crate::time::ticks_for(self.time.ticks_per_frame(), seconds);
        self.schedule(event, ticks);
    }

    /// Move an already-queued event to `tick_count` ticks from the current
    /// time. Returns `false`, changing nothing, if the event is not queued.
    pub fn reschedule(&mut self, event: EventId, tick_count: u64) -> bool {
        if !self.pending.queued(event) {
            return false;
        }
        self.schedule(event, tick_count);
        true
    }

    /// Remove the event from the pending queue, wherever it sits. The event
    /// stays registered and can be scheduled again later. Returns whether it
    /// was queued.
    pub fn unschedule(&mut self, event: EventId) -> bool {
        trace!(%event, "unschedule");
        self.pending.remove(event)
    }

    /// Unschedule the event and drop its stored behaviour, ending its
    /// lifetime in this controller. Returns whether the id was registered.
    pub fn remove_event(&mut self, event: EventId) -> bool {
        self.pending.remove(event);
        self.events.remove(&event).is_some()
    }

    /// Run one tick of the simulation: every event whose key precedes the
    /// current time runs its behaviour per the stepping protocol, and the
    /// clock then advances by one tick.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if a due event turns out not to be where the
    /// protocol guarantees it is - see [`Error`] for what that implies. The
    /// clock does not advance in that case.
    pub fn run_tick(&mut self) -> Result {
        loop {
            let due = match self.pending.peek() {
                Some((key, id)) if *key < self.time => id,
                _ => break,
            };
            self.run_event(due)?;
        }
        self.time.advance(1);
        Ok(())
    }

    /// Run as many ticks as the elapsed host time covers.
    ///
    /// Elapsed seconds accumulate across calls; each call converts the
    /// accumulated amount into whole ticks at the clock's resolution,
    /// retains the fractional remainder, scales the tick count by the
    /// simulation speed, and runs that many ticks. Returns the number of
    /// ticks run.
    ///
    /// # Errors
    ///
    /// Forwards the first error from [`run_tick()`], abandoning the
    /// remaining ticks of this call.
    ///
    /// [`run_tick()`]: SimulationController::run_tick
    pub fn run_available_ticks(&mut self, delta_seconds: f64) -> Result<u64> {
        self.accumulated += delta_seconds.max(0.0);
        let ticks_per_frame = f64::from(self.time.ticks_per_frame());
        let whole = (ticks_per_frame * self.accumulated).floor();
        self.accumulated -= whole / ticks_per_frame;
        let tick_count = whole as u64 * u64::from(self.speed);
        for _ in 0..tick_count {
            self.run_tick()?;
        }
        Ok(tick_count)
    }

    /// Drive one due event: step its behaviour while it continues, applying
    /// referenced side effects in yield order, then apply the final outcome
    /// to the queue.
    fn run_event(&mut self, id: EventId) -> Result {
        // withdraw the record so the behaviour can borrow the controller
        let mut record = self.events.remove(&id).ok_or(Error::MissingBehaviour(id))?;
        let outcome = loop {
            let result = record.behaviour.step(self, id);
            trace!(event = %id, %result, "step");
            match result.referenced() {
                Some(ReferencedAction::Schedule(other, delay)) => {
                    let ticks = delay.to_ticks(self.time.ticks_per_frame());
                    self.schedule(other, ticks);
                }
                Some(ReferencedAction::Unschedule(other)) => {
                    self.unschedule(other);
                }
                None => {}
            }
            if result.resets() {
                record.behaviour.reset();
            }
            match result.outcome() {
                Outcome::Continue => {}
                outcome => break outcome,
            }
        };
        match outcome {
            Outcome::Reschedule(delay) => {
                let ticks = delay.to_ticks(self.time.ticks_per_frame());
                record.key.advance(ticks);
                let key = record.key;
                self.events.insert(id, record);
                if !self.pending.update(id, key) {
                    return Err(Error::NotQueued(id));
                }
            }
            Outcome::Unschedule => {
                self.events.insert(id, record);
                if !self.pending.remove(id) {
                    return Err(Error::NotQueued(id));
                }
            }
            Outcome::Continue => unreachable!("the stepping loop only breaks on a final outcome"),
        }
        Ok(())
    }
}

impl Display for SimulationController {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "simulation at {} with {} pending events",
            self.time,
            self.pending.len()
        )
    }
}
