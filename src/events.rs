use crate::controller::SimulationController;
use crate::time;

use std::fmt::{Debug, Display, Formatter};

/// Opaque handle to an event owned by a [`SimulationController`].
///
/// Handles are assigned monotonically by the controller that created the
/// event and are never reused, so they stay valid as identity even while the
/// event's queue key mutates. Authors hold handles; the controller holds the
/// events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub(crate) u64);

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

/// A span of simulated time expressed either as whole ticks or as seconds.
///
/// Seconds convert to ticks by rounding up at the clock's resolution, so any
/// positive number of seconds covers at least one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Delay {
    /// An exact number of ticks.
    Ticks(u64),
    /// Simulated seconds, rounded up to whole ticks on use.
    Secs(f64),
}

impl Delay {
    /// The smallest whole number of ticks covering this delay at the given
    /// clock resolution. Negative second amounts convert to zero.
    pub fn to_ticks(self, ticks_per_frame: u32) -> u64 {
        match self {
            Delay::Ticks(ticks) => ticks,
            Delay::Secs(seconds) => time::ticks_for(ticks_per_frame, seconds),
        }
    }

    fn is_positive(self) -> bool {
        match self {
            Delay::Ticks(ticks) => ticks > 0,
            Delay::Secs(seconds) => seconds > 0.0,
        }
    }
}

impl Display for Delay {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Delay::Ticks(ticks) => write!(f, "{ticks} ticks"),
            Delay::Secs(seconds) => write!(f, "{seconds}s"),
        }
    }
}

/// What a behaviour step decided about its own event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    /// Run the next step immediately, within the same tick.
    Continue,
    /// Suspend and resume after at least the given delay.
    Reschedule(Delay),
    /// Remove the event from the pending queue.
    Unschedule,
}

/// A side effect a behaviour step requests against a second event it
/// references but does not own.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReferencedAction {
    /// Schedule the referenced event after the given delay. A zero delay is
    /// legal here and means "this same tick".
    Schedule(EventId, Delay),
    /// Remove the referenced event from the pending queue.
    Unschedule(EventId),
}

/// The immutable value yielded by one behaviour step.
///
/// A result bundles the [`Outcome`] for the event itself with at most one
/// [`ReferencedAction`] against another event and a flag asking for the
/// behaviour cursor to be restarted. The result only describes what should
/// happen; the controller's driver applies it. Build one with the outcome
/// constructors and chain the modifiers:
///
/// ```
/// # use tickdes::{behaviours, BehaviourResult, Delay, SimulationController};
/// # let mut sim = SimulationController::new(4);
/// # let other = sim.add_event(behaviours::Inert);
/// let result = BehaviourResult::reschedule(Delay::Secs(2.5))
///     .schedule_referenced(other, Delay::Ticks(0))
///     .and_reset();
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BehaviourResult {
    outcome: Outcome,
    reset: bool,
    referenced: Option<ReferencedAction>,
}

impl BehaviourResult {
    /// Keep processing this behaviour: the next step runs immediately.
    pub fn continuing() -> Self {
        Self {
            outcome: Outcome::Continue,
            reset: false,
            referenced: None,
        }
    }

    /// Suspend this behaviour and resume it after at least `delay`.
    ///
    /// # Panics
    ///
    /// Panics unless the delay is strictly positive - a zero delay would be
    /// indistinguishable from [`continuing()`] at the scheduler.
    ///
    /// [`continuing()`]: BehaviourResult::continuing
    pub fn reschedule(delay: Delay) -> Self {
        assert!(
            delay.is_positive(),
            "an event's reschedule delay must be strictly positive"
        );
        Self {
            outcome: Outcome::Reschedule(delay),
            reset: false,
            referenced: None,
        }
    }

    /// [`reschedule()`] with a whole-tick delay.
    ///
    /// [`reschedule()`]: BehaviourResult::reschedule
    pub fn reschedule_ticks(ticks: u64) -> Self {
        Self::reschedule(Delay::Ticks(ticks))
    }

    /// [`reschedule()`] with a delay in simulated seconds.
    ///
    /// [`reschedule()`]: BehaviourResult::reschedule
    pub fn reschedule_secs(seconds: f64) -> Self {
        Self::reschedule(Delay::Secs(seconds))
    }

    /// Terminate this behaviour: the event leaves the pending queue and will
    /// only run again if something schedules it anew.
    pub fn unschedule() -> Self {
        Self {
            outcome: Outcome::Unschedule,
            reset: false,
            referenced: None,
        }
    }

    /// Ask the driver to restart the behaviour cursor from its first step
    /// once this result has been applied.
    pub fn and_reset(mut self) -> Self {
        self.reset = true;
        self
    }

    /// Additionally schedule a referenced event after `delay`. Zero is legal
    /// and means the same tick.
    pub fn schedule_referenced(mut self, event: EventId, delay: Delay) -> Self {
        self.referenced = Some(ReferencedAction::Schedule(event, delay));
        self
    }

    /// Additionally remove a referenced event from the pending queue.
    pub fn unschedule_referenced(mut self, event: EventId) -> Self {
        self.referenced = Some(ReferencedAction::Unschedule(event));
        self
    }

    /// The outcome for the event itself.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Whether the behaviour cursor should restart after this step.
    pub fn resets(&self) -> bool {
        self.reset
    }

    /// The requested side effect on a referenced event, if any.
    pub fn referenced(&self) -> Option<ReferencedAction> {
        self.referenced
    }
}

impl Display for BehaviourResult {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.outcome {
            Outcome::Continue => write!(f, "continue")?,
            Outcome::Reschedule(delay) => write!(f, "reschedule in {delay}")?,
            Outcome::Unschedule => write!(f, "unschedule")?,
        }
        match self.referenced {
            Some(ReferencedAction::Schedule(event, delay)) => {
                write!(f, " + schedule {event} in {delay}")?;
            }
            Some(ReferencedAction::Unschedule(event)) => write!(f, " + unschedule {event}")?,
            None => {}
        }
        if self.reset {
            write!(f, " + reset")?;
        }
        Ok(())
    }
}

/// The resumable logic of an event.
///
/// A behaviour is a sequence of steps that the controller's driver walks
/// through one [`BehaviourResult`] at a time: the driver keeps stepping while
/// results say [`Continue`], and suspends or terminates the event at the
/// first result that says otherwise. Suspension is purely logical - a step
/// returns, and a later tick calls `step` again, which must pick up exactly
/// where the previous step left off. Implementors therefore keep an explicit
/// cursor (typically an enum of the stages the logic moves through) rather
/// than relying on control flow.
///
/// Steps receive the owning controller so they can operate on events they
/// reference and on shared resources such as a [`Facility`], and their own id
/// so those calls can name them. The event being stepped is withdrawn from
/// the controller for the duration of the call, so a step never observes
/// itself through `sim`. A behaviour that has run to completion returns
/// [`BehaviourResult::unschedule()`].
///
/// [`Continue`]: Outcome::Continue
/// [`Facility`]: crate::Facility
pub trait Behaviour: Debug {
    /// Run the next step and report what should happen to the event.
    fn step(&mut self, sim: &mut SimulationController, self_id: EventId) -> BehaviourResult;

    /// Restore the cursor to the start of the sequence, as if the behaviour
    /// had never been stepped. Called by the driver when a step yields a
    /// result carrying [`and_reset()`].
    ///
    /// [`and_reset()`]: BehaviourResult::and_reset
    fn reset(&mut self);
}

/// Small ready-made behaviours for hosts and tests.
pub mod behaviours {
    use super::{Behaviour, BehaviourResult, EventId};
    use crate::controller::SimulationController;

    /// A behaviour with no logic: every step unschedules. Useful as a
    /// placeholder for events that only ever act as referenced targets.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Inert;

    impl Behaviour for Inert {
        fn step(&mut self, _: &mut SimulationController, _: EventId) -> BehaviourResult {
            BehaviourResult::unschedule()
        }

        fn reset(&mut self) {}
    }
}
