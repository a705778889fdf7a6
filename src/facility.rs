use crate::controller::SimulationController;
use crate::events::{BehaviourResult, EventId};
use crate::queue::PriorityQueue;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Formatter};

use tracing::debug;

/// Ordering key for claims: stronger claims sort first.
///
/// Larger priority numbers are stronger. The event id breaks ties so the key
/// is total; equal-priority claims still surface in an unspecified order
/// relative to their arrival. This one ordering governs the in-use set and
/// both internal queues, so "weakest inside" and "next to revive" can never
/// disagree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct ClaimKey {
    priority: i32,
    event: EventId,
}

impl Ord for ClaimKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.event.cmp(&other.event))
    }
}

impl PartialOrd for ClaimKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Which of the three collections currently holds a tracked event.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Slot {
    Inside,
    Waiting,
    Interrupted,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    priority: i32,
    slot: Slot,
}

/// Receiver for the lifecycle notifications of a [`Facility`].
///
/// Every method defaults to doing nothing, so implementors override only the
/// transitions they care about. Each notification fires exactly once per
/// matching transition within one event's claim lifetime.
pub trait FacilityObserver {
    /// The event lost the capacity race and joined the waiting queue.
    #[allow(unused_variables)]
    fn queue_enter(&mut self, event: EventId) {}

    /// The event left the waiting queue because capacity opened up.
    #[allow(unused_variables)]
    fn queue_leave(&mut self, event: EventId) {}

    /// The event's claim became active: on admission at claim time, on
    /// revival after an interruption, or on leaving the waiting queue.
    #[allow(unused_variables)]
    fn facility_enter(&mut self, event: EventId) {}

    /// A stronger claim preempted this event out of the facility.
    #[allow(unused_variables)]
    fn facility_interrupt(&mut self, event: EventId) {}

    /// The event gave up its active claim.
    #[allow(unused_variables)]
    fn facility_leave(&mut self, event: EventId) {}
}

/// A resource with finite concurrent capacity that events claim and free.
///
/// Claims carry an integer priority; larger numbers are stronger. A claim
/// against a full facility either queues behind the current holders or, if
/// it outranks the weakest of them, preempts that holder: the victim is
/// pulled out of the controller's pending queue and parked until capacity
/// opens up again. Freed capacity always revives interrupted holders before
/// admitting anyone from the waiting queue, so a preempted event can't be
/// starved by a stream of new claimants.
///
/// The facility tracks each claiming event in exactly one of three places,
/// active (*inside*), *waiting*, or *interrupted*, from claim to free. The
/// caller-facing surface is just [`claim()`] and [`free()`]; both return the
/// [`BehaviourResult`] the claiming behaviour should yield, which is how the
/// facility and the scheduler stay in step: a queued claimant is unscheduled
/// until the facility itself schedules it back in.
///
/// A facility does not hold a reference to its controller; pass the
/// controller into each call. Using one facility with two controllers is a
/// logical error the facility cannot detect.
///
/// [`claim()`]: Facility::claim
/// [`free()`]: Facility::free
pub struct Facility {
    capacity: usize,
    inside: BTreeSet<ClaimKey>,
    waiting: PriorityQueue<ClaimKey, EventId>,
    interrupted: PriorityQueue<ClaimKey, EventId>,
    entries: HashMap<EventId, Entry>,
    observer: Option<Box<dyn FacilityObserver>>,
}

impl Facility {
    /// Claim priority used by [`claim_default()`].
    ///
    /// [`claim_default()`]: Facility::claim_default
    pub const DEFAULT_PRIORITY: i32 = 100;

    /// A facility with the given concurrent capacity and no observer.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "facility capacity cannot be less than 1");
        Self {
            capacity,
            inside: BTreeSet::new(),
            waiting: PriorityQueue::new(),
            interrupted: PriorityQueue::new(),
            entries: HashMap::new(),
            observer: None,
        }
    }

    /// Install the observer receiving this facility's lifecycle
    /// notifications, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl FacilityObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// The facility's total concurrent capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of currently active claims.
    pub fn in_use(&self) -> usize {
        self.inside.len()
    }

    /// Number of events waiting for their first admission.
    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Number of preempted events waiting to be revived.
    pub fn interrupted(&self) -> usize {
        self.interrupted.len()
    }

    /// Whether the event currently holds a claim against this facility, in
    /// any of the three collections.
    pub fn tracks(&self, event: EventId) -> bool {
        self.entries.contains_key(&event)
    }

    /// [`claim()`] at [`DEFAULT_PRIORITY`].
    ///
    /// [`claim()`]: Facility::claim
    /// [`DEFAULT_PRIORITY`]: Facility::DEFAULT_PRIORITY
    pub fn claim_default(
        &mut self,
        sim: &mut SimulationController,
        event: EventId,
    ) -> BehaviourResult {
        self.claim(sim, event, Self::DEFAULT_PRIORITY)
    }

    /// Claim one capacity slot for the event.
    ///
    /// Returns the result the claiming behaviour should yield:
    /// [`continuing()`] when the claim is active - immediately, or after
    /// preempting a weaker holder - and [`unschedule()`] when the event must
    /// wait, in which case the facility schedules the event again once its
    /// claim activates and the behaviour resumes at its next step.
    ///
    /// # Panics
    ///
    /// Panics if the event already holds a claim against this facility.
    ///
    /// [`continuing()`]: BehaviourResult::continuing
    /// [`unschedule()`]: BehaviourResult::unschedule
    pub fn claim(
        &mut self,
        sim: &mut SimulationController,
        event: EventId,
        priority: i32,
    ) -> BehaviourResult {
        assert!(
            !self.entries.contains_key(&event),
            "event is already within the facility"
        );

        let key = ClaimKey { priority, event };
        if self.inside.len() < self.capacity {
            self.admit(key);
            return BehaviourResult::continuing();
        }

        let weakest = *self
            .inside
            .iter()
            .next_back()
            .expect("a full facility has at least one active claim");
        if weakest.priority >= priority {
            // lost the capacity race; wait unscheduled until revived
            self.waiting.enqueue(key, event);
            self.entries.insert(
                event,
                Entry {
                    priority,
                    slot: Slot::Waiting,
                },
            );
            debug!(%event, priority, "facility claim queued");
            if let Some(observer) = self.observer.as_deref_mut() {
                observer.queue_enter(event);
            }
            return BehaviourResult::unschedule();
        }

        // the newcomer outranks the weakest holder: interrupt it
        sim.unschedule(weakest.event);
        self.inside.remove(&weakest);
        self.interrupted.enqueue(weakest, weakest.event);
        self.entries.insert(
            weakest.event,
            Entry {
                priority: weakest.priority,
                slot: Slot::Interrupted,
            },
        );
        debug!(victim = %weakest.event, by = %event, "facility claim preempted");
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.facility_interrupt(weakest.event);
        }

        self.admit(key);
        BehaviourResult::continuing()
    }

    /// Give up the event's claim, wherever it currently stands - an event
    /// may free before its claim ever activated.
    ///
    /// Any capacity this opens goes to preempted holders first, in priority
    /// order, then to the waiting queue. Each revived event is scheduled for
    /// the current tick so it can carry on with the work its claim was for.
    /// Always returns [`continuing()`].
    ///
    /// # Panics
    ///
    /// Panics if the event holds no claim against this facility.
    ///
    /// [`continuing()`]: BehaviourResult::continuing
    pub fn free(&mut self, sim: &mut SimulationController, event: EventId) -> BehaviourResult {
        let entry = self
            .entries
            .remove(&event)
            .expect("event is not within the facility");
        debug!(%event, "facility free");

        match entry.slot {
            Slot::Inside => {
                self.inside.remove(&ClaimKey {
                    priority: entry.priority,
                    event,
                });
                if let Some(observer) = self.observer.as_deref_mut() {
                    observer.facility_leave(event);
                }
            }
            Slot::Waiting => {
                self.waiting.remove(event);
            }
            Slot::Interrupted => {
                self.interrupted.remove(event);
            }
        }

        // revive interrupted holders before admitting new waiters
        while self.inside.len() < self.capacity && !self.interrupted.is_empty() {
            let (key, revived) = self.interrupted.dequeue();
            self.admit(key);
            sim.schedule(revived, 0);
        }

        while self.inside.len() < self.capacity && !self.waiting.is_empty() {
            let (key, admitted) = self.waiting.dequeue();
            if let Some(observer) = self.observer.as_deref_mut() {
                observer.queue_leave(admitted);
            }
            self.admit(key);
            sim.schedule(admitted, 0);
        }

        BehaviourResult::continuing()
    }

    /// Activate a claim: move the entry inside and notify.
    fn admit(&mut self, key: ClaimKey) {
        self.inside.insert(key);
        self.entries.insert(
            key.event,
            Entry {
                priority: key.priority,
                slot: Slot::Inside,
            },
        );
        debug!(event = %key.event, priority = key.priority, "facility enter");
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.facility_enter(key.event);
        }
    }
}

impl Debug for Facility {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("Facility")
            .field("capacity", &self.capacity)
            .field("inside", &self.inside)
            .field("waiting", &self.waiting.len())
            .field("interrupted", &self.interrupted.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::behaviours::Inert;
    use crate::events::Outcome;

    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every notification with the event it concerned.
    #[derive(Clone, Default)]
    struct Recorder {
        transitions: Rc<RefCell<Vec<(&'static str, EventId)>>>,
    }

    impl FacilityObserver for Recorder {
        fn queue_enter(&mut self, event: EventId) {
            self.transitions.borrow_mut().push(("queue_enter", event));
        }

        fn queue_leave(&mut self, event: EventId) {
            self.transitions.borrow_mut().push(("queue_leave", event));
        }

        fn facility_enter(&mut self, event: EventId) {
            self.transitions.borrow_mut().push(("facility_enter", event));
        }

        fn facility_interrupt(&mut self, event: EventId) {
            self.transitions.borrow_mut().push(("facility_interrupt", event));
        }

        fn facility_leave(&mut self, event: EventId) {
            self.transitions.borrow_mut().push(("facility_leave", event));
        }
    }

    fn controller_with_events(count: usize) -> (SimulationController, Vec<EventId>) {
        let mut sim = SimulationController::new(4);
        let ids = (0..count).map(|_| sim.schedule_new(Inert, 1)).collect();
        (sim, ids)
    }

    #[test]
    fn claims_admit_until_capacity_is_reached() {
        let (mut sim, ids) = controller_with_events(3);
        let mut facility = Facility::new(2);

        assert_eq!(
            facility.claim(&mut sim, ids[0], 100).outcome(),
            Outcome::Continue
        );
        assert_eq!(
            facility.claim(&mut sim, ids[1], 100).outcome(),
            Outcome::Continue
        );
        assert_eq!(facility.in_use(), 2);

        assert_eq!(
            facility.claim(&mut sim, ids[2], 100).outcome(),
            Outcome::Unschedule
        );
        assert_eq!(facility.waiting(), 1);
    }

    #[test]
    fn capacity_one_gives_mutual_exclusion() {
        let (mut sim, ids) = controller_with_events(2);
        let (a, b) = (ids[0], ids[1]);
        let mut facility = Facility::new(1);

        assert_eq!(facility.claim(&mut sim, a, 100).outcome(), Outcome::Continue);
        assert_eq!(
            facility.claim(&mut sim, b, 100).outcome(),
            Outcome::Unschedule
        );
        assert_eq!(facility.waiting(), 1);

        sim.unschedule(b); // what the driver does with the Unschedule result
        facility.free(&mut sim, a);

        assert_eq!(facility.in_use(), 1);
        assert!(facility.tracks(b));
        assert!(sim.scheduled(b), "the admitted waiter is revived this tick");
        assert_eq!(sim.key_of(b), Some(sim.time()));
    }

    #[test]
    fn stronger_claims_preempt_the_weakest_holder() {
        let (mut sim, ids) = controller_with_events(2);
        let (a, b) = (ids[0], ids[1]);
        let mut facility = Facility::new(1);

        facility.claim(&mut sim, a, 100);
        assert!(sim.scheduled(a));

        assert_eq!(facility.claim(&mut sim, b, 200).outcome(), Outcome::Continue);
        assert!(!sim.scheduled(a), "the victim is pulled from the queue");
        assert_eq!(facility.interrupted(), 1);
        assert_eq!(facility.in_use(), 1);

        facility.free(&mut sim, b);
        assert!(sim.scheduled(a), "the victim is revived this tick");
        assert_eq!(sim.key_of(a), Some(sim.time()));
        assert_eq!(facility.in_use(), 1);
        assert_eq!(facility.interrupted(), 0);
    }

    #[test]
    fn equal_priority_does_not_preempt() {
        let (mut sim, ids) = controller_with_events(2);
        let mut facility = Facility::new(1);

        facility.claim(&mut sim, ids[0], 100);
        assert_eq!(
            facility.claim(&mut sim, ids[1], 100).outcome(),
            Outcome::Unschedule
        );
        assert_eq!(facility.interrupted(), 0);
        assert_eq!(facility.waiting(), 1);
    }

    #[test]
    fn interrupted_holders_revive_before_waiters() {
        let (mut sim, ids) = controller_with_events(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        let mut facility = Facility::new(1);

        facility.claim(&mut sim, a, 100);
        // c preempts a
        facility.claim(&mut sim, c, 200);
        // b cannot outrank c, so it waits
        facility.claim(&mut sim, b, 150);
        sim.unschedule(b);

        assert_eq!(facility.interrupted(), 1);
        assert_eq!(facility.waiting(), 1);

        facility.free(&mut sim, c);
        // a (interrupted) is revived even though b (waiting) is stronger
        assert!(sim.scheduled(a));
        assert!(!sim.scheduled(b));
        assert_eq!(facility.interrupted(), 0);
        assert_eq!(facility.waiting(), 1);

        facility.free(&mut sim, a);
        assert!(sim.scheduled(b));
        assert_eq!(facility.waiting(), 0);
    }

    #[test]
    fn waiters_admit_in_descending_priority_order() {
        let (mut sim, ids) = controller_with_events(4);
        let mut facility = Facility::new(1);

        facility.claim(&mut sim, ids[0], 500);
        for (event, priority) in [(ids[1], 10), (ids[2], 30), (ids[3], 20)] {
            facility.claim(&mut sim, event, priority);
            sim.unschedule(event);
        }

        facility.free(&mut sim, ids[0]);
        assert!(sim.scheduled(ids[2]), "strongest waiter admitted first");
        assert!(!sim.scheduled(ids[1]));
        assert!(!sim.scheduled(ids[3]));
    }

    #[test]
    fn freeing_before_admission_abandons_the_wait() {
        let (mut sim, ids) = controller_with_events(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        let mut facility = Facility::new(1);

        facility.claim(&mut sim, a, 100);
        facility.claim(&mut sim, b, 100);
        sim.unschedule(b);
        facility.claim(&mut sim, c, 100);
        sim.unschedule(c);

        // b gives up without ever having been admitted
        facility.free(&mut sim, b);
        assert!(!facility.tracks(b));
        assert_eq!(facility.waiting(), 1);
        assert_eq!(facility.in_use(), 1, "a still holds its claim");

        facility.free(&mut sim, a);
        assert!(sim.scheduled(c));
    }

    #[test]
    fn hooks_fire_once_per_transition() {
        let (mut sim, ids) = controller_with_events(2);
        let (a, b) = (ids[0], ids[1]);
        let mut facility = Facility::new(1);
        let recorder = Recorder::default();
        let transitions = Rc::clone(&recorder.transitions);
        facility.set_observer(recorder);

        facility.claim(&mut sim, a, 100);
        facility.claim(&mut sim, b, 200);
        facility.free(&mut sim, b);
        facility.free(&mut sim, a);

        assert_eq!(
            *transitions.borrow(),
            vec![
                ("facility_enter", a),
                ("facility_interrupt", a),
                ("facility_enter", b),
                ("facility_leave", b),
                ("facility_enter", a),
                ("facility_leave", a),
            ]
        );
    }

    #[test]
    fn queue_hooks_bracket_a_wait() {
        let (mut sim, ids) = controller_with_events(2);
        let (a, b) = (ids[0], ids[1]);
        let mut facility = Facility::new(1);
        let recorder = Recorder::default();
        let transitions = Rc::clone(&recorder.transitions);
        facility.set_observer(recorder);

        facility.claim(&mut sim, a, 100);
        facility.claim(&mut sim, b, 100);
        sim.unschedule(b);
        facility.free(&mut sim, a);

        assert_eq!(
            *transitions.borrow(),
            vec![
                ("facility_enter", a),
                ("queue_enter", b),
                ("facility_leave", a),
                ("queue_leave", b),
                ("facility_enter", b),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "already within the facility")]
    fn double_claim_is_fatal() {
        let (mut sim, ids) = controller_with_events(1);
        let mut facility = Facility::new(1);
        facility.claim(&mut sim, ids[0], 100);
        facility.claim(&mut sim, ids[0], 100);
    }

    #[test]
    #[should_panic(expected = "not within the facility")]
    fn freeing_an_untracked_event_is_fatal() {
        let (mut sim, ids) = controller_with_events(1);
        let mut facility = Facility::new(1);
        facility.free(&mut sim, ids[0]);
    }

    #[test]
    #[should_panic(expected = "cannot be less than 1")]
    fn zero_capacity_is_fatal() {
        Facility::new(0);
    }
}
