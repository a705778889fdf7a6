use crate::events::EventId;

/// Internal-consistency failures surfaced while driving a simulation.
///
/// Both variants describe states the scheduling protocol guarantees cannot
/// be reached: an event the queue says is due must have a stored behaviour,
/// and an event that has just run must still be addressable in the queue to
/// be repositioned or removed. Seeing either one means the kernel's
/// bookkeeping has been subverted - most plausibly by a behaviour
/// unscheduling or removing its own event through the controller instead of
/// through its returned [`BehaviourResult`]. The driver halts rather than
/// guessing at a repair; there is no retry that can succeed.
///
/// Expected negative answers - rescheduling or unscheduling an event that is
/// simply not queued - are not errors and come back as `false` from the
/// respective methods instead.
///
/// [`BehaviourResult`]: crate::BehaviourResult
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A due event was present in the pending queue but had no stored
    /// behaviour to run.
    #[error("due {0} has no stored behaviour")]
    MissingBehaviour(EventId),
    /// An event that just finished running could not be repositioned in or
    /// removed from the pending queue.
    #[error("{0} vanished from the queue while it was being run")]
    NotQueued(EventId),
}

/// [`std::result::Result`] defaulted to `Ok(())`, keeping driver signatures
/// short.
pub type Result<T = ()> = std::result::Result<T, Error>;
