//! Synchronous finite state machine (Mealy machine).

/// A component that advances once per tick.
///
/// `next` describes the whole clocked update: every register of the component is reassigned from
/// the committed state and the input sampled this tick, holding its own value when nothing
/// changes. It never observes the next state of any other component, so the caller may evaluate
/// all components in any order and commit their results together.
pub trait Fsm: Copy {
    /// Values sampled from other components (and the outside world) this tick.
    type Input: Copy;

    /// Returns the state to commit at the end of this tick.
    #[must_use]
    fn next(&self, input: Self::Input) -> Self;
}
