//! The coroutine substrate the scheduler drives. Everything above this
//! module talks in terms of operations and choices; `runtime` is where those
//! turn into an actual resumable stack.

pub(crate) mod continuation;
