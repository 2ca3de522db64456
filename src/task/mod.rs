//! The task controller surface (spec.md §4.2): adapts spawn/await/when-all/
//! when-any into calls on the scheduler so that user code never needs to
//! touch `OperationId`s directly.

mod handle;
mod when;

pub use handle::{spawn, CancellationToken, Task};
pub use when::{when_all, when_any};
