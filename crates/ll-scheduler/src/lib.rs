//! Cooperative scheduler: suspendable operations advanced one step per
//! external tick, with nested waits and step factories.

pub mod clock;
pub mod operation;
pub mod scheduler;
pub mod waits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use operation::{AsyncRoutine, FnRoutine, Operation, Progress, Routine, StepSequence, Yield, routine_fn};
pub use scheduler::{OperationHandle, Scheduler, SchedulerError, TickReport};
pub use waits::{WaitFor, WaitTicks, WaitUntil, wait_for, wait_ticks, wait_until};
