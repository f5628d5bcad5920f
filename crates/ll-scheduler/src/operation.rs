//! Suspendable operations.
//!
//! An [`Operation`] is a stack of routine frames. The innermost frame is the
//! one currently running; a routine that yields [`Yield::Await`] pushes the
//! child's frames on top of its own, and the parent only resumes once every
//! child frame has finished. The stack is walked in a loop, never by
//! recursion, so deeply nested waits do not grow the native stack.

use std::collections::VecDeque;

use async_trait::async_trait;

/// What a routine hands back when it suspends.
pub enum Yield {
    /// Suspend until the next tick.
    Tick,
    /// Suspend until `Operation` has run to completion.
    Await(Operation),
}

impl std::fmt::Debug for Yield {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tick => write!(f, "Tick"),
            Self::Await(op) => f.debug_tuple("Await").field(op).finish(),
        }
    }
}

/// Result of advancing an operation by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Progressed,
    Completed,
}

/// A synchronous step sequence.
pub trait Routine: Send {
    /// Run up to the next suspension point. `None` means the routine is finished.
    fn resume(&mut self) -> Option<Yield>;
}

/// A step sequence whose steps may wait on I/O.
///
/// Resuming one of these is itself a suspension point for whoever drives the
/// scheduler tick.
#[async_trait]
pub trait AsyncRoutine: Send {
    async fn resume(&mut self) -> Option<Yield>;
}

enum Frame {
    Sync(Box<dyn Routine>),
    Async(Box<dyn AsyncRoutine>),
}

/// A unit of work the scheduler advances one step per tick.
pub struct Operation {
    frames: Vec<Frame>,
    finished: bool,
}

impl Operation {
    pub fn new(routine: impl Routine + 'static) -> Self {
        Self {
            frames: vec![Frame::Sync(Box::new(routine))],
            finished: false,
        }
    }

    pub fn new_async(routine: impl AsyncRoutine + 'static) -> Self {
        Self {
            frames: vec![Frame::Async(Box::new(routine))],
            finished: false,
        }
    }

    /// An operation with no routine attached. Schedulers drop these on sight.
    pub fn hollow() -> Self {
        Self {
            frames: Vec::new(),
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True for an operation that never had a routine to run.
    pub fn is_hollow(&self) -> bool {
        !self.finished && self.frames.is_empty()
    }

    /// Number of nested routines currently suspended (outermost included).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether the next step needs to be awaited.
    pub fn is_async(&self) -> bool {
        matches!(self.frames.last(), Some(Frame::Async(_)))
    }

    /// Advance the innermost active routine by one step.
    ///
    /// When a child finishes, its parent is resumed within the same call, so
    /// a parent never loses a tick waiting on a child that just completed.
    pub async fn advance(&mut self) -> Progress {
        loop {
            let step = match self.frames.last_mut() {
                None => return self.complete(),
                Some(Frame::Sync(routine)) => routine.resume(),
                Some(Frame::Async(routine)) => routine.resume().await,
            };
            if let Some(progress) = self.apply(step) {
                return progress;
            }
        }
    }

    /// Advance without awaiting.
    ///
    /// Returns `None` when the innermost step is asynchronous and nothing was
    /// run; the step is left for the next awaited [`advance`](Self::advance).
    pub fn advance_now(&mut self) -> Option<Progress> {
        let mut moved = false;
        loop {
            let step = match self.frames.last_mut() {
                None => return Some(self.complete()),
                Some(Frame::Sync(routine)) => routine.resume(),
                Some(Frame::Async(_)) => {
                    return moved.then_some(Progress::Progressed);
                }
            };
            if let Some(progress) = self.apply(step) {
                return Some(progress);
            }
            moved = true;
        }
    }

    fn apply(&mut self, step: Option<Yield>) -> Option<Progress> {
        match step {
            Some(Yield::Tick) => Some(Progress::Progressed),
            Some(Yield::Await(child)) => {
                self.frames.extend(child.frames);
                Some(Progress::Progressed)
            }
            None => {
                self.frames.pop();
                if self.frames.is_empty() {
                    Some(self.complete())
                } else {
                    None
                }
            }
        }
    }

    fn complete(&mut self) -> Progress {
        self.finished = true;
        Progress::Completed
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("depth", &self.frames.len())
            .field("async", &self.is_async())
            .field("finished", &self.finished)
            .finish()
    }
}

/// Routine backed by a closure.
pub struct FnRoutine<F>(F);

pub fn routine_fn<F>(f: F) -> FnRoutine<F>
where
    F: FnMut() -> Option<Yield> + Send,
{
    FnRoutine(f)
}

impl<F> Routine for FnRoutine<F>
where
    F: FnMut() -> Option<Yield> + Send,
{
    fn resume(&mut self) -> Option<Yield> {
        (self.0)()
    }
}

type Step = Box<dyn FnOnce() -> Option<Operation> + Send>;

/// Ordered synchronous steps; each runs once and then suspends.
#[derive(Default)]
pub struct StepSequence {
    steps: VecDeque<Step>,
}

impl StepSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step that suspends until the next tick once it has run.
    pub fn then(mut self, step: impl FnOnce() + Send + 'static) -> Self {
        self.steps.push_back(Box::new(move || {
            step();
            None
        }));
        self
    }

    /// Append a step that produces a child operation to wait on.
    pub fn then_await(mut self, step: impl FnOnce() -> Operation + Send + 'static) -> Self {
        self.steps.push_back(Box::new(move || Some(step())));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Routine for StepSequence {
    fn resume(&mut self) -> Option<Yield> {
        let step = self.steps.pop_front()?;
        Some(match step() {
            Some(child) => Yield::Await(child),
            None => Yield::Tick,
        })
    }
}
