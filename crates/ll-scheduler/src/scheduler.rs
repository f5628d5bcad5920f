//! Tick-driven scheduler.
//!
//! The host calls [`Scheduler::tick`] once per frame (or timer interval).
//! Every registered operation is advanced exactly once per tick, in
//! registration order, and retired in the tick it completes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{trace, warn};

use crate::operation::{AsyncRoutine, Operation, Progress, Routine};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler tick is already in progress")]
    AlreadyTicking,

    #[error("Scheduler queue lock poisoned")]
    Poisoned,
}

/// Observes whether a registered operation has been retired.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    id: u64,
    done: Arc<AtomicBool>,
}

impl OperationHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    fn mark_finished(&self) {
        self.done.store(true, Ordering::Release);
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub advanced: usize,
    pub completed: usize,
    /// Entries discarded without being advanced.
    pub dropped: usize,
    /// Entries still queued after the tick, including ones registered during it.
    pub remaining: usize,
}

struct Entry {
    handle: OperationHandle,
    op: Operation,
}

#[derive(Default)]
struct Inner {
    queue: Mutex<Vec<Entry>>,
    ticking: AtomicBool,
    next_id: AtomicU64,
}

/// Cheap to clone; clones share the same queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

/// Clears the ticking flag even if the tick future is dropped halfway.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Entries taken off the queue for one tick.
///
/// Whatever has not been retired goes back to the queue when the run ends,
/// including when the tick future is dropped halfway.
struct TickRun<'a> {
    queue: &'a Mutex<Vec<Entry>>,
    survivors: Vec<Entry>,
    current: Option<Entry>,
    pending: VecDeque<Entry>,
}

impl TickRun<'_> {
    /// Put unretired entries back ahead of anything registered meanwhile.
    /// Returns the resulting queue length.
    fn restore(&mut self) -> Result<usize, SchedulerError> {
        let mut unfinished: Vec<Entry> = self.survivors.drain(..).collect();
        unfinished.extend(self.current.take());
        unfinished.extend(self.pending.drain(..));
        let (mut queue, poisoned) = match self.queue.lock() {
            Ok(queue) => (queue, false),
            Err(err) => (err.into_inner(), true),
        };
        let registered_during_tick = std::mem::replace(&mut *queue, unfinished);
        queue.extend(registered_during_tick);
        if poisoned {
            return Err(SchedulerError::Poisoned);
        }
        Ok(queue.len())
    }
}

impl Drop for TickRun<'_> {
    fn drop(&mut self) {
        if self.survivors.is_empty() && self.current.is_none() && self.pending.is_empty() {
            return;
        }
        if self.restore().is_err() {
            warn!("scheduler queue poisoned while restoring an interrupted tick");
        }
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the first step of `routine` right away, then hand it to the scheduler.
    pub fn start(&self, routine: impl Routine + 'static) -> Result<OperationHandle, SchedulerError> {
        let mut op = Operation::new(routine);
        op.advance_now();
        self.register(op)
    }

    /// Await the first step of `routine`, then hand it to the scheduler.
    pub async fn start_async(
        &self,
        routine: impl AsyncRoutine + 'static,
    ) -> Result<OperationHandle, SchedulerError> {
        let mut op = Operation::new_async(routine);
        op.advance().await;
        self.register(op)
    }

    /// Queue an operation that its owner has already advanced at least once.
    ///
    /// An operation that finished during that first advance is accepted and
    /// reported finished without being queued.
    pub fn register(&self, op: Operation) -> Result<OperationHandle, SchedulerError> {
        let handle = OperationHandle {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            done: Arc::new(AtomicBool::new(false)),
        };
        if op.is_finished() {
            handle.mark_finished();
            trace!(id = handle.id, "operation finished before registration");
            return Ok(handle);
        }
        self.lock_queue()?.push(Entry {
            handle: handle.clone(),
            op,
        });
        trace!(id = handle.id, "operation registered");
        Ok(handle)
    }

    pub fn len(&self) -> Result<usize, SchedulerError> {
        Ok(self.lock_queue()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, SchedulerError> {
        Ok(self.len()? == 0)
    }

    pub fn is_ticking(&self) -> bool {
        self.inner.ticking.load(Ordering::Acquire)
    }

    /// Advance every queued operation once.
    ///
    /// The queue lock is not held while operations run, so a step may
    /// register new operations; those are first advanced on the next tick.
    pub async fn tick(&self) -> Result<TickReport, SchedulerError> {
        if self.inner.ticking.swap(true, Ordering::AcqRel) {
            return Err(SchedulerError::AlreadyTicking);
        }
        let _guard = TickGuard(&self.inner.ticking);

        let batch = std::mem::take(&mut *self.lock_queue()?);
        let mut run = TickRun {
            queue: &self.inner.queue,
            survivors: Vec::with_capacity(batch.len()),
            current: None,
            pending: batch.into(),
        };
        let mut report = TickReport::default();

        while let Some(entry) = run.pending.pop_front() {
            if entry.op.is_hollow() {
                warn!(id = entry.handle.id, "dropping operation with no routine attached");
                entry.handle.mark_finished();
                report.dropped += 1;
                continue;
            }
            report.advanced += 1;
            let progress = run.current.insert(entry).op.advance().await;
            let Some(entry) = run.current.take() else {
                continue;
            };
            match progress {
                Progress::Completed => {
                    entry.handle.mark_finished();
                    report.completed += 1;
                    trace!(id = entry.handle.id, "operation completed");
                }
                Progress::Progressed => run.survivors.push(entry),
            }
        }

        report.remaining = run.restore()?;
        Ok(report)
    }

    /// Tick until the queue is empty or `max_ticks` ticks have run.
    /// Returns the number of ticks used.
    pub async fn run_until_idle(&self, max_ticks: usize) -> Result<usize, SchedulerError> {
        let mut ticks = 0;
        while ticks < max_ticks && !self.is_empty()? {
            self.tick().await?;
            ticks += 1;
        }
        Ok(ticks)
    }

    fn lock_queue(&self) -> Result<MutexGuard<'_, Vec<Entry>>, SchedulerError> {
        self.inner.queue.lock().map_err(|_| SchedulerError::Poisoned)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.len().ok())
            .field("ticking", &self.is_ticking())
            .finish()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
