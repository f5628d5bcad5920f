//! Stock wait steps. All of them are synchronous routines: they check their
//! condition once per resume and suspend with [`Yield::Tick`] until it holds.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::operation::{Operation, Routine, Yield};

/// Suspends for a fixed number of ticks.
#[derive(Debug, Clone)]
pub struct WaitTicks {
    remaining: u32,
}

impl WaitTicks {
    pub fn new(ticks: u32) -> Self {
        Self { remaining: ticks }
    }
}

impl Routine for WaitTicks {
    fn resume(&mut self) -> Option<Yield> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(Yield::Tick)
    }
}

/// Suspends until the predicate returns true. The predicate is checked once per tick.
pub struct WaitUntil<P> {
    predicate: P,
}

impl<P> WaitUntil<P>
where
    P: FnMut() -> bool + Send,
{
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

impl<P> Routine for WaitUntil<P>
where
    P: FnMut() -> bool + Send,
{
    fn resume(&mut self) -> Option<Yield> {
        if (self.predicate)() {
            None
        } else {
            Some(Yield::Tick)
        }
    }
}

/// Suspends until `budget` has elapsed on `clock`, measured from the first resume.
///
/// Never sleeps; each tick only compares readings.
pub struct WaitFor {
    budget: Duration,
    clock: Arc<dyn Clock>,
    started: Option<Instant>,
}

impl WaitFor {
    pub fn new(budget: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            budget,
            clock,
            started: None,
        }
    }
}

impl Routine for WaitFor {
    fn resume(&mut self) -> Option<Yield> {
        let now = self.clock.now();
        let started = *self.started.get_or_insert(now);
        if now.saturating_duration_since(started) >= self.budget {
            None
        } else {
            Some(Yield::Tick)
        }
    }
}

pub fn wait_ticks(ticks: u32) -> Operation {
    Operation::new(WaitTicks::new(ticks))
}

pub fn wait_until<P>(predicate: P) -> Operation
where
    P: FnMut() -> bool + Send + 'static,
{
    Operation::new(WaitUntil::new(predicate))
}

pub fn wait_for(budget: Duration, clock: Arc<dyn Clock>) -> Operation {
    Operation::new(WaitFor::new(budget, clock))
}
