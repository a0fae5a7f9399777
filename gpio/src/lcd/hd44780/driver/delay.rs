use std::fmt::Debug;
use std::hint::spin_loop;
use std::time::{Duration, Instant};

/// Blocking time source used for the controller's settling delays.
pub trait Delay: Debug {
    /// Blocks for at least `duration`.
    fn delay(&self, duration: Duration);
}

/// Busy-waits on the monotonic clock, never yielding to the scheduler.
#[derive(Debug, Default, Copy, Clone)]
pub struct SpinDelay;

impl Delay for SpinDelay {
    fn delay(&self, duration: Duration) {
        spin_for(duration);
    }
}

pub(crate) fn spin_for(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        spin_loop();
    }
}
