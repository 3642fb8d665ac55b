use embedded_hal_async::delay::DelayNs;

use crate::Clock;

/// Paces one task loop at a fixed period. The await inside `tick()` is the
/// task's single suspension point per iteration.
pub struct TaskTimer<C: Clock, D: DelayNs> {
    clock: C,
    delay: D,
    period_ms: f64,
    last_wake_ms: f64,
}

impl<C: Clock, D: DelayNs> TaskTimer<C, D> {
    pub fn new(clock: C, delay: D, period_ms: f64) -> Self {
        let last_wake_ms = clock.now_ms();
        Self {
            clock,
            delay,
            period_ms,
            last_wake_ms,
        }
    }

    /// Sleeps out the remainder of the current period, then returns the
    /// measured wall time since the previous wake so integrators run on the
    /// dt that actually elapsed. An iteration that overran its period does
    /// not sleep and does not burst to make up the missed deadlines; the
    /// next period starts from the late wake.
    pub async fn tick(&mut self) -> f64 {
        let due_ms = self.last_wake_ms + self.period_ms;
        let now_ms = self.clock.now_ms();
        if now_ms < due_ms {
            self.delay.delay_us(((due_ms - now_ms) * 1000.0) as u32).await;
        }

        let woke_ms = self.clock.now_ms();
        let elapsed = woke_ms - self.last_wake_ms;
        self.last_wake_ms = woke_ms;
        elapsed
    }
}
