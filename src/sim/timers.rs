//! Simulation-time timers
//!
//! Timers advance only when the session steps, so pausing freezes them
//! mid-period and resuming continues where they left off.

/// Cap on how many intervals one advance may fire
pub const MAX_TIMER_CATCHUP: u32 = 4;

/// Repeating timer with an optional period (None = disabled)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalTimer {
    period_ms: Option<f64>,
    elapsed_ms: f64,
}

impl IntervalTimer {
    pub fn every(period_ms: f64) -> Self {
        let mut timer = Self::default();
        timer.set_period(Some(period_ms));
        timer
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Change the period and restart the current interval
    pub fn set_period(&mut self, period_ms: Option<f64>) {
        self.period_ms = period_ms.filter(|p| p.is_finite() && *p > 0.0);
        self.elapsed_ms = 0.0;
    }

    pub fn period_ms(&self) -> Option<f64> {
        self.period_ms
    }

    pub fn is_enabled(&self) -> bool {
        self.period_ms.is_some()
    }

    /// Advance by `dt_ms`, returning how many times the timer fired
    pub fn advance(&mut self, dt_ms: f64) -> u32 {
        let Some(period) = self.period_ms else {
            return 0;
        };
        self.elapsed_ms += dt_ms;
        let mut fired = 0;
        while self.elapsed_ms >= period && fired < MAX_TIMER_CATCHUP {
            self.elapsed_ms -= period;
            fired += 1;
        }
        if self.elapsed_ms >= period {
            // Drop the backlog instead of bursting on later steps
            self.elapsed_ms %= period;
        }
        fired
    }

    pub fn reset(&mut self) {
        self.elapsed_ms = 0.0;
    }
}

/// One-shot tasks due at a simulation time
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now_ms: f64,
    next_seq: u64,
    pending: Vec<(f64, u64, T)>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now_ms: 0.0,
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn schedule(&mut self, delay_ms: f64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push((self.now_ms + delay_ms.max(0.0), seq, task));
    }

    /// Advance the clock and take every task now due, earliest first
    pub fn advance(&mut self, dt_ms: f64) -> Vec<T> {
        self.now_ms += dt_ms;
        let now = self.now_ms;
        let mut due: Vec<(f64, u64, T)> = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].0 <= now {
                due.push(self.pending.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        due.into_iter().map(|(_, _, task)| task).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_fires_on_period() {
        let mut timer = IntervalTimer::every(1000.0);
        assert_eq!(timer.advance(999.0), 0);
        assert_eq!(timer.advance(1.0), 1);
        assert_eq!(timer.advance(500.0), 0);
        assert_eq!(timer.advance(1500.0), 1);
    }

    #[test]
    fn test_disabled_never_fires() {
        let mut timer = IntervalTimer::disabled();
        assert_eq!(timer.advance(1e9), 0);
        timer.set_period(Some(0.0));
        assert!(!timer.is_enabled());
    }

    #[test]
    fn test_catchup_is_capped() {
        let mut timer = IntervalTimer::every(100.0);
        assert_eq!(timer.advance(10_000.0), MAX_TIMER_CATCHUP);
        // Backlog dropped
        assert_eq!(timer.advance(0.0), 0);
        assert_eq!(timer.advance(100.0), 1);
    }

    #[test]
    fn test_set_period_restarts_interval() {
        let mut timer = IntervalTimer::every(1000.0);
        timer.advance(900.0);
        timer.set_period(Some(500.0));
        assert_eq!(timer.advance(400.0), 0);
        assert_eq!(timer.advance(100.0), 1);
    }

    #[test]
    fn test_scheduler_orders_due_tasks() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(500.0, "b");
        scheduler.schedule(200.0, "a");
        scheduler.schedule(2000.0, "c");

        assert!(scheduler.advance(100.0).is_empty());
        assert_eq!(scheduler.advance(400.0), vec!["a", "b"]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.advance(1500.0), vec!["c"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_scheduler_clear() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(10.0, 1);
        scheduler.clear();
        assert!(scheduler.advance(100.0).is_empty());
    }
}
