//! Cancellable periodic timers over a virtual clock.
//!
//! The clock only moves when the host says so. The TUI advances it by real
//! elapsed time; tests advance it by hand.

use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Countdown,
    AutoSave,
    QuoteRotation,
}

#[derive(Debug, Clone)]
struct Timer {
    kind: TimerKind,
    period: Duration,
    due: Duration,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    elapsed: Duration,
    next_id: u64,
    timers: BTreeMap<TimerId, Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// First firing is one `period` from now.
    pub fn register(&mut self, kind: TimerKind, period: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        // A zero period would fire forever within a single advance
        let period = period.max(Duration::from_millis(1));
        self.timers.insert(
            id,
            Timer {
                kind,
                period,
                due: self.elapsed + period,
            },
        );
        id
    }

    /// Returns `false` if the timer was not registered.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    #[cfg(test)]
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its due time and rescheduling it one period later.
    ///
    /// Callers dispatch one firing at a time so a handler that cancels a
    /// timer takes effect before the next firing is chosen.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, TimerKind)> {
        let (&id, timer) = self
            .timers
            .iter_mut()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(id, t)| (t.due, **id))?;

        self.elapsed = self.elapsed.max(timer.due);
        timer.due += timer.period;
        Some((id, timer.kind))
    }

    /// Move the clock to `until` once every due timer has been popped.
    pub fn settle(&mut self, until: Duration) {
        self.elapsed = self.elapsed.max(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn drain(scheduler: &mut Scheduler, by: Duration) -> Vec<TimerKind> {
        let until = scheduler.elapsed() + by;
        let mut fired = Vec::new();
        while let Some((_, kind)) = scheduler.pop_due(until) {
            fired.push(kind);
        }
        scheduler.settle(until);
        fired
    }

    #[test]
    fn test_periodic_firing() {
        let mut scheduler = Scheduler::new();
        scheduler.register(TimerKind::Countdown, secs(1));
        scheduler.register(TimerKind::AutoSave, secs(3));

        let fired = drain(&mut scheduler, secs(3));
        assert_eq!(
            fired,
            vec![
                TimerKind::Countdown,
                TimerKind::Countdown,
                TimerKind::Countdown,
                TimerKind::AutoSave,
            ]
        );
        assert_eq!(scheduler.elapsed(), secs(3));
        assert!(drain(&mut scheduler, Duration::from_millis(999)).is_empty());
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.register(TimerKind::Countdown, secs(1));
        assert!(scheduler.is_active(id));
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert!(drain(&mut scheduler, secs(10)).is_empty());
    }

    #[test]
    fn test_register_is_relative_to_clock() {
        let mut scheduler = Scheduler::new();
        drain(&mut scheduler, secs(100));
        scheduler.register(TimerKind::Countdown, secs(1));
        assert!(drain(&mut scheduler, Duration::from_millis(500)).is_empty());
        assert_eq!(
            drain(&mut scheduler, Duration::from_millis(500)),
            vec![TimerKind::Countdown]
        );
    }

    #[test]
    fn test_cancel_between_pops() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.register(TimerKind::Countdown, secs(1));
        let until = secs(5);
        assert_eq!(scheduler.pop_due(until), Some((id, TimerKind::Countdown)));
        scheduler.cancel(id);
        assert_eq!(scheduler.pop_due(until), None);
        scheduler.settle(until);
        assert_eq!(scheduler.elapsed(), until);
    }
}
