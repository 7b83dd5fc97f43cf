//! Scheduler - cooperative timers on a single logical clock
//!
//! Timers are plain records (deadline, optional period, task payload). Nothing
//! runs on its own: the owner asks for the next due timer with [`Scheduler::pop_due`]
//! and dispatches it, which lets a dispatch cancel or add timers before the next
//! one is popped. Cancelling is removing the record.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer<T> {
    id: TimerId,
    due: Duration,
    period: Option<Duration>,
    task: T,
}

/// A timer that came due
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<T> {
    pub id: TimerId,
    pub at: Duration,
    pub task: T,
}

pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    timers: Vec<Timer<T>>,
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            timers: Vec::new(),
        }
    }

    /// Current clock
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of pending timers
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Fire `task` once after `delay`
    pub fn schedule_once(&mut self, delay: Duration, task: T) -> TimerId {
        self.insert(delay, None, task)
    }

    /// Fire `task` after `first`, then every `period`.
    ///
    /// A zero period is bumped to one millisecond; a periodic timer must make
    /// progress or `pop_due` would never drain.
    pub fn schedule_every(&mut self, first: Duration, period: Duration, task: T) -> TimerId {
        self.insert(first, Some(period.max(Duration::from_millis(1))), task)
    }

    fn insert(&mut self, delay: Duration, period: Option<Duration>, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due: self.now + delay,
            period,
            task,
        });
        id
    }

    /// Change the period applied at the timer's next re-arm
    pub fn set_period(&mut self, id: TimerId, period: Duration) -> bool {
        match self.timers.iter_mut().find(|t| t.id == id) {
            Some(timer) if timer.period.is_some() => {
                timer.period = Some(period.max(Duration::from_millis(1)));
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| !predicate(&t.task));
        before - self.timers.len()
    }

    pub fn clear(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    /// Pop the earliest timer due at or before `until`.
    ///
    /// Ties go to the timer registered first. The clock moves to the timer's
    /// deadline; periodic timers are re-armed in place with the same id.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired<T>> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(index, _)| index)?;

        let due = self.timers[index].due;
        self.now = self.now.max(due);

        let fired = match self.timers[index].period {
            Some(period) => {
                let timer = &mut self.timers[index];
                timer.due += period;
                Fired {
                    id: timer.id,
                    at: due,
                    task: timer.task.clone(),
                }
            }
            None => {
                let timer = self.timers.swap_remove(index);
                Fired {
                    id: timer.id,
                    at: due,
                    task: timer.task,
                }
            }
        };
        Some(fired)
    }

    /// Move the clock forward without firing anything
    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}

impl<T: Clone> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn drain(scheduler: &mut Scheduler<&'static str>, until: Duration) -> Vec<(&'static str, u64)> {
        let mut fired = Vec::new();
        while let Some(f) = scheduler.pop_due(until) {
            fired.push((f.task, f.at.as_millis() as u64));
        }
        scheduler.advance_to(until);
        fired
    }

    #[test]
    fn fires_in_deadline_then_registration_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once(ms(20), "late");
        scheduler.schedule_once(ms(10), "first");
        scheduler.schedule_once(ms(10), "second");

        let fired = drain(&mut scheduler, ms(50));
        assert_eq!(fired, vec![("first", 10), ("second", 10), ("late", 20)]);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.now(), ms(50));
    }

    #[test]
    fn periodic_timer_keeps_its_rank() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_every(ms(100), ms(100), "tick");
        scheduler.schedule_every(ms(300), ms(300), "spawn");

        let fired = drain(&mut scheduler, ms(300));
        assert_eq!(
            fired,
            vec![("tick", 100), ("tick", 200), ("tick", 300), ("spawn", 300)]
        );
        assert_eq!(scheduler.pending(), 2);
    }

    #[test]
    fn cancel_removes_timer() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_once(ms(10), "gone");
        scheduler.schedule_once(ms(10), "kept");
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));

        assert_eq!(drain(&mut scheduler, ms(10)), vec![("kept", 10)]);
    }

    #[test]
    fn cancel_where_filters_by_task() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once(ms(5), "coin");
        scheduler.schedule_once(ms(6), "coin");
        scheduler.schedule_every(ms(5), ms(5), "tick");
        assert_eq!(scheduler.cancel_where(|task| *task == "coin"), 2);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn set_period_applies_on_next_rearm() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_every(ms(100), ms(100), "spawn");
        assert_eq!(scheduler.pop_due(ms(100)).map(|f| f.at), Some(ms(100)));
        assert!(scheduler.set_period(id, ms(50)));
        // already re-armed for 200 before the change
        assert_eq!(scheduler.pop_due(ms(1_000)).map(|f| f.at), Some(ms(200)));
        assert_eq!(scheduler.pop_due(ms(1_000)).map(|f| f.at), Some(ms(250)));
    }

    #[test]
    fn nothing_due_leaves_clock_alone() {
        let mut scheduler: Scheduler<&str> = Scheduler::new();
        scheduler.schedule_once(ms(100), "later");
        assert!(scheduler.pop_due(ms(99)).is_none());
        assert_eq!(scheduler.now(), Duration::ZERO);
    }
}
