//! Streak multiplier for quick consecutive collects.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComboRule {
    pub max_multiplier: f64,
    pub coins_for_max: u32,
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct ComboTracker {
    rule: ComboRule,
    streak: u32,
    last_collect: Option<Duration>,
}

impl ComboTracker {
    pub fn new(rule: ComboRule) -> Self {
        Self {
            rule,
            streak: 0,
            last_collect: None,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn reset(&mut self) {
        self.streak = 0;
        self.last_collect = None;
    }

    /// 1.0 on the first collect of a streak, rising linearly to the max once
    /// the streak reaches `coins_for_max`.
    pub fn multiplier(&self) -> f64 {
        if self.streak == 0 {
            return 1.0;
        }
        let progress = if self.rule.coins_for_max <= 1 {
            1.0
        } else {
            ((self.streak - 1) as f64 / (self.rule.coins_for_max - 1) as f64).min(1.0)
        };
        1.0 + (self.rule.max_multiplier - 1.0) * progress
    }

    /// Register a collect at `now` and return the points it is worth.
    pub fn points(&mut self, value: i64, now: Duration) -> i64 {
        let in_window = self
            .last_collect
            .is_some_and(|last| now.saturating_sub(last) <= self.rule.window);
        self.streak = if in_window { self.streak + 1 } else { 1 };
        self.last_collect = Some(now);
        (value as f64 * self.multiplier()).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ComboTracker {
        ComboTracker::new(ComboRule {
            max_multiplier: 2.0,
            coins_for_max: 5,
            window: Duration::from_secs(2),
        })
    }

    #[test]
    fn streak_ramps_to_max() {
        let mut combo = tracker();
        let points: Vec<i64> = (0..6)
            .map(|i| combo.points(4, Duration::from_secs(i)))
            .collect();
        assert_eq!(points, vec![4, 5, 6, 7, 8, 8]);
        assert_eq!(combo.streak(), 6);
    }

    #[test]
    fn gap_breaks_streak() {
        let mut combo = tracker();
        combo.points(1, Duration::from_secs(0));
        combo.points(1, Duration::from_secs(1));
        assert_eq!(combo.streak(), 2);
        combo.points(1, Duration::from_secs(10));
        assert_eq!(combo.streak(), 1);
        assert_eq!(combo.multiplier(), 1.0);
    }
}
