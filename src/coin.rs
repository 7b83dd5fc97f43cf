//! Coin lifecycle
//!
//! `Inactive -> Spawning -> Live -> Collecting -> Inactive` when tapped,
//! `Inactive -> Spawning -> Live -> Expiring -> Inactive` when ignored.
//! The coin only records state; the session owns the timers that move it along.

use std::time::Duration;

use serde::Serialize;

use crate::pool::Poolable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CoinState {
    #[default]
    Inactive,
    Spawning,
    Live,
    Collecting,
    Expiring,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Phase durations shared by every coin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinTimings {
    pub spawn: Duration,
    pub lifetime: Duration,
    pub collect: Duration,
    pub fade: Duration,
}

impl Default for CoinTimings {
    fn default() -> Self {
        Self {
            spawn: Duration::from_millis(300),
            lifetime: Duration::from_secs(3),
            collect: Duration::from_millis(200),
            fade: Duration::from_millis(500),
        }
    }
}

/// Where and what to spawn
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub position: Position,
    pub value: i64,
    pub variant: Option<String>,
    pub bonus: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Coin {
    state: CoinState,
    value: i64,
    variant: Option<String>,
    bonus: bool,
    position: Position,
    collected: bool,
    spawned_at: Duration,
    live_until: Option<Duration>,
}

impl Coin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CoinState {
        self.state
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn is_bonus(&self) -> bool {
        self.bonus
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    pub fn is_active(&self) -> bool {
        self.state != CoinState::Inactive
    }

    /// Only a live coin reacts to taps.
    pub fn is_interactable(&self) -> bool {
        self.state == CoinState::Live
    }

    pub fn spawned_at(&self) -> Duration {
        self.spawned_at
    }

    pub fn remaining_lifetime(&self, now: Duration) -> Duration {
        match (self.state, self.live_until) {
            (CoinState::Live, Some(until)) => until.saturating_sub(now),
            _ => Duration::ZERO,
        }
    }

    /// Start the entrance animation. Ignored unless the coin is inactive.
    pub fn activate(&mut self, placement: Placement, now: Duration) -> bool {
        if self.state != CoinState::Inactive {
            return false;
        }
        self.state = CoinState::Spawning;
        self.value = placement.value;
        self.variant = placement.variant;
        self.bonus = placement.bonus;
        self.position = placement.position;
        self.spawned_at = now;
        true
    }

    /// Entrance finished; the lifetime countdown starts now.
    pub fn settle(&mut self, now: Duration, lifetime: Duration) -> bool {
        if self.state != CoinState::Spawning {
            return false;
        }
        self.state = CoinState::Live;
        self.live_until = Some(now + lifetime);
        true
    }

    /// Accept a tap. Returns the coin's value the first time only.
    pub fn collect(&mut self) -> Option<i64> {
        if self.state != CoinState::Live {
            return None;
        }
        self.state = CoinState::Collecting;
        self.collected = true;
        self.live_until = None;
        Some(self.value)
    }

    /// Lifetime ran out before a tap.
    pub fn expire(&mut self) -> bool {
        if self.state != CoinState::Live {
            return false;
        }
        self.state = CoinState::Expiring;
        self.live_until = None;
        true
    }

    /// Collect or fade animation done; the coin may go back to the pool.
    pub fn is_finishing(&self) -> bool {
        matches!(self.state, CoinState::Collecting | CoinState::Expiring)
    }
}

impl Poolable for Coin {
    fn reset(&mut self) {
        *self = Coin::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(value: i64) -> Placement {
        Placement {
            position: Position { x: 4.0, y: -2.0 },
            value,
            variant: Some("Silver".into()),
            bonus: false,
        }
    }

    fn live_coin() -> Coin {
        let mut coin = Coin::new();
        assert!(coin.activate(placement(2), Duration::ZERO));
        assert!(coin.settle(Duration::from_millis(300), Duration::from_secs(3)));
        coin
    }

    #[test]
    fn spawning_coin_ignores_taps() {
        let mut coin = Coin::new();
        coin.activate(placement(2), Duration::ZERO);
        assert_eq!(coin.state(), CoinState::Spawning);
        assert!(!coin.is_interactable());
        assert_eq!(coin.collect(), None);
    }

    #[test]
    fn collect_pays_once() {
        let mut coin = live_coin();
        assert_eq!(coin.collect(), Some(2));
        assert_eq!(coin.collect(), None);
        assert_eq!(coin.state(), CoinState::Collecting);
        assert!(coin.is_collected());
        assert!(!coin.is_interactable());
    }

    #[test]
    fn expiring_coin_cannot_be_collected() {
        let mut coin = live_coin();
        assert!(coin.expire());
        assert_eq!(coin.collect(), None);
        assert!(!coin.expire());
    }

    #[test]
    fn remaining_lifetime_counts_down_while_live() {
        let coin = live_coin();
        assert_eq!(
            coin.remaining_lifetime(Duration::from_millis(1_300)),
            Duration::from_secs(2)
        );
        assert_eq!(coin.remaining_lifetime(Duration::from_secs(10)), Duration::ZERO);
    }

    #[test]
    fn reset_clears_previous_life() {
        let mut coin = live_coin();
        coin.collect();
        coin.reset();
        assert_eq!(coin.state(), CoinState::Inactive);
        assert!(!coin.is_collected());
        assert_eq!(coin.value(), 0);
        assert_eq!(coin.variant(), None);
        assert_eq!(coin.remaining_lifetime(Duration::ZERO), Duration::ZERO);
    }
}
