use std::{any::Any, collections::HashSet, time::Duration};

use anyhow::Result;
use rand::Rng;

use crate::{
    engine::{FrameContext, System},
    pool::Handle,
    rng::SystemRng,
    session::{Session, SessionState},
};

/// Simulated player: once a coin has been live for `reaction`, taps it with
/// probability `accuracy`. Each coin life gets exactly one decision.
pub struct AutoTapSystem {
    reaction: Duration,
    accuracy: f64,
    decided: HashSet<Handle>,
    taps: u64,
    misses: u64,
}

impl AutoTapSystem {
    pub fn new(reaction: Duration, accuracy: f64) -> Self {
        Self {
            reaction,
            accuracy: accuracy.clamp(0.0, 1.0),
            decided: HashSet::new(),
            taps: 0,
            misses: 0,
        }
    }

    pub fn taps(&self) -> u64 {
        self.taps
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl Default for AutoTapSystem {
    fn default() -> Self {
        Self::new(Duration::from_millis(450), 0.8)
    }
}

impl System for AutoTapSystem {
    fn name(&self) -> &str {
        "autotap"
    }

    fn run(
        &mut self,
        ctx: &FrameContext,
        session: &mut Session,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        self.decided.retain(|handle| session.pool().is_active(*handle));
        if session.state() != SessionState::Running {
            return Ok(());
        }

        let spawn_animation = session.timings().spawn;
        for handle in session.live_coins() {
            if self.decided.contains(&handle) {
                continue;
            }
            let Some(coin) = session.pool().get(handle) else {
                continue;
            };
            if ctx.now < coin.spawned_at() + spawn_animation + self.reaction {
                continue;
            }
            self.decided.insert(handle);
            if rng.gen::<f64>() < self.accuracy {
                if session.collect(handle) {
                    self.taps += 1;
                }
            } else {
                self.misses += 1;
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
