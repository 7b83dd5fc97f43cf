use std::{any::Any, time::Duration};

use anyhow::Result;
use log::debug;

use crate::{
    engine::{FrameContext, System},
    rng::SystemRng,
    session::{Session, SessionState},
};

/// Pauses once after `pause_at` of play and resumes after `hold` of clock time.
pub struct PauseScriptSystem {
    pause_at: Duration,
    hold: Duration,
    paused_since: Option<Duration>,
    done: bool,
}

impl PauseScriptSystem {
    pub fn new(pause_at: Duration, hold: Duration) -> Self {
        Self {
            pause_at,
            hold,
            paused_since: None,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl System for PauseScriptSystem {
    fn name(&self) -> &str {
        "pause_script"
    }

    fn run(
        &mut self,
        ctx: &FrameContext,
        session: &mut Session,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if self.done {
            return Ok(());
        }
        match self.paused_since {
            None => {
                if session.state() == SessionState::Running && session.played() >= self.pause_at {
                    debug!("pause script: pausing at frame {}", ctx.frame);
                    session.pause();
                    self.paused_since = Some(ctx.now);
                }
            }
            Some(since) => {
                if ctx.now.saturating_sub(since) >= self.hold {
                    debug!("pause script: resuming at frame {}", ctx.frame);
                    session.resume();
                    self.done = true;
                }
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
