use std::any::Any;

use anyhow::Result;
use serde::Serialize;

use crate::{
    engine::{FrameContext, System},
    rng::SystemRng,
    session::Session,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TallyReport {
    pub frames: u64,
    pub paused_frames: u64,
    pub peak_active: usize,
    pub peak_live: usize,
}

#[derive(Default)]
pub struct TallySystem {
    report: TallyReport,
}

impl TallySystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self) -> &TallyReport {
        &self.report
    }
}

impl System for TallySystem {
    fn name(&self) -> &str {
        "tally"
    }

    fn run(
        &mut self,
        _ctx: &FrameContext,
        session: &mut Session,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        self.report.frames += 1;
        if session.is_paused() {
            self.report.paused_frames += 1;
        }
        self.report.peak_active = self.report.peak_active.max(session.pool().stats().active);
        self.report.peak_live = self.report.peak_live.max(session.live_coins().len());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::GameConfig,
        engine::{EngineBuilder, EngineSettings},
        session::SessionBuilder,
        spawner::FixedViewport,
        systems::PauseScriptSystem,
    };

    #[test]
    fn counts_frames_and_paused_frames() {
        let mut session =
            SessionBuilder::from_config(&GameConfig::default(), Box::new(FixedViewport::default()))
                .unwrap()
                .build();
        session.start();
        let mut engine = EngineBuilder::new(EngineSettings {
            frame: Duration::from_millis(100),
            ..EngineSettings::default()
        })
        .with_system(PauseScriptSystem::new(
            Duration::from_secs(5),
            Duration::from_secs(10),
        ))
        .with_system(TallySystem::new())
        .build();

        engine.run_until_ended(&mut session, 10_000).unwrap();
        let report = engine.get_system::<TallySystem>().unwrap().report();
        assert_eq!(report.frames, 400);
        assert_eq!(report.paused_frames, 100);
        assert!(report.peak_active >= 1);
        assert!(report.peak_active <= session.pool().capacity());
        assert!(report.peak_live <= report.peak_active);
    }
}
