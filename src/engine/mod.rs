use std::{any::Any, path::PathBuf, time::Duration};

use anyhow::Result;
use log::debug;
use serde::Serialize;

use crate::{
    rng::{RngManager, SystemRng},
    session::{Session, SessionState},
    snapshot::SnapshotWriter,
};

pub struct EngineSettings {
    pub label: String,
    pub seed: u64,
    pub frame: Duration,
    pub snapshot_interval_frames: u64,
    pub snapshot_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            label: "session".into(),
            seed: 7,
            frame: Duration::from_millis(16),
            snapshot_interval_frames: 0,
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_frames,
            ),
            settings: self.settings,
            frame: 0,
        }
    }
}

/// Per-frame summary handed to run hooks
#[derive(Clone, Debug, Serialize)]
pub struct FrameSummary {
    pub frame: u64,
    pub clock_ms: u64,
    pub state: SessionState,
    pub score: i64,
    pub time_remaining_ms: u64,
    pub active_coins: usize,
    pub snapshot_path: Option<PathBuf>,
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
    frame: u64,
}

impl Engine {
    pub fn run(&mut self, session: &mut Session, frames: u64) -> Result<()> {
        self.run_with_hook(session, frames, |_| {})
    }

    pub fn run_with_hook<F>(&mut self, session: &mut Session, frames: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&FrameSummary),
    {
        for _ in 0..frames {
            let summary = self.step(session)?;
            hook(&summary);
        }
        Ok(())
    }

    /// Run frames until the session is no longer active, at most `max_frames`.
    /// Returns the number of frames run.
    pub fn run_until_ended(&mut self, session: &mut Session, max_frames: u64) -> Result<u64> {
        let mut frames = 0;
        while frames < max_frames && session.is_active() {
            self.step(session)?;
            frames += 1;
        }
        debug!("engine stopped after {frames} frames in state {:?}", session.state());
        Ok(frames)
    }

    fn step(&mut self, session: &mut Session) -> Result<FrameSummary> {
        self.frame += 1;
        let frame = self.frame;
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name());
            let ctx = FrameContext {
                frame,
                dt: self.settings.frame,
                now: session.now(),
                label: &self.settings.label,
            };
            system.run(&ctx, session, &mut rng_stream)?;
        }
        session.advance(self.settings.frame);

        let snapshot = session.snapshot();
        let snapshot_path = self
            .snapshot_writer
            .maybe_write(frame, &self.settings.label, &snapshot)?;
        Ok(FrameSummary {
            frame,
            clock_ms: snapshot.clock_ms,
            state: snapshot.state,
            score: snapshot.score,
            time_remaining_ms: snapshot.time_remaining_ms,
            active_coins: snapshot.pool.active,
            snapshot_path,
        })
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    pub fn get_system<T: 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|system| system.as_any().downcast_ref::<T>())
    }
}

pub struct FrameContext<'a> {
    pub frame: u64,
    pub dt: Duration,
    pub now: Duration,
    pub label: &'a str,
}

/// Per-frame input or bookkeeping that runs before the session advances.
pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &FrameContext,
        session: &mut Session,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
    fn as_any(&self) -> &dyn Any;
}
