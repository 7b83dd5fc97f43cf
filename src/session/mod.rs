//! Session controller: countdown, spawn cadence, score and the coin timers.
//!
//! ```text
//! Idle --start--> Running <--pause/resume--> Paused
//!                    |                          |
//!                    +------- end / timeout ----+--> Ended --restart--> Running
//! ```
//!
//! Every timer is tagged with the epoch it was armed in. `start`/`restart`
//! bump the epoch and clear the scheduler; anything from an older epoch that
//! still fires is dropped.

pub mod combo;
pub mod observer;

use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    coin::{Coin, CoinState, CoinTimings},
    config::{ConfigError, GameConfig},
    pool::{Handle, PoolStats},
    rng::RngManager,
    scheduler::{Fired, Scheduler, TimerId},
    spawner::{CoinPool, CoinSpawner, Viewport},
};

use combo::{ComboRule, ComboTracker};
use observer::{AudioSink, NotifyResult, SessionObserver, SilentAudio};

pub const SFX_GAME_START: &str = "game_start";
pub const SFX_COIN_COLLECT: &str = "coin_collect";
pub const SFX_COIN_EXPIRE: &str = "coin_expire";
pub const SFX_GAME_OVER: &str = "game_over";

const SPAWNER_STREAM: &str = "spawner";

/// Linear ramp of the spawn interval towards `min_interval` over `ramp` of play.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyRamp {
    pub min_interval: Duration,
    pub ramp: Duration,
}

impl DifficultyRamp {
    pub fn interval_at(&self, base: Duration, played: Duration) -> Duration {
        let progress = (played.as_secs_f64() / self.ramp.as_secs_f64()).min(1.0);
        let span = base.saturating_sub(self.min_interval);
        base.saturating_sub(span.mul_f64(progress))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub duration: Duration,
    pub spawn_interval: Duration,
    pub spawn_start_delay: Duration,
    pub timer_tick: Duration,
    pub points_per_coin: i64,
    pub difficulty: Option<DifficultyRamp>,
    pub combo: Option<ComboRule>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(30),
            spawn_interval: Duration::from_millis(1_500),
            spawn_start_delay: Duration::from_secs(1),
            timer_tick: Duration::from_millis(100),
            points_per_coin: 1,
            difficulty: None,
            combo: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Ended,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub spawned: u64,
    pub collected: u64,
    pub expired: u64,
    pub evicted: u64,
    pub stale_dropped: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoinView {
    pub slot: usize,
    pub state: CoinState,
    pub value: i64,
    pub variant: Option<String>,
    pub bonus: bool,
    pub x: f32,
    pub y: f32,
    pub remaining_lifetime_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub epoch: u64,
    pub score: i64,
    pub clock_ms: u64,
    pub time_remaining_ms: u64,
    pub pool: PoolStats,
    pub stats: SessionStats,
    pub coins: Vec<CoinView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoinStep {
    Settle,
    Expire,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Countdown,
    Spawn,
    Coin { handle: Handle, step: CoinStep },
}

#[derive(Debug, Clone, Copy)]
struct Tagged {
    epoch: u64,
    task: Task,
}

pub struct SessionBuilder {
    settings: SessionSettings,
    timings: CoinTimings,
    spawner: CoinSpawner,
    seed: u64,
    observers: Vec<Box<dyn SessionObserver>>,
    audio: Box<dyn AudioSink>,
}

impl SessionBuilder {
    pub fn new(
        settings: SessionSettings,
        timings: CoinTimings,
        spawner: CoinSpawner,
        seed: u64,
    ) -> Self {
        Self {
            settings,
            timings,
            spawner,
            seed,
            observers: Vec::new(),
            audio: Box::new(SilentAudio),
        }
    }

    /// Wire pool, spawner and settings from a loaded config. Fatal config
    /// problems surface here, before any session exists.
    pub fn from_config(
        config: &GameConfig,
        viewport: Box<dyn Viewport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = CoinPool::new(config.pool.max_size, Coin::new)
            .map_err(|_| ConfigError::PoolCapacity(config.pool.max_size))?
            .with_prewarm(config.pool.initial_size);
        let settings = config.session_settings();
        let spawner = CoinSpawner::new(
            pool,
            config.spawn_region(),
            config.variant_table()?,
            viewport,
        )
        .with_bonus(config.bonus_rule())
        .with_base_value(settings.points_per_coin);
        Ok(Self::new(settings, config.coin_timings(), spawner, config.seed))
    }

    pub fn with_observer(mut self, observer: impl SessionObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn with_audio(mut self, audio: impl AudioSink + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn build(self) -> Session {
        Session {
            time_remaining: self.settings.duration,
            combo: self.settings.combo.map(ComboTracker::new),
            settings: self.settings,
            timings: self.timings,
            spawner: self.spawner,
            scheduler: Scheduler::new(),
            rng: RngManager::new(self.seed),
            observers: self.observers,
            audio: self.audio,
            state: SessionState::Idle,
            score: 0,
            played: Duration::ZERO,
            epoch: 0,
            stats: SessionStats::default(),
        }
    }
}

pub struct Session {
    settings: SessionSettings,
    timings: CoinTimings,
    spawner: CoinSpawner,
    scheduler: Scheduler<Tagged>,
    rng: RngManager,
    observers: Vec<Box<dyn SessionObserver>>,
    audio: Box<dyn AudioSink>,
    combo: Option<ComboTracker>,
    state: SessionState,
    score: i64,
    time_remaining: Duration,
    played: Duration,
    epoch: u64,
    stats: SessionStats,
}

impl Session {
    pub fn start(&mut self) {
        if self.state != SessionState::Idle {
            self.teardown();
        }

        self.epoch += 1;
        self.state = SessionState::Running;
        self.score = 0;
        self.time_remaining = self.settings.duration;
        self.played = Duration::ZERO;
        if let Some(combo) = self.combo.as_mut() {
            combo.reset();
        }

        let epoch = self.epoch;
        let tick = self.settings.timer_tick;
        self.scheduler.schedule_every(
            tick,
            tick,
            Tagged {
                epoch,
                task: Task::Countdown,
            },
        );
        self.scheduler.schedule_every(
            self.settings.spawn_start_delay,
            self.settings.spawn_interval,
            Tagged {
                epoch,
                task: Task::Spawn,
            },
        );

        info!(
            "session epoch {epoch} started: {:.1}s, spawning every {:.2}s",
            self.settings.duration.as_secs_f64(),
            self.settings.spawn_interval.as_secs_f64()
        );
        self.audio.play_sfx(SFX_GAME_START);
        let remaining = self.time_remaining;
        self.notify(|o| o.on_session_started());
        self.notify(|o| o.on_score_changed(0));
        self.notify(|o| o.on_timer_changed(remaining));
    }

    /// Tear down the current epoch and start a fresh one.
    pub fn restart(&mut self) {
        info!("restarting session (epoch {})", self.epoch);
        self.start();
    }

    pub fn pause(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        self.state = SessionState::Paused;
        info!("session paused");
        self.notify(|o| o.on_session_paused());
    }

    pub fn resume(&mut self) {
        if self.state != SessionState::Paused {
            return;
        }
        self.state = SessionState::Running;
        info!("session resumed");
        self.notify(|o| o.on_session_resumed());
    }

    pub fn end(&mut self) {
        if !self.is_active() {
            return;
        }
        self.state = SessionState::Ended;
        self.teardown();
        info!("session epoch {} ended, final score {}", self.epoch, self.score);
        self.audio.play_sfx(SFX_GAME_OVER);
        self.notify(|o| o.on_session_ended());
    }

    /// End the session and destroy every pooled coin. The pool regrows lazily
    /// if the session is started again.
    pub fn shutdown(&mut self) {
        self.end();
        self.scheduler.clear();
        self.spawner.pool_mut().clear();
        info!("session shut down");
    }

    /// Add points. Ignored unless the session is running and not paused.
    pub fn add_score(&mut self, points: i64) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.score = self.score.saturating_add(points);
        let score = self.score;
        debug!("score {score} (+{points})");
        self.notify(|o| o.on_score_changed(score));
        true
    }

    /// A tap on a coin. Scores at most once per coin life.
    pub fn collect(&mut self, handle: Handle) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        let Some(value) = self
            .spawner
            .pool_mut()
            .get_mut(handle)
            .and_then(|coin| coin.collect())
        else {
            return false;
        };

        let now = self.scheduler.now();
        let points = match self.combo.as_mut() {
            Some(combo) => combo.points(value, now),
            None => value,
        };
        self.stats.collected += 1;
        self.cancel_coin_timers(handle);
        self.arm_coin(handle, CoinStep::Finish, self.timings.collect);
        self.audio.play_sfx(SFX_COIN_COLLECT);
        self.add_score(points);
        true
    }

    /// Run every timer due within the next `dt`, in deadline order.
    pub fn advance(&mut self, dt: Duration) {
        let until = self.scheduler.now() + dt;
        while let Some(fired) = self.scheduler.pop_due(until) {
            self.dispatch(fired);
        }
        self.scheduler.advance_to(until);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Running | SessionState::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn time_remaining(&self) -> Duration {
        self.time_remaining
    }

    /// Unpaused play time in the current epoch
    pub fn played(&self) -> Duration {
        self.played
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn timings(&self) -> CoinTimings {
        self.timings
    }

    pub fn pool(&self) -> &CoinPool {
        self.spawner.pool()
    }

    pub fn combo_streak(&self) -> u32 {
        self.combo.as_ref().map_or(0, |c| c.streak())
    }

    /// Coins currently accepting taps, oldest first
    pub fn live_coins(&self) -> Vec<Handle> {
        self.spawner
            .pool()
            .iter_active()
            .filter(|(_, coin)| coin.is_interactable())
            .map(|(handle, _)| handle)
            .collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.scheduler.now();
        let coins = self
            .spawner
            .pool()
            .iter_active()
            .map(|(handle, coin)| CoinView {
                slot: handle.slot(),
                state: coin.state(),
                value: coin.value(),
                variant: coin.variant().map(str::to_string),
                bonus: coin.is_bonus(),
                x: coin.position().x,
                y: coin.position().y,
                remaining_lifetime_ms: coin.remaining_lifetime(now).as_millis() as u64,
            })
            .collect();
        SessionSnapshot {
            state: self.state,
            epoch: self.epoch,
            score: self.score,
            clock_ms: now.as_millis() as u64,
            time_remaining_ms: self.time_remaining.as_millis() as u64,
            pool: self.spawner.pool().stats(),
            stats: self.stats,
            coins,
        }
    }

    fn teardown(&mut self) {
        let cancelled = self.scheduler.clear();
        let released = self.spawner.clear_all();
        debug!(
            "epoch {} torn down: {cancelled} timers cancelled, {} coins released",
            self.epoch,
            released.len()
        );
    }

    fn notify(&mut self, mut call: impl FnMut(&mut dyn SessionObserver) -> NotifyResult) {
        for observer in self.observers.iter_mut() {
            if let Err(err) = call(observer.as_mut()) {
                debug!("observer notification dropped: {err}");
            }
        }
    }

    fn dispatch(&mut self, fired: Fired<Tagged>) {
        let Tagged { epoch, task } = fired.task;
        if epoch != self.epoch {
            self.stats.stale_dropped += 1;
            self.scheduler.cancel(fired.id);
            debug!(
                "dropping stale {task:?} from epoch {epoch} (current {})",
                self.epoch
            );
            return;
        }
        match task {
            Task::Countdown => self.countdown_tick(),
            Task::Spawn => self.spawn_tick(fired.id),
            Task::Coin { handle, step } => self.coin_step(handle, step),
        }
    }

    fn countdown_tick(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        let tick = self.settings.timer_tick;
        self.time_remaining = self.time_remaining.saturating_sub(tick);
        self.played += tick;
        let remaining = self.time_remaining;
        self.notify(|o| o.on_timer_changed(remaining));
        if remaining.is_zero() {
            info!("timer reached zero");
            self.end();
        }
    }

    fn spawn_tick(&mut self, timer: TimerId) {
        if self.state != SessionState::Running {
            return;
        }
        let now = self.scheduler.now();
        let outcome = {
            let mut rng = self.rng.stream(SPAWNER_STREAM);
            self.spawner.spawn(now, &mut rng)
        };
        match outcome {
            Ok(outcome) => {
                self.stats.spawned += 1;
                if let Some(evicted) = outcome.acquired.evicted {
                    self.stats.evicted += 1;
                    self.cancel_coin_timers(evicted);
                }
                self.arm_coin(outcome.acquired.handle, CoinStep::Settle, self.timings.spawn);
            }
            Err(err) => warn!("spawn tick skipped: {err}"),
        }

        if let Some(ramp) = self.settings.difficulty {
            let next = ramp.interval_at(self.settings.spawn_interval, self.played);
            self.scheduler.set_period(timer, next);
        }
    }

    fn coin_step(&mut self, handle: Handle, step: CoinStep) {
        let now = self.scheduler.now();
        let timings = self.timings;
        let pool = self.spawner.pool_mut();
        let Some(coin) = pool.get_mut(handle) else {
            debug!("coin {handle:?} already back in the pool, dropping {step:?}");
            return;
        };

        match step {
            CoinStep::Settle => {
                if coin.settle(now, timings.lifetime) {
                    self.arm_coin(handle, CoinStep::Expire, timings.lifetime);
                }
            }
            CoinStep::Expire => {
                if coin.expire() {
                    self.stats.expired += 1;
                    self.audio.play_sfx(SFX_COIN_EXPIRE);
                    self.arm_coin(handle, CoinStep::Finish, timings.fade);
                }
            }
            CoinStep::Finish => {
                if coin.is_finishing() {
                    pool.release(handle);
                }
            }
        }
    }

    fn arm_coin(&mut self, handle: Handle, step: CoinStep, delay: Duration) {
        self.scheduler.schedule_once(
            delay,
            Tagged {
                epoch: self.epoch,
                task: Task::Coin { handle, step },
            },
        );
    }

    fn cancel_coin_timers(&mut self, handle: Handle) {
        self.scheduler.cancel_where(
            |tagged| matches!(tagged.task, Task::Coin { handle: h, .. } if h == handle),
        );
    }
}
