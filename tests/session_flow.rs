use std::time::Duration;

use cointap::{
    config::{ConfigLoader, GameConfig},
    session::{
        observer::{EventLog, SessionEvent, SfxLog},
        Session, SessionBuilder, SessionState, SFX_COIN_COLLECT, SFX_GAME_OVER, SFX_GAME_START,
    },
    spawner::FixedViewport,
};

fn load_default() -> GameConfig {
    ConfigLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("configs/default.yaml")
        .expect("default config should load")
}

fn build(config: &GameConfig, events: &EventLog, sfx: &SfxLog) -> Session {
    SessionBuilder::from_config(config, Box::new(FixedViewport::default()))
        .expect("config is valid")
        .with_observer(events.clone())
        .with_audio(sfx.clone())
        .build()
}

fn advance_secs(session: &mut Session, secs: u64) {
    for _ in 0..secs * 10 {
        session.advance(Duration::from_millis(100));
    }
}

#[test]
fn shipped_config_matches_builtin_defaults() {
    let config = load_default();
    let builtin = GameConfig::default();
    assert_eq!(config.seed, builtin.seed);
    assert_eq!(config.pool.max_size, builtin.pool.max_size);
    assert_eq!(config.pool.initial_size, builtin.pool.initial_size);
    assert_eq!(config.variants.len(), builtin.variants.len());
    assert_eq!(config.spawn_region(), builtin.spawn_region());
    assert_eq!(config.coin_timings(), builtin.coin_timings());
}

#[test]
fn full_session_ends_exactly_once() {
    let config = load_default();
    let events = EventLog::new();
    let sfx = SfxLog::new();
    let mut session = build(&config, &events, &sfx);

    session.start();
    advance_secs(&mut session, 40);

    assert_eq!(session.state(), SessionState::Ended);
    assert_eq!(session.time_remaining(), Duration::ZERO);
    assert_eq!(events.count(&SessionEvent::Started), 1);
    assert_eq!(events.count(&SessionEvent::Ended), 1);
    assert_eq!(sfx.count(SFX_GAME_START), 1);
    assert_eq!(sfx.count(SFX_GAME_OVER), 1);

    let timer_updates = events
        .events()
        .iter()
        .filter(|e| matches!(e, SessionEvent::TimerChanged(_)))
        .count();
    assert_eq!(timer_updates, 301);
    assert_eq!(session.pool().stats().active, 0);
}

#[test]
fn tapping_a_live_coin_scores_its_value_once() {
    let config = load_default();
    let events = EventLog::new();
    let sfx = SfxLog::new();
    let mut session = build(&config, &events, &sfx);
    session.start();

    // first spawn at 1.0s, live after the 0.3s spawn animation
    session.advance(Duration::from_millis(1_400));
    let live = session.live_coins();
    assert_eq!(live.len(), 1);
    let handle = live[0];
    let value = session.pool().get(handle).expect("coin is active").value();

    assert!(session.collect(handle));
    assert!(!session.collect(handle));
    assert_eq!(session.score(), value);
    assert_eq!(events.last_score(), Some(value));
    assert_eq!(sfx.count(SFX_COIN_COLLECT), 1);

    session.advance(Duration::from_millis(200));
    assert!(!session.pool().is_active(handle));
}

#[test]
fn restart_discards_previous_epoch() {
    let config = load_default();
    let events = EventLog::new();
    let sfx = SfxLog::new();
    let mut session = build(&config, &events, &sfx);
    session.start();
    advance_secs(&mut session, 4);
    assert!(session.pool().stats().active > 0);

    session.restart();
    assert_eq!(session.epoch(), 2);
    assert_eq!(session.score(), 0);
    assert_eq!(session.time_remaining(), Duration::from_secs(30));
    assert_eq!(session.pool().stats().active, 0);

    advance_secs(&mut session, 31);
    assert_eq!(session.state(), SessionState::Ended);
    assert_eq!(session.played(), Duration::from_secs(30));
    assert_eq!(events.count(&SessionEvent::Ended), 1);
}

#[test]
fn paused_session_ignores_taps_and_keeps_time() {
    let config = load_default();
    let events = EventLog::new();
    let sfx = SfxLog::new();
    let mut session = build(&config, &events, &sfx);
    session.start();
    session.advance(Duration::from_millis(1_400));
    let handle = session.live_coins()[0];

    session.pause();
    let remaining = session.time_remaining();
    advance_secs(&mut session, 10);
    assert_eq!(session.time_remaining(), remaining);
    assert!(!session.collect(handle));
    assert_eq!(session.score(), 0);

    session.resume();
    assert_eq!(events.count(&SessionEvent::Paused), 1);
    assert_eq!(events.count(&SessionEvent::Resumed), 1);
    advance_secs(&mut session, 1);
    assert_eq!(session.time_remaining(), remaining - Duration::from_secs(1));
}
