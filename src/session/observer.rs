//! Boundary contracts towards presentation and audio.
//!
//! Notifications are fire-and-forget. An observer may report that it could not
//! apply one (a missing widget, a closed window); the session logs and moves on.

use std::{cell::RefCell, rc::Rc, time::Duration};

use log::debug;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("observer target unavailable: {0}")]
    Unavailable(String),
}

pub type NotifyResult = Result<(), NotifyError>;

pub trait SessionObserver {
    fn on_score_changed(&mut self, _score: i64) -> NotifyResult {
        Ok(())
    }

    fn on_timer_changed(&mut self, _remaining: Duration) -> NotifyResult {
        Ok(())
    }

    fn on_session_started(&mut self) -> NotifyResult {
        Ok(())
    }

    fn on_session_paused(&mut self) -> NotifyResult {
        Ok(())
    }

    fn on_session_resumed(&mut self) -> NotifyResult {
        Ok(())
    }

    fn on_session_ended(&mut self) -> NotifyResult {
        Ok(())
    }
}

/// "Play sound by name". Completion and success are never reported back.
pub trait AudioSink {
    fn play_sfx(&mut self, name: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play_sfx(&mut self, name: &str) {
        debug!("sfx '{name}'");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    ScoreChanged(i64),
    TimerChanged(Duration),
    Started,
    Paused,
    Resumed,
    Ended,
}

/// Shared, clonable record of every notification. Hand one clone to the
/// session and keep the other to inspect.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<SessionEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.borrow().clone()
    }

    pub fn count(&self, event: &SessionEvent) -> usize {
        self.events.borrow().iter().filter(|e| *e == event).count()
    }

    pub fn last_score(&self) -> Option<i64> {
        self.events.borrow().iter().rev().find_map(|e| match e {
            SessionEvent::ScoreChanged(score) => Some(*score),
            _ => None,
        })
    }

    fn push(&self, event: SessionEvent) -> NotifyResult {
        self.events.borrow_mut().push(event);
        Ok(())
    }
}

impl SessionObserver for EventLog {
    fn on_score_changed(&mut self, score: i64) -> NotifyResult {
        self.push(SessionEvent::ScoreChanged(score))
    }

    fn on_timer_changed(&mut self, remaining: Duration) -> NotifyResult {
        self.push(SessionEvent::TimerChanged(remaining))
    }

    fn on_session_started(&mut self) -> NotifyResult {
        self.push(SessionEvent::Started)
    }

    fn on_session_paused(&mut self) -> NotifyResult {
        self.push(SessionEvent::Paused)
    }

    fn on_session_resumed(&mut self) -> NotifyResult {
        self.push(SessionEvent::Resumed)
    }

    fn on_session_ended(&mut self) -> NotifyResult {
        self.push(SessionEvent::Ended)
    }
}

/// Records sound cue names in order.
#[derive(Debug, Clone, Default)]
pub struct SfxLog {
    cues: Rc<RefCell<Vec<String>>>,
}

impl SfxLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<String> {
        self.cues.borrow().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.cues.borrow().iter().filter(|c| *c == name).count()
    }
}

impl AudioSink for SfxLog {
    fn play_sfx(&mut self, name: &str) {
        self.cues.borrow_mut().push(name.to_string());
    }
}
