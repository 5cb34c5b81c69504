//! Clock-driven viseme scheduling.
//!
//! The scheduler does not own a timer. The host's render loop calls
//! [`VisemeScheduler::tick`] once per frame, and the scheduler reads the same
//! [`PlaybackClock`] the audio output uses, so mouth motion stays phase-locked
//! to the audio rather than to wall-clock time.

use crate::viseme::types::{VisemeEvent, VisemeId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Monotonic clock in seconds, shared with the playback sink.
pub trait PlaybackClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Seconds elapsed since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock for tests and offline rendering.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    pub fn set(&self, time: f64) {
        self.bits.store(time.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta: f64) {
        self.set(self.now() + delta);
    }
}

impl PlaybackClock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// A mouth-shape change emitted by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisemeChange {
    pub viseme: VisemeId,
    /// Clock reading at which the change was observed.
    pub at: f64,
}

/// Receiver of `viseme-changed` notifications.
pub trait VisemeListener: Send {
    fn viseme_changed(&mut self, change: VisemeChange);
}

impl<F> VisemeListener for F
where
    F: FnMut(VisemeChange) + Send,
{
    fn viseme_changed(&mut self, change: VisemeChange) {
        (self)(change)
    }
}

/// Forwards changes to another thread (e.g. the renderer) without blocking.
pub struct ChannelListener {
    tx: crossbeam_channel::Sender<VisemeChange>,
}

impl ChannelListener {
    pub fn new(tx: crossbeam_channel::Sender<VisemeChange>) -> Self {
        Self { tx }
    }
}

impl VisemeListener for ChannelListener {
    fn viseme_changed(&mut self, change: VisemeChange) {
        // A full or closed channel only means the renderer is gone or behind.
        if let Err(e) = self.tx.try_send(change) {
            eprintln!("voxbridge: viseme change {} dropped: {}", change.viseme, e);
        }
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Playing,
}

/// Walks one viseme timeline against a clock.
///
/// One instance per avatar; at most one timeline plays at a time.
pub struct VisemeScheduler {
    clock: Arc<dyn PlaybackClock>,
    state: SchedulerState,
    queue: VecDeque<VisemeEvent>,
    current: VisemeId,
    listener: Option<Box<dyn VisemeListener>>,
}

/// Scheduler shared between the pipeline task and the render loop.
pub type SharedScheduler = Arc<Mutex<VisemeScheduler>>;

impl VisemeScheduler {
    pub fn new(clock: Arc<dyn PlaybackClock>) -> Self {
        Self {
            clock,
            state: SchedulerState::Idle,
            queue: VecDeque::new(),
            current: VisemeId::Rest,
            listener: None,
        }
    }

    /// Wrap in the mutex the render loop and pipeline share.
    pub fn shared(self) -> SharedScheduler {
        Arc::new(Mutex::new(self))
    }

    /// Register the single listener, replacing any previous one.
    pub fn subscribe(&mut self, listener: Box<dyn VisemeListener>) {
        self.listener = Some(listener);
    }

    pub fn unsubscribe(&mut self) {
        self.listener = None;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn current(&self) -> VisemeId {
        self.current
    }

    /// Events not yet swept past.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clock(&self) -> &Arc<dyn PlaybackClock> {
        &self.clock
    }

    /// Begin playing `events`, shifted by `clock_offset` seconds.
    ///
    /// A timeline already playing is stopped first. An empty timeline leaves
    /// the scheduler idle.
    pub fn start(&mut self, events: &[VisemeEvent], clock_offset: f64) {
        if self.state == SchedulerState::Playing {
            self.stop();
        }

        self.current = VisemeId::Rest;
        self.queue = events.iter().map(|e| e.shifted(clock_offset)).collect();
        if !self.queue.is_empty() {
            self.state = SchedulerState::Playing;
        }
    }

    /// Advance to the current clock reading. Returns the viseme emitted, if any.
    pub fn tick(&mut self) -> Option<VisemeId> {
        let now = self.clock.now();
        self.tick_at(now)
    }

    /// Advance to `now`. The sweep only moves forward; events that ended at
    /// or before `now` are discarded for good.
    pub fn tick_at(&mut self, now: f64) -> Option<VisemeId> {
        if self.state != SchedulerState::Playing {
            return None;
        }

        while self.queue.front().is_some_and(|e| e.end_time <= now) {
            self.queue.pop_front();
        }

        let Some(front) = self.queue.front().copied() else {
            self.state = SchedulerState::Idle;
            return self.rest(now);
        };

        if front.contains(now) && front.symbol != self.current {
            self.current = front.symbol;
            self.emit(front.symbol, now);
            return Some(front.symbol);
        }
        None
    }

    /// Cancel the timeline and return the mouth to rest. Safe to call in any
    /// state, any number of times.
    pub fn stop(&mut self) {
        self.queue.clear();
        self.state = SchedulerState::Idle;
        let now = self.clock.now();
        self.rest(now);
    }

    fn rest(&mut self, now: f64) -> Option<VisemeId> {
        if self.current.is_rest() {
            return None;
        }
        self.current = VisemeId::Rest;
        self.emit(VisemeId::Rest, now);
        Some(VisemeId::Rest)
    }

    fn emit(&mut self, viseme: VisemeId, at: f64) {
        if let Some(listener) = self.listener.as_mut() {
            listener.viseme_changed(VisemeChange { viseme, at });
        }
    }
}
