//! Session controller: start/stop tracking, feed fixes, publish stats

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration as StdDuration;

use log::{info, warn};
use time::{Duration, OffsetDateTime};

use super::accumulator::{Session, SessionAggregates};
use super::config::{CaptureConfig, SettingsProvider};
use super::fix::Fix;
use crate::export::geojson::{FeatureCollection, GeometryKind};
use crate::sources::{FixEvent, FixSource, Subscription};

/// Statistics refresh period while tracking
pub const TICK_PERIOD: Duration = Duration::SECOND;

pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Receives a snapshot on every tick
pub trait StatsSink {
    fn publish(&mut self, stats: &SessionAggregates);
}

/// Receives acquisition errors
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// Writes every snapshot to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct LogStatsSink;

impl StatsSink for LogStatsSink {
    fn publish(&mut self, stats: &SessionAggregates) {
        info!("{}", stats);
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, message: &str) {
        warn!("GPS Error: {}", message);
    }
}

struct Active {
    subscription: Box<dyn Subscription>,
    events: Receiver<FixEvent>,
    next_tick: OffsetDateTime,
}

enum State {
    Idle,
    Tracking(Active),
}

/// Drives one session: owns the accumulated state, the subscription to the
/// fix source and the tick deadline.
pub struct SessionController<C: Clock = SystemClock> {
    clock: C,
    settings: Box<dyn SettingsProvider>,
    stats: Box<dyn StatsSink>,
    notifier: Box<dyn Notifier>,
    session: Session,
    started_at: Option<OffsetDateTime>,
    state: State,
}

impl SessionController<SystemClock> {
    pub fn new<S>(settings: S) -> Self
    where
        S: SettingsProvider + 'static,
    {
        Self::with_clock(SystemClock, settings)
    }
}

impl<C: Clock> SessionController<C> {
    pub fn with_clock<S>(clock: C, settings: S) -> Self
    where
        S: SettingsProvider + 'static,
    {
        Self {
            clock,
            settings: Box::new(settings),
            stats: Box::new(LogStatsSink),
            notifier: Box::new(LogNotifier),
            session: Session::new(),
            started_at: None,
            state: State::Idle,
        }
    }

    pub fn stats_sink<S>(mut self, sink: S) -> Self
    where
        S: StatsSink + 'static,
    {
        self.stats = Box::new(sink);

        self
    }

    pub fn notifier<N>(mut self, notifier: N) -> Self
    where
        N: Notifier + 'static,
    {
        self.notifier = Box::new(notifier);

        self
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, State::Tracking(_))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Subscribe to `source` and open a new segment. Starting while already
    /// tracking does nothing.
    pub fn start(&mut self, source: &mut dyn FixSource) -> Result<(), String> {
        if self.is_tracking() {
            info!("Already tracking");
            return Ok(());
        }

        let (tx, rx) = channel();
        let subscription = source
            .subscribe(tx)
            .map_err(|e| format!("Failed on subscribe to the fix source: {}", e))?;

        let now = self.clock.now();
        self.started_at = Some(now);
        self.session.forget_last_fix();
        self.session.begin_segment();
        self.state = State::Tracking(Active {
            subscription,
            events: rx,
            next_tick: now + TICK_PERIOD,
        });

        info!("Tracking started, segment {}", self.session.segments().len());

        Ok(())
    }

    /// Cancel the subscription and the tick. Events still queued are dropped.
    pub fn stop(&mut self) {
        if let State::Tracking(mut active) = std::mem::replace(&mut self.state, State::Idle) {
            active.subscription.cancel();
            info!(
                "Tracking stopped, {} points, {:.1}m",
                self.session.points().len(),
                self.session.total_distance()
            );
        }
    }

    /// Stop and discard everything captured so far
    pub fn reset(&mut self) {
        self.stop();
        self.session = Session::new();
        self.started_at = None;
        info!("Session reset");
    }

    /// Restart the elapsed time, keeping the geometry
    pub fn reset_stats(&mut self) {
        self.started_at = Some(self.clock.now());
    }

    /// Apply a fix with the current settings. Ignored unless tracking.
    pub fn on_fix(&mut self, fix: &Fix) -> bool {
        if !self.is_tracking() {
            return false;
        }

        let conf: CaptureConfig = self.settings.current().sanitized();
        self.session.apply_fix(fix, &conf)
    }

    /// Forward an acquisition error; tracking goes on
    pub fn on_error(&mut self, message: &str) {
        self.notifier.notify(message);
    }

    pub fn snapshot(&self) -> SessionAggregates {
        let elapsed = match self.started_at {
            Some(start) => self.clock.now() - start,
            None => Duration::ZERO,
        };

        self.session.snapshot(elapsed)
    }

    /// Publish the current snapshot to the stats sink
    pub fn tick(&mut self) -> SessionAggregates {
        let stats = self.snapshot();
        self.stats.publish(&stats);

        stats
    }

    pub fn export_geometry(&self, kind: GeometryKind) -> FeatureCollection {
        self.session.export_geometry(kind)
    }

    /// Wait up to `wait`, never past the next tick, for one event from the
    /// source and apply it, then tick if due. Returns false once idle or
    /// once the source has closed its feed and nothing is left queued.
    pub fn pump(&mut self, wait: StdDuration) -> bool {
        let event = match &self.state {
            State::Idle => return false,
            State::Tracking(active) => {
                let until_tick: StdDuration = (active.next_tick - self.clock.now())
                    .try_into()
                    .unwrap_or(StdDuration::ZERO);
                let timeout = wait.min(until_tick);

                if timeout.is_zero() {
                    match active.events.try_recv() {
                        Ok(event) => Some(Ok(event)),
                        Err(TryRecvError::Empty) => None,
                        Err(TryRecvError::Disconnected) => Some(Err(())),
                    }
                } else {
                    match active.events.recv_timeout(timeout) {
                        Ok(event) => Some(Ok(event)),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => Some(Err(())),
                    }
                }
            }
        };

        let open = match event {
            Some(Ok(FixEvent::Position(fix))) => {
                self.on_fix(&fix);
                true
            }
            Some(Ok(FixEvent::Failure(message))) => {
                self.on_error(&message);
                true
            }
            Some(Err(())) => false,
            None => true,
        };

        self.tick_if_due();

        open
    }

    fn tick_if_due(&mut self) {
        let now = self.clock.now();

        let due = match &mut self.state {
            State::Tracking(active) if active.next_tick <= now => {
                while active.next_tick <= now {
                    active.next_tick += TICK_PERIOD;
                }
                true
            }
            _ => false,
        };

        if due {
            self.tick();
        }
    }
}

impl<C: Clock> Drop for SessionController<C> {
    fn drop(&mut self) {
        self.stop();
    }
}
