//! # Heartbeat
//!
//! Ping/Pong liveness timers for one session, driven by explicit `now`
//! values so the owner decides when time advances.
//!
//! ```text
//!  start            ping(t)           pong(t)            ping(t')
//!    │──interval──────▶│──── < timeout ───▶│ latency = now - t │──interval──▶ ...
//!                      │
//!                      └──── timeout elapsed, no pong ──▶ TimedOut
//! ```

use std::time::{Duration, Instant};

/// Heartbeat timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between pings.
    pub interval: Duration,
    /// Time a ping may go unanswered.
    pub timeout: Duration,
}

impl HeartbeatConfig {
    /// Creates a config from millisecond values.
    #[must_use]
    pub const fn from_millis(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::from_millis(
            jot_shared::DEFAULT_PING_INTERVAL_MS,
            jot_shared::DEFAULT_TIMEOUT_MS,
        )
    }
}

/// Something the owner must act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatEvent {
    /// Send a Ping carrying this timestamp (ms since start).
    SendPing(u64),
    /// The armed timeout elapsed without a Pong.
    TimedOut,
}

/// Interval + timeout timer pair.
#[derive(Debug)]
pub struct Heartbeat {
    config: HeartbeatConfig,
    /// Timestamps are measured from here.
    epoch: Instant,
    /// When the next ping is due. `None` once stopped.
    next_ping: Option<Instant>,
    /// When the outstanding ping times out. `None` when nothing is pending.
    pong_deadline: Option<Instant>,
    /// Last measured round trip.
    latency: Duration,
}

impl Heartbeat {
    /// Creates a stopped heartbeat.
    #[must_use]
    pub fn new(config: HeartbeatConfig, now: Instant) -> Self {
        Self {
            config: HeartbeatConfig {
                // a zero interval would reschedule onto `now` forever
                interval: config.interval.max(Duration::from_millis(1)),
                timeout: config.timeout,
            },
            epoch: now,
            next_ping: None,
            pong_deadline: None,
            latency: Duration::ZERO,
        }
    }

    /// Restarts both timers from `now` and clears the latency.
    pub fn start(&mut self, now: Instant) {
        self.epoch = now;
        self.next_ping = Some(now + self.config.interval);
        self.pong_deadline = None;
        self.latency = Duration::ZERO;
    }

    /// Cancels both timers.
    pub fn stop(&mut self) {
        self.next_ping = None;
        self.pong_deadline = None;
    }

    /// True while the interval timer is scheduled.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.next_ping.is_some()
    }

    /// Timing in effect.
    #[inline]
    #[must_use]
    pub fn config(&self) -> HeartbeatConfig {
        self.config
    }

    /// Last measured round trip.
    #[inline]
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Milliseconds elapsed since the heartbeat was started.
    #[must_use]
    pub fn timestamp(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.epoch).as_millis()).unwrap_or(u64::MAX)
    }

    /// Earliest instant at which [`Heartbeat::poll`] has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.next_ping, self.pong_deadline) {
            (Some(ping), Some(pong)) => Some(ping.min(pong)),
            (ping, pong) => ping.or(pong),
        }
    }

    /// Fires whichever timer is due, at most one per call.
    ///
    /// A timeout stops the heartbeat entirely. Call in a loop until `None`.
    pub fn poll(&mut self, now: Instant) -> Option<HeartbeatEvent> {
        if self.pong_deadline.is_some_and(|deadline| deadline <= now) {
            self.stop();
            return Some(HeartbeatEvent::TimedOut);
        }

        let due = self.next_ping.filter(|due| *due <= now)?;
        let mut next = due + self.config.interval;
        if next <= now {
            next = now + self.config.interval;
        }
        self.next_ping = Some(next);

        if self.pong_deadline.is_none() {
            self.pong_deadline = Some(now + self.config.timeout);
        }
        Some(HeartbeatEvent::SendPing(self.timestamp(now)))
    }

    /// Records a Pong echoing `echoed` and disarms the timeout.
    pub fn on_pong(&mut self, echoed: u64, now: Instant) -> Duration {
        self.pong_deadline = None;
        self.latency = Duration::from_millis(self.timestamp(now).saturating_sub(echoed));
        self.latency
    }
}
