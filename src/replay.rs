//! Paced replay of historical events.
//!
//! [`replay`] delivers a time-ordered slice of events to a callback, waiting
//! between deliveries for the gap between their `occurred_at` stamps divided
//! by a speed factor. [`spawn_replay`] runs the same loop on a Tokio task
//! and returns a [`ReplayHandle`] for cancelling it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{info, trace};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::error::ReplayError;
use crate::event::StoredEvent;
use crate::time::Timestamp;

/// Configuration for a replay.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lotfold::ReplayConfig;
///
/// let config = ReplayConfig::with_speed(4.0);
/// assert_eq!(config.speed, 4.0);
/// assert_eq!(config.poll_interval, Duration::from_millis(50));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    /// Time multiplier. `2.0` replays twice as fast as the events happened.
    /// Must be positive and finite.
    ///
    /// Default: 1.0.
    pub speed: f64,

    /// Longest uninterrupted sleep. Waits longer than this are split, and
    /// the abort predicate is checked between slices, so an abort takes
    /// effect within roughly one interval however far apart events are.
    ///
    /// Default: 50 milliseconds.
    pub poll_interval: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl ReplayConfig {
    /// Default configuration at the given speed.
    pub fn with_speed(speed: f64) -> Self {
        Self {
            speed,
            ..Self::default()
        }
    }

    /// Check that the speed is positive and finite and the poll interval is
    /// non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::InvalidSpeed`] or
    /// [`ReplayError::InvalidPollInterval`].
    pub fn validate(&self) -> Result<(), ReplayError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ReplayError::InvalidSpeed { speed: self.speed });
        }
        if self.poll_interval.is_zero() {
            return Err(ReplayError::InvalidPollInterval);
        }
        Ok(())
    }

    /// How long to wait for a gap of `delta_millis` of event time. Zero for
    /// simultaneous or backwards steps.
    fn scaled_wait(&self, delta_millis: i64) -> Duration {
        if delta_millis <= 0 {
            return Duration::ZERO;
        }
        let seconds = delta_millis as f64 / 1000.0 / self.speed;
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

/// How a replay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Every event was delivered.
    Completed {
        /// Number of events delivered.
        delivered: usize,
    },
    /// The abort predicate fired; no event was delivered after that.
    Aborted {
        /// Number of events delivered before the abort.
        delivered: usize,
    },
}

impl ReplayOutcome {
    /// Number of events delivered.
    pub const fn delivered(&self) -> usize {
        match self {
            ReplayOutcome::Completed { delivered } | ReplayOutcome::Aborted { delivered } => {
                *delivered
            }
        }
    }

    /// `true` if the replay stopped early.
    pub const fn is_aborted(&self) -> bool {
        matches!(self, ReplayOutcome::Aborted { .. })
    }
}

/// Deliver `events` to `on_event`, paced by their `occurred_at` gaps.
///
/// `events` must already be in time order (as returned by
/// [`EventLog::query_by_time`](crate::EventLog::query_by_time)). The first
/// event is delivered at once; each later event after
/// `(occurred_at[i] - occurred_at[i - 1]) / speed`. `is_aborted` is checked
/// before every wait, between wait slices, and before every delivery. An
/// abort ends the replay with [`ReplayOutcome::Aborted`].
///
/// Timing is "no earlier than": deliveries may lag behind the schedule by
/// the runtime's timer jitter.
///
/// # Errors
///
/// Returns a [`ReplayError`] if `config` fails
/// [`ReplayConfig::validate`]. Nothing is delivered in that case.
pub async fn replay<F, A>(
    events: Vec<StoredEvent>,
    config: &ReplayConfig,
    mut on_event: F,
    is_aborted: A,
) -> Result<ReplayOutcome, ReplayError>
where
    F: FnMut(StoredEvent),
    A: Fn() -> bool,
{
    config.validate()?;

    let total = events.len();
    info!(
        "lotfold: replay of {total} events started at {}x",
        config.speed
    );

    let mut delivered = 0;
    let mut previous: Option<Timestamp> = None;
    for event in events {
        if let Some(previous) = previous {
            let wait = config.scaled_wait(previous.millis_until(&event.occurred_at));
            if !wait.is_zero() {
                if is_aborted() {
                    return Ok(aborted(delivered, total));
                }
                trace!("lotfold: replay waiting {wait:?}");
                if !pause(wait, config.poll_interval, &is_aborted).await {
                    return Ok(aborted(delivered, total));
                }
            }
        }
        if is_aborted() {
            return Ok(aborted(delivered, total));
        }
        previous = Some(event.occurred_at);
        on_event(event);
        delivered += 1;
    }

    info!("lotfold: replay completed, {delivered} events delivered");
    Ok(ReplayOutcome::Completed { delivered })
}

fn aborted(delivered: usize, total: usize) -> ReplayOutcome {
    info!("lotfold: replay aborted after {delivered} of {total} events");
    ReplayOutcome::Aborted { delivered }
}

/// Sleep for `wait` in slices of at most `poll_interval`. Returns `false`
/// if `is_aborted` fired along the way.
async fn pause<A>(wait: Duration, poll_interval: Duration, is_aborted: &A) -> bool
where
    A: Fn() -> bool,
{
    // `None` means the deadline is beyond what `Instant` can represent.
    let deadline = Instant::now().checked_add(wait);
    loop {
        let now = Instant::now();
        let slice_end = now.checked_add(poll_interval);
        let next = match (deadline, slice_end) {
            (Some(deadline), _) if deadline <= now => return true,
            (Some(deadline), Some(slice_end)) => deadline.min(slice_end),
            (Some(deadline), None) => deadline,
            (None, Some(slice_end)) => slice_end,
            (None, None) => now,
        };
        time::sleep_until(next).await;
        if is_aborted() {
            return false;
        }
    }
}

/// Shared cancellation token for a replay.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    /// A flag that is not yet raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// `true` once [`abort`](AbortFlag::abort) has been called on any clone.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle to a replay running on a Tokio task.
///
/// Dropping the handle does **not** stop the replay; call
/// [`abort`](ReplayHandle::abort).
#[derive(Debug)]
pub struct ReplayHandle {
    abort: AbortFlag,
    task: JoinHandle<Result<ReplayOutcome, ReplayError>>,
}

impl ReplayHandle {
    /// Ask the replay to stop. It does so at its next check, within about
    /// one poll interval, and delivers nothing further.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// `true` once [`abort`](ReplayHandle::abort) has been requested.
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// A clone of the cancellation token, e.g. for a connection-closed
    /// hook.
    pub fn abort_flag(&self) -> AbortFlag {
        self.abort.clone()
    }

    /// `true` if the replay task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the replay to end and return its outcome.
    ///
    /// # Errors
    ///
    /// Returns the replay's own [`ReplayError`], or
    /// [`ReplayError::TaskFailed`] if the task panicked or was cancelled.
    pub async fn join(self) -> Result<ReplayOutcome, ReplayError> {
        self.task
            .await
            .map_err(|e| ReplayError::TaskFailed(e.to_string()))?
    }
}

/// Run [`replay`] on a new Tokio task.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
///
/// # Examples
///
/// ```
/// use lotfold::{spawn_replay, ReplayConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let handle = spawn_replay(Vec::new(), ReplayConfig::default(), |_event| {});
/// let outcome = handle.join().await.unwrap();
/// assert_eq!(outcome.delivered(), 0);
/// # }
/// ```
pub fn spawn_replay<F>(events: Vec<StoredEvent>, config: ReplayConfig, on_event: F) -> ReplayHandle
where
    F: FnMut(StoredEvent) + Send + 'static,
{
    let abort = AbortFlag::new();
    let flag = abort.clone();
    let task = tokio::spawn(async move {
        replay(events, &config, on_event, move || flag.is_aborted()).await
    });
    ReplayHandle { abort, task }
}
