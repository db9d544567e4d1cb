//! Periodic sync scheduling.
//!
//! [`Scheduler::run`] calls a sync function once at start, then after every
//! interval (with jitter), backing off exponentially while ticks fail. A
//! [`SchedulerHandle`] controls a running scheduler over an mpsc channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

/// Timing and failure policy.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Base interval between ticks.
    pub interval: Duration,
    /// Maximum jitter as a fraction of the interval.
    pub jitter_fraction: f64,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Consecutive failures after which ticks are no longer attempted.
    pub max_consecutive_failures: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(900),
            jitter_fraction: 0.1,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(900),
            backoff_multiplier: 2.0,
            max_consecutive_failures: 10,
        }
    }
}

impl SchedulerConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_max_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    /// Interval plus a jitter in `[-fraction, +fraction]` of it.
    pub fn next_delay(&self) -> Duration {
        let base = self.interval.as_secs_f64();
        let jitter = jitter(base * self.jitter_fraction);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// Delay after `failures` consecutive failed ticks.
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX);
        let delay = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }
}

/// Value in `[-range, range]` derived from the clock's sub-second part.
fn jitter(range: f64) -> f64 {
    let nanos = Utc::now().timestamp_subsec_nanos();
    let unit = f64::from(nanos) / 1_000_000_000.0;
    (unit * 2.0 - 1.0) * range
}

/// Commands accepted by a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Run a tick now.
    SyncNow,
    Pause,
    Resume,
    Stop,
}

/// Observable scheduler state.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    pub paused: bool,
    pub consecutive_failures: u32,
    /// Ticks attempted so far.
    pub runs: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SchedulerState {
    pub fn record_success(&mut self) {
        let now = Utc::now();
        self.runs += 1;
        self.consecutive_failures = 0;
        self.last_success = Some(now);
        self.last_attempt = Some(now);
        self.last_error = None;
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.runs += 1;
        self.consecutive_failures += 1;
        self.last_attempt = Some(Utc::now());
        self.last_error = Some(error.into());
    }
}

pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Drives a sync function on a timer.
pub struct Scheduler {
    config: SchedulerConfig,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            state: Arc::new(RwLock::new(SchedulerState::default())),
            command_tx,
            command_rx,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    pub fn state(&self) -> SharedSchedulerState {
        self.state.clone()
    }

    /// Runs until [`SchedulerCommand::Stop`] or until every handle is dropped.
    ///
    /// `sync_fn` returns `Err` with a message when a tick failed.
    pub async fn run<F, Fut>(self, sync_fn: F)
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), String>> + Send,
    {
        let Self {
            config,
            state,
            command_tx,
            mut command_rx,
        } = self;
        // Only external handles keep the channel open.
        drop(command_tx);

        info!(interval_secs = config.interval.as_secs(), "scheduler started");
        tick(&config, &state, &sync_fn).await;

        loop {
            let delay = next_delay(&config, &state).await;
            debug!(delay_secs = delay.as_secs(), "next sync scheduled");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if state.read().await.paused {
                        debug!("scheduler paused, skipping tick");
                        continue;
                    }
                    tick(&config, &state, &sync_fn).await;
                }
                command = command_rx.recv() => match command {
                    Some(SchedulerCommand::SyncNow) => {
                        debug!("sync requested");
                        tick(&config, &state, &sync_fn).await;
                    }
                    Some(SchedulerCommand::Pause) => {
                        info!("scheduler paused");
                        state.write().await.paused = true;
                    }
                    Some(SchedulerCommand::Resume) => {
                        info!("scheduler resumed");
                        state.write().await.paused = false;
                    }
                    Some(SchedulerCommand::Stop) | None => {
                        info!("scheduler stopping");
                        break;
                    }
                },
            }
        }
    }
}

async fn next_delay(config: &SchedulerConfig, state: &SharedSchedulerState) -> Duration {
    let failures = state.read().await.consecutive_failures;
    if failures > 0 {
        let backoff = config.backoff_delay(failures);
        debug!(failures, backoff_secs = backoff.as_secs(), "backing off");
        return backoff;
    }
    config.next_delay()
}

async fn tick<F, Fut>(config: &SchedulerConfig, state: &SharedSchedulerState, sync_fn: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    let failures = state.read().await.consecutive_failures;
    if failures >= config.max_consecutive_failures {
        error!(
            failures,
            max = config.max_consecutive_failures,
            "too many consecutive failures, not syncing"
        );
        return;
    }

    match sync_fn().await {
        Ok(()) => {
            debug!("scheduled sync succeeded");
            state.write().await.record_success();
        }
        Err(e) => {
            warn!(error = %e, "scheduled sync failed");
            state.write().await.record_failure(e);
        }
    }
}

/// Controls a running [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

impl SchedulerHandle {
    pub async fn send(
        &self,
        command: SchedulerCommand,
    ) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(command).await
    }

    pub async fn sync_now(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.send(SchedulerCommand::SyncNow).await
    }

    pub async fn pause(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.send(SchedulerCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.send(SchedulerCommand::Resume).await
    }

    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.send(SchedulerCommand::Stop).await
    }

    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_stays_within_jitter() {
        let config = SchedulerConfig::new(Duration::from_secs(100)).with_jitter(0.1);
        for _ in 0..20 {
            let secs = config.next_delay().as_secs_f64();
            assert!((90.0..=110.0).contains(&secs));
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = SchedulerConfig::default().with_backoff(
            Duration::from_secs(5),
            Duration::from_secs(60),
            2.0,
        );
        assert_eq!(config.backoff_delay(0), Duration::ZERO);
        assert_eq!(config.backoff_delay(1), Duration::from_secs(5));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(20));
        assert_eq!(config.backoff_delay(8), Duration::from_secs(60));
    }

    #[test]
    fn state_tracks_failures() {
        let mut state = SchedulerState::default();
        state.record_failure("boom");
        state.record_failure("boom");
        assert_eq!(state.consecutive_failures, 2);
        assert_eq!(state.last_error.as_deref(), Some("boom"));

        state.record_success();
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.runs, 3);
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn commands_control_the_loop() {
        let scheduler = Scheduler::new(SchedulerConfig::new(Duration::from_secs(3600)));
        let handle = scheduler.handle();
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();

        let task = tokio::spawn(scheduler.run(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.sync_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.pause().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_paused().await);
        handle.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_paused().await);

        handle.stop().await.unwrap();
        task.await.unwrap();
        assert_eq!(handle.state().await.runs, 2);
    }

    #[tokio::test]
    async fn failures_back_off_then_stop_at_limit() {
        let config = SchedulerConfig::new(Duration::from_secs(3600))
            .with_backoff(Duration::from_millis(5), Duration::from_millis(20), 2.0)
            .with_max_failures(3);
        let scheduler = Scheduler::new(config);
        let handle = scheduler.handle();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let task = tokio::spawn(scheduler.run(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("remote down".to_string())
            }
        }));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        let state = handle.state().await;
        assert_eq!(state.consecutive_failures, 3);
        assert_eq!(state.last_error.as_deref(), Some("remote down"));

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn dropping_handles_stops_the_loop() {
        let scheduler = Scheduler::new(SchedulerConfig::new(Duration::from_secs(3600)));
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run(|| async { Ok(()) }));
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(handle);
        task.await.unwrap();
    }
}
