//! Stream Poller
//!
//! Periodically pulls one packet from a [`PacketSource`] into a bounded
//! [`Feed`] and broadcasts each new entry to subscribers.
//!
//! Ticks are driven by a single sequential loop: the next tick is not awaited
//! until the current request has finished, and missed ticks are skipped, so
//! there is never more than one request outstanding. The first request goes
//! out one full period after [`StreamPoller::start`].

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::feed::{Feed, FeedEntry};
use super::source::PacketSource;
use crate::config::MonitorConfig;

/// Reason sent with [`StreamEvent::Stopped`] after [`StreamPoller::stop`]
pub const STOPPED_BY_USER: &str = "Stopped";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerState {
    Idle,
    Running,
}

/// Events published by the poller
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A packet was added to the head of the feed
    Packet(FeedEntry),
    /// The poller returned to idle
    Stopped { reason: String },
}

struct Shared {
    state: PollerState,
    /// Bumped on every start and stop; a task only commits results for its own generation
    generation: u64,
    feed: Feed,
}

/// Interval-driven packet poller
pub struct StreamPoller {
    source: Arc<dyn PacketSource>,
    period: Duration,
    shared: Arc<Mutex<Shared>>,
    task: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<StreamEvent>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl StreamPoller {
    pub fn new(source: Arc<dyn PacketSource>, config: &MonitorConfig) -> Self {
        Self::with_settings(
            source,
            Duration::from_millis(config.stream_interval_ms),
            config.feed_capacity,
        )
    }

    pub fn with_settings(source: Arc<dyn PacketSource>, period: Duration, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(64);
        let period = period.max(Duration::from_millis(1));

        Self {
            source,
            period,
            shared: Arc::new(Mutex::new(Shared {
                state: PollerState::Idle,
                generation: 0,
                feed: Feed::new(capacity),
            })),
            task: Mutex::new(None),
            events,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> PollerState {
        lock(&self.shared).state
    }

    pub fn is_running(&self) -> bool {
        self.state() == PollerState::Running
    }

    /// Feed contents, newest first
    pub fn snapshot(&self) -> Vec<FeedEntry> {
        lock(&self.shared).feed.to_vec()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }

    /// Begin polling. Returns `false` without side effects if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let generation = {
            let mut shared = lock(&self.shared);
            if shared.state == PollerState::Running {
                tracing::debug!("Poller already running, start ignored");
                return false;
            }
            shared.generation += 1;
            shared.state = PollerState::Running;
            shared.feed.clear();
            shared.generation
        };

        let handle = tokio::spawn(run(
            Arc::clone(&self.source),
            Arc::clone(&self.shared),
            self.events.clone(),
            self.period,
            generation,
        ));

        if let Some(previous) = lock(&self.task).replace(handle) {
            previous.abort();
        }

        tracing::info!(
            period_ms = self.period.as_millis() as u64,
            generation,
            "Stream polling started"
        );
        true
    }

    /// Stop polling and cancel any in-flight request. Idempotent.
    pub fn stop(&self) {
        let was_running = {
            let mut shared = lock(&self.shared);
            let was_running = shared.state == PollerState::Running;
            shared.state = PollerState::Idle;
            shared.generation += 1;
            was_running
        };

        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }

        if was_running {
            tracing::info!("Stream polling stopped");
            let _ = self.events.send(StreamEvent::Stopped {
                reason: STOPPED_BY_USER.to_string(),
            });
        }
    }
}

impl Drop for StreamPoller {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
    }
}

async fn run(
    source: Arc<dyn PacketSource>,
    shared: Arc<Mutex<Shared>>,
    events: broadcast::Sender<StreamEvent>,
    period: Duration,
    generation: u64,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let result = source.next_packet().await;

        let committed = {
            let mut guard = lock(&shared);
            if guard.generation != generation || guard.state != PollerState::Running {
                tracing::debug!(generation, "Discarding result from stale poll");
                return;
            }
            match result {
                Ok(packet) => Ok(guard.feed.push(packet)),
                Err(e) => {
                    guard.state = PollerState::Idle;
                    Err(e)
                }
            }
        };

        match committed {
            Ok(entry) => {
                tracing::debug!(
                    sequence = entry.sequence,
                    prediction = entry.packet.prediction,
                    "Packet received"
                );
                let _ = events.send(StreamEvent::Packet(entry));
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(error = %reason, "Stream polling stopped after failed request");
                let _ = events.send(StreamEvent::Stopped { reason });
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ApiResult, StreamPacket};
    use async_trait::async_trait;
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_millis(2000);

    /// Counts calls, optionally failing on one and taking `delay` per call
    #[derive(Default)]
    struct FakeSource {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_on: Option<usize>,
        delay: Duration,
    }

    #[async_trait]
    impl PacketSource for FakeSource {
        async fn next_packet(&self) -> ApiResult<StreamPacket> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on == Some(call) {
                return Err(ApiError::Api {
                    status: 500,
                    message: "Stream request failed".to_string(),
                });
            }

            Ok(StreamPacket {
                timestamp: None,
                prediction: (call % 2) as u8,
                prediction_label: None,
                probability: 0.6,
                confidence: 0.2,
                actual_label: None,
                extra: Map::new(),
            })
        }
    }

    fn poller(source: Arc<FakeSource>) -> StreamPoller {
        StreamPoller::with_settings(source, PERIOD, 20)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let source = Arc::new(FakeSource::default());
        let poller = poller(source.clone());

        assert!(poller.start());
        sleep(PERIOD - Duration::from_millis(1)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(2)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.snapshot().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_capped_at_twenty() {
        let source = Arc::new(FakeSource::default());
        let poller = poller(source);
        let mut events = poller.subscribe();

        poller.start();
        let mut received = 0;
        while received < 25 {
            if let StreamEvent::Packet(entry) = events.recv().await.unwrap() {
                received += 1;
                assert_eq!(entry.sequence, received);
                assert!(poller.snapshot().len() <= 20);
            }
        }

        let feed = poller.snapshot();
        assert_eq!(feed.len(), 20);
        assert_eq!(feed[0].sequence, 25);
        assert_eq!(feed[19].sequence, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_capacity_never_exceeds_twenty() {
        let config = MonitorConfig {
            feed_capacity: 50,
            ..Default::default()
        };
        let poller = StreamPoller::new(Arc::new(FakeSource::default()), &config);

        poller.start();
        sleep(poller.period() * 40 + poller.period() / 2).await;

        let feed = poller.snapshot();
        assert_eq!(feed.len(), 20);
        assert_eq!(feed[0].sequence, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_creates_one_timer() {
        let source = Arc::new(FakeSource::default());
        let poller = poller(source.clone());

        assert!(poller.start());
        assert!(!poller.start());

        sleep(PERIOD * 5 + PERIOD / 2).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 5);
        assert_eq!(poller.snapshot().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_and_restart_resets_feed() {
        let source = Arc::new(FakeSource::default());
        let poller = poller(source.clone());
        let mut events = poller.subscribe();

        poller.start();
        sleep(PERIOD * 3 + PERIOD / 2).await;
        assert_eq!(poller.snapshot().len(), 3);

        poller.stop();
        poller.stop();
        assert_eq!(poller.state(), PollerState::Idle);

        sleep(PERIOD * 3).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);

        assert!(poller.start());
        assert!(poller.snapshot().is_empty());

        sleep(PERIOD + PERIOD / 2).await;
        let feed = poller.snapshot();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].sequence, 1);

        let mut stopped = 0;
        while let Ok(event) = events.try_recv() {
            if let StreamEvent::Stopped { reason } = event {
                assert_eq!(reason, STOPPED_BY_USER);
                stopped += 1;
            }
        }
        assert_eq!(stopped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_returns_to_idle() {
        let source = Arc::new(FakeSource {
            fail_on: Some(3),
            ..Default::default()
        });
        let poller = poller(source.clone());
        let mut events = poller.subscribe();

        poller.start();
        loop {
            match events.recv().await.unwrap() {
                StreamEvent::Packet(_) => continue,
                StreamEvent::Stopped { reason } => {
                    assert_eq!(reason, "Stream request failed");
                    break;
                }
            }
        }

        assert_eq!(poller.state(), PollerState::Idle);
        assert_eq!(poller.snapshot().len(), 2);

        sleep(PERIOD * 4).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_requests_never_overlap() {
        let source = Arc::new(FakeSource {
            delay: PERIOD * 2 + PERIOD / 2,
            ..Default::default()
        });
        let poller = poller(source.clone());

        poller.start();
        sleep(PERIOD * 20).await;
        poller.stop();

        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(source.calls.load(Ordering::SeqCst) >= 5);
    }
}
