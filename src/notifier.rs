//! Notification pipeline composition root.
//!
//! `notify()` is the single upstream entry point: route, format, admit,
//! dispatch. Deliveries for one payload fan out concurrently; jobs that
//! the rate limiter rejects are parked on a bounded overflow queue and
//! drained by a background task once capacity refills. Nothing in this
//! module returns an error to the caller — notification failures must
//! never propagate as pipeline failures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;
use crate::dispatch::Dispatcher;
use crate::limiter::RateLimiter;
use crate::models::{NotificationPayload, NotificationResult, Platform, Priority};
use crate::platform::{slack, teams};
use crate::router::ChannelRouter;

/// Poll interval for the overflow-queue drain task.
const DRAIN_INTERVAL: Duration = Duration::from_millis(250);

/// One formatted delivery awaiting an HTTP send.
#[derive(Debug, Clone)]
struct DeliveryJob {
    platform: Platform,
    channel: String,
    endpoint: String,
    body: Value,
    priority: Priority,
}

/// Bounded FIFO for rate-limited deliveries.
///
/// Overflow drops the oldest queued item: all queued jobs are
/// non-critical (critical payloads bypass admission entirely), so the
/// newest signal wins.
#[derive(Debug)]
struct OverflowQueue {
    items: Mutex<VecDeque<DeliveryJob>>,
    capacity: usize,
}

impl OverflowQueue {
    fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Push a job, returning the evicted oldest job on overflow.
    fn push(&self, job: DeliveryJob) -> Option<DeliveryJob> {
        let mut items = self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let evicted = if items.len() >= self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(job);
        evicted
    }

    fn pop(&self) -> Option<DeliveryJob> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
    }

    fn push_front(&self, job: DeliveryJob) {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_front(job);
    }

    fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Atomic delivery counters for the command gateway and logs.
#[derive(Debug, Default)]
struct DeliveryStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    slack_last_error: Mutex<Option<String>>,
    teams_last_error: Mutex<Option<String>>,
}

impl DeliveryStats {
    fn record(&self, result: &NotificationResult) {
        if result.success {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
            let slot = match result.platform {
                Platform::Slack => &self.slack_last_error,
                Platform::Teams => &self.teams_last_error,
            };
            *slot
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = result.error.clone();
        }
    }

    fn last_error(&self, platform: Platform) -> Option<String> {
        let slot = match platform {
            Platform::Slack => &self.slack_last_error,
            Platform::Teams => &self.teams_last_error,
        };
        slot.lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

/// Point-in-time health for one platform, consumed by the `health` command.
#[derive(Debug, Clone)]
pub struct PlatformHealth {
    /// Platform this row describes.
    pub platform: Platform,
    /// Whether deliveries are enabled.
    pub enabled: bool,
    /// Whole rate-limit tokens currently available.
    pub tokens_available: u64,
    /// Most recent delivery error, if any.
    pub last_error: Option<String>,
}

/// Point-in-time gateway status, consumed by the `status` command.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Seconds since the notifier was constructed.
    pub uptime_secs: u64,
    /// Successful deliveries.
    pub delivered: u64,
    /// Deliveries that exhausted retries or hit permanent errors.
    pub failed: u64,
    /// Jobs evicted from the overflow queue.
    pub dropped: u64,
    /// Jobs currently parked on the overflow queue.
    pub queue_depth: usize,
    /// Per-platform health rows.
    pub platforms: Vec<PlatformHealth>,
}

/// Notification dispatch pipeline.
pub struct Notifier {
    config: Arc<NotificationConfig>,
    slack_router: ChannelRouter,
    teams_router: ChannelRouter,
    limiter: RateLimiter,
    dispatcher: Dispatcher,
    queue: OverflowQueue,
    stats: DeliveryStats,
    started_at: Instant,
}

impl Notifier {
    /// Compile routers and build the pipeline from loaded configuration.
    #[must_use]
    pub fn new(config: Arc<NotificationConfig>) -> Self {
        let slack_router = ChannelRouter::compile(Platform::Slack, &config.slack);
        let teams_router = ChannelRouter::compile(Platform::Teams, &config.teams);
        let limiter = RateLimiter::new(config.slack.rate_limit_rpm, config.teams.rate_limit_rpm);
        let dispatcher = Dispatcher::new(&config.delivery);
        let queue = OverflowQueue::new(config.delivery.queue_capacity);
        Self {
            config,
            slack_router,
            teams_router,
            limiter,
            dispatcher,
            queue,
            stats: DeliveryStats::default(),
            started_at: Instant::now(),
        }
    }

    /// Dispatch a payload to every routed channel on every enabled platform.
    ///
    /// Returns the results of deliveries admitted immediately. Jobs the
    /// rate limiter rejects are parked on the overflow queue; their
    /// results surface later through stats and logs (the producer
    /// contract is fire-and-forget). This function never fails.
    pub async fn notify(&self, payload: &NotificationPayload) -> Vec<NotificationResult> {
        if !self.config.delivery.enabled_events.contains(&payload.event) {
            debug!(event = ?payload.event, payload_id = %payload.id, "event not enabled; skipped");
            return Vec::new();
        }

        let mut admitted: Vec<DeliveryJob> = Vec::new();
        for job in self.build_jobs(payload) {
            if self.limiter.try_acquire(job.platform, job.priority) {
                admitted.push(job);
            } else {
                info!(
                    platform = %job.platform,
                    channel = %job.channel,
                    payload_id = %payload.id,
                    "rate limit exhausted; delivery queued"
                );
                if let Some(evicted) = self.queue.push(job) {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    info!(
                        platform = %evicted.platform,
                        channel = %evicted.channel,
                        "overflow queue full; oldest queued delivery dropped"
                    );
                }
            }
        }

        let sends = admitted.iter().map(|job| {
            self.dispatcher
                .deliver(job.platform, &job.channel, &job.endpoint, &job.body)
        });
        let results = join_all(sends).await;
        for result in &results {
            self.stats.record(result);
        }
        results
    }

    /// Spawn the background task that drains the overflow queue.
    pub fn spawn_drain(self: Arc<Self>, ct: CancellationToken) -> JoinHandle<()> {
        let notifier = self;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = ct.cancelled() => break,
                    () = sleep(DRAIN_INTERVAL) => {}
                }

                while let Some(job) = notifier.queue.pop() {
                    if notifier.limiter.try_acquire(job.platform, job.priority) {
                        let result = notifier
                            .dispatcher
                            .deliver(job.platform, &job.channel, &job.endpoint, &job.body)
                            .await;
                        notifier.stats.record(&result);
                    } else {
                        // Still over the limit; park it again and wait for
                        // the next refill window.
                        notifier.queue.push_front(job);
                        break;
                    }
                }
            }
            info!("overflow drain task exiting");
        })
    }

    /// Current pipeline status for the command gateway.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
            queue_depth: self.queue.len(),
            platforms: [Platform::Slack, Platform::Teams]
                .into_iter()
                .map(|platform| PlatformHealth {
                    platform,
                    enabled: self.platform_config(platform).enabled,
                    tokens_available: self.limiter.available(platform),
                    last_error: self.stats.last_error(platform),
                })
                .collect(),
        }
    }

    fn platform_config(&self, platform: Platform) -> &crate::config::PlatformConfig {
        match platform {
            Platform::Slack => &self.config.slack,
            Platform::Teams => &self.config.teams,
        }
    }

    fn build_jobs(&self, payload: &NotificationPayload) -> Vec<DeliveryJob> {
        let mut jobs = Vec::new();
        for (platform, router) in [
            (Platform::Slack, &self.slack_router),
            (Platform::Teams, &self.teams_router),
        ] {
            if !self.platform_config(platform).enabled {
                continue;
            }
            for channel in router.route(payload) {
                let Some(endpoint) = self.endpoint_for(platform, &channel) else {
                    warn!(%platform, channel, "no webhook endpoint configured; delivery skipped");
                    continue;
                };
                let body = match platform {
                    Platform::Slack => serde_json::to_value(slack::format(payload, &channel)),
                    Platform::Teams => serde_json::to_value(teams::format(payload, &channel)),
                };
                match body {
                    Ok(body) => jobs.push(DeliveryJob {
                        platform,
                        channel,
                        endpoint,
                        body,
                        priority: payload.priority,
                    }),
                    Err(err) => {
                        // Serialization of a formatter value cannot fail in
                        // practice; guard anyway so a bug here drops one
                        // message instead of the pipeline.
                        warn!(%platform, channel, %err, "failed to serialize message body");
                    }
                }
            }
        }
        jobs
    }

    /// Resolve the HTTP endpoint for a (platform, channel) pair.
    ///
    /// Slack posts everything to the platform webhook with the channel in
    /// the body. Teams webhooks are channel-scoped, so a mapping whose
    /// channel is itself a URL is used directly.
    fn endpoint_for(&self, platform: Platform, channel: &str) -> Option<String> {
        let config = self.platform_config(platform);
        match platform {
            Platform::Slack => {
                (!config.webhook_url.is_empty()).then(|| config.webhook_url.clone())
            }
            Platform::Teams => {
                if channel.starts_with("https://") || channel.starts_with("http://") {
                    Some(channel.to_owned())
                } else {
                    (!config.webhook_url.is_empty()).then(|| config.webhook_url.clone())
                }
            }
        }
    }
}
