//! Bounded analytics task queue
//!
//! The dispatcher never waits on analytics: [`AnalyticsQueue::submit`] uses
//! `try_send` and drops the event when the queue is full. A fixed set of
//! workers share one receiver and run each event to completion, so a client
//! disconnect can never cut a write short.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{Local, NaiveDate};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{AccessLogWriter, BandwidthDelta, RecordOutcome, TrafficAggregator, TrafficPeriod};
use crate::config::AnalyticsConfig;

/// Work item produced by one proxied request
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent {
    Access {
        routing_target_id: i64,
        client_ip: String,
        user_agent: String,
    },
    DailyHit {
        date: NaiveDate,
    },
    Bandwidth {
        period: TrafficPeriod,
        delta: BandwidthDelta,
    },
}

impl AnalyticsEvent {
    /// Hit for today, local time.
    pub fn daily_hit() -> Self {
        AnalyticsEvent::DailyHit {
            date: Local::now().date_naive(),
        }
    }

    pub fn bandwidth(delta: BandwidthDelta) -> Self {
        AnalyticsEvent::Bandwidth {
            period: TrafficPeriod::current(),
            delta,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AnalyticsEvent::Access { .. } => "access",
            AnalyticsEvent::DailyHit { .. } => "daily_hit",
            AnalyticsEvent::Bandwidth { .. } => "bandwidth",
        }
    }
}

type SharedReceiver = Arc<Mutex<mpsc::Receiver<AnalyticsEvent>>>;

pub struct AnalyticsQueue {
    /// `None` once shutdown has started; dropping the last sender lets the
    /// workers drain and exit.
    sender: ArcSwapOption<mpsc::Sender<AnalyticsEvent>>,
    receiver: SharedReceiver,
    workers: Mutex<Vec<JoinHandle<()>>>,
    dropped: AtomicU64,
    capacity: usize,
}

impl AnalyticsQueue {
    pub fn from_config(
        config: &AnalyticsConfig,
        writer: Arc<AccessLogWriter>,
        aggregator: Arc<TrafficAggregator>,
    ) -> Arc<Self> {
        Self::start(
            config.queue_capacity.max(1),
            config.workers.max(1),
            writer,
            aggregator,
        )
    }

    /// Spawn `workers` consumer tasks on the current tokio runtime.
    pub fn start(
        capacity: usize,
        workers: usize,
        writer: Arc<AccessLogWriter>,
        aggregator: Arc<TrafficAggregator>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(capacity);
        let rx: SharedReceiver = Arc::new(Mutex::new(rx));

        let handles = (0..workers)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    rx.clone(),
                    writer.clone(),
                    aggregator.clone(),
                ))
            })
            .collect();

        info!(
            "Analytics queue started (capacity: {}, workers: {})",
            capacity, workers
        );

        Arc::new(Self {
            sender: ArcSwapOption::from_pointee(tx),
            receiver: rx,
            workers: Mutex::new(handles),
            dropped: AtomicU64::new(0),
            capacity,
        })
    }

    /// Enqueue without waiting. Returns false when the event was dropped.
    pub fn submit(&self, event: AnalyticsEvent) -> bool {
        let guard = self.sender.load();
        let Some(tx) = guard.as_ref() else {
            debug!("Analytics queue closed, dropping {} event", event.kind());
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "Analytics queue full (capacity {}), dropping {} event ({} dropped so far)",
                    self.capacity,
                    event.kind(),
                    total
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Analytics queue closed, dropping {} event", event.kind());
                false
            }
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Events currently waiting for a worker.
    pub fn pending(&self) -> usize {
        self.sender
            .load()
            .as_ref()
            .map(|tx| self.capacity - tx.capacity())
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.load().is_none()
    }

    /// Stop accepting events and wait for the workers to drain the queue.
    ///
    /// Workers still running after `drain_timeout` are aborted; events they
    /// had not picked up are discarded and counted as dropped.
    pub async fn shutdown(&self, drain_timeout: Duration) {
        if self.sender.swap(None).is_none() {
            return;
        }

        let handles: Vec<_> = self.workers.lock().await.drain(..).collect();
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        info!("Draining analytics queue ({} workers)", handles.len());

        let drained =
            tokio::time::timeout(drain_timeout, futures_util::future::join_all(handles)).await;

        match drained {
            Ok(_) => info!("Analytics queue drained"),
            Err(_) => {
                warn!(
                    "Analytics queue drain exceeded {:?}, aborting workers",
                    drain_timeout
                );
                for abort in aborts {
                    abort.abort();
                }
            }
        }

        let lost = self.discard_unprocessed().await;
        if lost > 0 {
            self.dropped.fetch_add(lost, Ordering::Relaxed);
            warn!("{} analytics events discarded at shutdown", lost);
        }
    }

    async fn discard_unprocessed(&self) -> u64 {
        let mut rx = self.receiver.lock().await;
        let mut lost = 0;
        while rx.try_recv().is_ok() {
            lost += 1;
        }
        lost
    }
}

async fn worker_loop(
    id: usize,
    rx: SharedReceiver,
    writer: Arc<AccessLogWriter>,
    aggregator: Arc<TrafficAggregator>,
) {
    loop {
        // lock is held only for recv, processing runs concurrently
        let event = { rx.lock().await.recv().await };
        let Some(event) = event else {
            break;
        };

        handle_event(&writer, &aggregator, event).await;
    }

    trace!("Analytics worker {} exited", id);
}

async fn handle_event(writer: &AccessLogWriter, aggregator: &TrafficAggregator, event: AnalyticsEvent) {
    match event {
        AnalyticsEvent::Access {
            routing_target_id,
            client_ip,
            user_agent,
        } => match writer.record(routing_target_id, &client_ip, &user_agent).await {
            Ok(RecordOutcome::Written) => {}
            Ok(outcome) => debug!("Access from {} not logged: {:?}", client_ip, outcome),
            Err(e) => warn!(
                "Failed to write access log for routing target {}: {}",
                routing_target_id, e
            ),
        },
        AnalyticsEvent::DailyHit { date } => {
            if let Err(e) = aggregator.record_daily_hit_on(date).await {
                warn!("Failed to update daily traffic for {}: {}", date, e);
            }
        }
        AnalyticsEvent::Bandwidth { period, delta } => {
            if let Err(e) = aggregator.record_bandwidth_in(period, delta).await {
                warn!(
                    "Failed to update monthly traffic for user {}: {}",
                    delta.owner_user_id, e
                );
            }
        }
    }
}
