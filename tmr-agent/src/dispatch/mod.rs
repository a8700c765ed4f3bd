/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::num::NonZeroUsize;
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;

use slog::{Logger, debug, error, info, o, warn};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::sample::{Sampler, Snapshot};

pub trait SnapshotSource: Send + Sync + 'static {
    fn sample(&self) -> Snapshot;
}

impl SnapshotSource for Sampler {
    fn sample(&self) -> Snapshot {
        Sampler::sample(self)
    }
}

pub trait SnapshotSink: Send + Sync + 'static {
    /// Send one snapshot as a single payload.
    ///
    /// `quit` only stops waiting between retries, an attempt in progress is
    /// completed.
    fn deliver(
        &self,
        snapshot: &Snapshot,
        quit: &CancellationToken,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl AddAssign for DispatchSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.delivered += rhs.delivered;
        self.failed += rhs.failed;
        self.skipped += rhs.skipped;
    }
}

/// Samples on a timer and hands snapshots to a fixed pool of workers.
///
/// The queue between them holds at most `rate_limit` snapshots. When it is
/// full the producer waits, so no snapshot is ever dropped while running.
pub struct Dispatcher<S, K> {
    source: Arc<S>,
    sink: Arc<K>,
    poll_interval: Duration,
    rate_limit: NonZeroUsize,
    state: watch::Sender<DispatcherState>,
    logger: Logger,
}

impl<S, K> Dispatcher<S, K>
where
    S: SnapshotSource,
    K: SnapshotSink,
{
    pub fn new(
        source: Arc<S>,
        sink: Arc<K>,
        poll_interval: Duration,
        rate_limit: NonZeroUsize,
        logger: Logger,
    ) -> Self {
        let (state, _) = watch::channel(DispatcherState::Idle);
        Dispatcher {
            source,
            sink,
            poll_interval,
            rate_limit,
            state,
            logger,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DispatcherState> {
        self.state.subscribe()
    }

    /// Run until `quit` is cancelled, then deliver what is still queued.
    pub async fn run(self, quit: CancellationToken) -> DispatchSummary {
        let (sender, receiver) = flume::bounded::<Snapshot>(self.rate_limit.get());

        let mut workers = JoinSet::new();
        for id in 0..self.rate_limit.get() {
            let worker = Worker {
                id,
                receiver: receiver.clone(),
                sink: self.sink.clone(),
                quit: quit.clone(),
                logger: self.logger.new(o!("worker" => id)),
            };
            workers.spawn(worker.into_running());
        }
        drop(receiver);

        self.state.send_replace(DispatcherState::Running);
        info!(self.logger, "dispatcher started";
            "poll_interval" => ?self.poll_interval,
            "workers" => self.rate_limit.get());

        self.produce(sender, &quit).await;

        self.state.send_replace(DispatcherState::Draining);
        debug!(self.logger, "draining queued snapshots");

        let mut summary = DispatchSummary::default();
        while let Some(r) = workers.join_next().await {
            match r {
                Ok(s) => summary += s,
                Err(e) => error!(self.logger, "delivery worker exited abnormally: {e}"),
            }
        }

        self.state.send_replace(DispatcherState::Stopped);
        info!(self.logger, "dispatcher stopped";
            "delivered" => summary.delivered,
            "failed" => summary.failed,
            "skipped" => summary.skipped);
        summary
    }

    async fn produce(&self, sender: flume::Sender<Snapshot>, quit: &CancellationToken) {
        let mut interval =
            tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = quit.cancelled() => break,
                _ = interval.tick() => {}
            }

            let snapshot = self.source.sample();
            tokio::select! {
                biased;

                _ = quit.cancelled() => {
                    debug!(self.logger, "queue full at shutdown, snapshot dropped");
                    break;
                }
                r = sender.send_async(snapshot) => {
                    if r.is_err() {
                        warn!(self.logger, "all delivery workers are gone");
                        break;
                    }
                }
            }
        }
        // dropping the sender closes the queue, workers exit once it is empty
    }
}

struct Worker<K> {
    id: usize,
    receiver: flume::Receiver<Snapshot>,
    sink: Arc<K>,
    quit: CancellationToken,
    logger: Logger,
}

impl<K: SnapshotSink> Worker<K> {
    async fn into_running(self) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        while let Ok(snapshot) = self.receiver.recv_async().await {
            if snapshot.is_empty() {
                summary.skipped += 1;
                continue;
            }
            match self.sink.deliver(&snapshot, &self.quit).await {
                Ok(_) => {
                    summary.delivered += 1;
                    debug!(self.logger, "delivered {} metrics", snapshot.len());
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(self.logger, "Worker#{} failed to deliver snapshot: {e:?}", self.id);
                }
            }
        }
        summary
    }
}
