//! Bounded worker pool over work items.
//!
//! A feeder pushes items into a bounded queue, `workers` tasks pull from it
//! and send completed items back over an unbounded channel. Only the
//! coordinator (the caller of [`Scheduler::run`]) touches the aggregator.

use std::sync::Arc;

use indicatif::ProgressBar;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::pipeline::{CompletedItem, Pipeline, WorkItem};
use crate::report::ResultAggregator;
use crate::runners::Runner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerReport {
    pub total: usize,
    pub completed: usize,
    pub cancelled: bool,
}

impl SchedulerReport {
    pub fn not_run(&self) -> usize {
        self.total - self.completed
    }
}

pub struct Scheduler<R> {
    runner: Arc<R>,
    pipeline: Arc<Pipeline>,
    workers: usize,
    cancel: CancellationToken,
    progress: ProgressBar,
}

impl<R: Runner + 'static> Scheduler<R> {
    pub fn new(runner: Arc<R>, pipeline: Arc<Pipeline>, cancel: CancellationToken) -> Self {
        Self {
            runner,
            pipeline,
            workers: num_cpus::get(),
            cancel,
            progress: ProgressBar::hidden(),
        }
    }

    /// Number of concurrent simulations; zero is treated as one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Runs every item once, recording results as they arrive. Returns once
    /// the queue is drained or, after cancellation, once in-flight items
    /// have wound down.
    pub async fn run(&self, items: Vec<WorkItem>, results: &mut ResultAggregator) -> SchedulerReport {
        let total = items.len();
        self.progress.set_length(total as u64);

        let (work_tx, work_rx) = async_channel::bounded::<WorkItem>(self.workers * 2);
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<CompletedItem>();

        let mut handles = Vec::with_capacity(self.workers + 1);
        for worker in 0..self.workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let runner = Arc::clone(&self.runner);
            let pipeline = Arc::clone(&self.pipeline);
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker, work_rx, result_tx, runner, pipeline, cancel).await
            }));
        }
        drop(work_rx);
        drop(result_tx);

        let cancel = self.cancel.clone();
        handles.push(tokio::spawn(async move {
            for item in items {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = work_tx.send(item) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        }));

        let mut completed = 0;
        while let Some(item) = result_rx.recv().await {
            self.progress.inc(1);
            if !item.outcome.is_pass() {
                self.progress
                    .set_message(format!("{} {}: {}", item.arch, item.label, item.outcome.reason()));
            }
            results.record(item);
            completed += 1;
        }

        for handle in handles {
            if let Err(err) = handle.await {
                warn!("worker task failed: {err}");
            }
        }
        self.progress.finish_and_clear();

        SchedulerReport {
            total,
            completed,
            cancelled: self.cancel.is_cancelled(),
        }
    }
}

async fn worker_loop<R: Runner>(
    worker: usize,
    work_rx: async_channel::Receiver<WorkItem>,
    result_tx: mpsc::UnboundedSender<CompletedItem>,
    runner: Arc<R>,
    pipeline: Arc<Pipeline>,
    cancel: CancellationToken,
) {
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = work_rx.recv() => match item {
                Ok(item) => item,
                Err(_) => break,
            },
        };
        if let Some(done) = pipeline.process(runner.as_ref(), &item, &cancel).await
            && result_tx.send(done).is_err()
        {
            break;
        }
    }
    debug!(worker, "worker stopped");
}
