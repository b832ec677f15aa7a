//! In-process dispatch queue: bounded job channel and a worker pool.
//!
//! Each job is handed to exactly one executor. The pool never runs more than
//! `max_workers` jobs at once; when all permits are taken it stops receiving,
//! so a full channel pushes back on `enqueue`.
//!
//! Shutdown: [`IngestQueue::shutdown`] closes the channel to new jobs. Jobs
//! already buffered are still dispatched, and running jobs continue until
//! they finish, so no accepted job is left with a PENDING task.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use trove_core::models::IngestJob;
use trove_core::TroveConfig;

use crate::context::IngestHandler;

#[derive(Clone, Debug)]
pub struct IngestQueueConfig {
    pub max_workers: usize,
    pub capacity: usize,
}

impl Default for IngestQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 2,
            capacity: 64,
        }
    }
}

impl From<&TroveConfig> for IngestQueueConfig {
    fn from(config: &TroveConfig) -> Self {
        Self {
            max_workers: config.ingest_max_workers,
            capacity: config.ingest_queue_capacity,
        }
    }
}

#[derive(Clone)]
pub struct IngestQueue {
    job_tx: mpsc::Sender<IngestJob>,
    shutdown_tx: mpsc::Sender<()>,
}

impl IngestQueue {
    /// Start the worker pool on the current runtime.
    pub fn new(config: IngestQueueConfig, handler: Arc<dyn IngestHandler>) -> Self {
        let (job_tx, job_rx) = mpsc::channel(config.capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::worker_pool(config, handler, job_rx, shutdown_rx).await;
        });

        Self {
            job_tx,
            shutdown_tx,
        }
    }

    /// Hand a job to the pool. Waits while the channel is full.
    #[tracing::instrument(skip(self, job), fields(task_id = %job.task_id))]
    pub async fn enqueue(&self, job: IngestJob) -> Result<()> {
        let task_id = job.task_id;
        self.job_tx.send(job).await.map_err(|_| {
            tracing::error!(task_id = %task_id, "Ingest queue is closed");
            anyhow::anyhow!("Ingest queue is closed, job for task {} not accepted", task_id)
        })?;

        tracing::info!(task_id = %task_id, "Ingest job queued");
        Ok(())
    }

    async fn worker_pool(
        config: IngestQueueConfig,
        handler: Arc<dyn IngestHandler>,
        mut job_rx: mpsc::Receiver<IngestJob>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            capacity = config.capacity,
            "Ingest worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));
        let mut draining = false;

        loop {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let job = if draining {
                job_rx.recv().await
            } else {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Ingest worker pool shutting down, draining buffered jobs");
                        job_rx.close();
                        draining = true;
                        job_rx.recv().await
                    }
                    job = job_rx.recv() => job,
                }
            };
            let Some(job) = job else {
                break;
            };

            let handler = handler.clone();
            tokio::spawn(async move {
                let _permit = permit;
                tracing::debug!(task_id = %job.task_id, "Ingest job dispatched");
                handler.handle(job).await;
            });
        }

        tracing::info!("Ingest worker pool stopped");
    }

    /// Stop accepting jobs. Buffered jobs still run; returns without waiting
    /// for them.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating ingest queue shutdown");
        // A repeated shutdown finds the signal already queued.
        let _ = self.shutdown_tx.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingHandler {
        running: AtomicUsize,
        max_running: AtomicUsize,
        seen: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl IngestHandler for RecordingHandler {
        async fn handle(self: Arc<Self>, job: IngestJob) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.seen.lock().await.push(job.task_id);
            self.running.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn job() -> IngestJob {
        IngestJob {
            task_id: Uuid::new_v4(),
            archive_location: PathBuf::from("/tmp/upload.zip"),
            original_filename: "upload.zip".to_string(),
            dataset_name: "test".to_string(),
        }
    }

    async fn wait_for(handler: &RecordingHandler, count: usize) {
        for _ in 0..200 {
            if handler.seen.lock().await.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("jobs did not finish in time");
    }

    #[tokio::test]
    async fn every_job_runs_once_within_worker_limit() {
        let handler = Arc::new(RecordingHandler::default());
        let queue = IngestQueue::new(
            IngestQueueConfig {
                max_workers: 2,
                capacity: 8,
            },
            handler.clone(),
        );

        let jobs: Vec<IngestJob> = (0..6).map(|_| job()).collect();
        let mut expected: Vec<Uuid> = jobs.iter().map(|j| j.task_id).collect();
        for job in jobs {
            queue.enqueue(job).await.unwrap();
        }

        wait_for(&handler, 6).await;
        let mut seen = handler.seen.lock().await.clone();
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
        assert!(handler.max_running.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_fails() {
        let handler = Arc::new(RecordingHandler::default());
        let queue = IngestQueue::new(IngestQueueConfig::default(), handler);
        queue.shutdown().await;

        let mut rejected = false;
        for _ in 0..50 {
            if queue.enqueue(job()).await.is_err() {
                rejected = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(rejected);
    }

    #[tokio::test]
    async fn shutdown_still_runs_buffered_jobs() {
        let handler = Arc::new(RecordingHandler::default());
        let queue = IngestQueue::new(
            IngestQueueConfig {
                max_workers: 1,
                capacity: 8,
            },
            handler.clone(),
        );

        let jobs: Vec<IngestJob> = (0..4).map(|_| job()).collect();
        let mut expected: Vec<Uuid> = jobs.iter().map(|j| j.task_id).collect();
        for job in jobs {
            queue.enqueue(job).await.unwrap();
        }
        queue.shutdown().await;

        wait_for(&handler, 4).await;
        let mut seen = handler.seen.lock().await.clone();
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn config_from_trove_config() {
        let config = TroveConfig {
            ingest_max_workers: 5,
            ingest_queue_capacity: 7,
            ..TroveConfig::default()
        };
        let queue_config = IngestQueueConfig::from(&config);
        assert_eq!(queue_config.max_workers, 5);
        assert_eq!(queue_config.capacity, 7);
    }
}
