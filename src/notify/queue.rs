use std::collections::{HashMap, VecDeque};
use std::pin::pin;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::Channel;

/// One unit of send work: a single notification on a single channel, with
/// the destination already resolved from the recipient's contact record.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationJob {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub channel: Channel,
    pub recipient_id: Uuid,
    pub destination: String,
    pub title: String,
    pub message: String,
    /// Times this job has been handed to a worker.
    pub attempts: u32,
}

/// A job that exhausted its attempts, kept for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct DeadJob {
    pub job: NotificationJob,
    pub reason: String,
    pub dead_at: DateTime<Utc>,
}

/// What happened to a negatively-acknowledged job.
#[derive(Debug)]
pub enum NackOutcome {
    Requeued,
    DeadLettered(DeadJob),
}

/// Result of one visibility sweep.
#[derive(Debug, Default)]
pub struct ExpiredSweep {
    pub requeued: usize,
    pub dead: Vec<DeadJob>,
}

struct InFlight {
    job: NotificationJob,
    visible_again_at: Instant,
}

struct QueueInner {
    pending: VecDeque<NotificationJob>,
    in_flight: HashMap<Uuid, InFlight>,
    dead: Vec<DeadJob>,
    closed: bool,
}

/// At-least-once in-process job queue.
///
/// A pulled job stays invisible until the worker acks it; an unacked job
/// becomes visible again after the visibility timeout and is redelivered.
/// Each pull counts as an attempt, and a job that fails (or expires) at
/// `max_attempts` moves to the dead-letter list instead of the pending
/// queue. `close()` stops new pushes and lets pullers drain what is left.
pub struct NotificationQueue {
    inner: Mutex<QueueInner>,
    wakeup: Notify,
    visibility_timeout: Duration,
    max_attempts: u32,
}

impl NotificationQueue {
    pub fn new(visibility_timeout: Duration, max_attempts: u32) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                pending: VecDeque::new(),
                in_flight: HashMap::new(),
                dead: Vec::new(),
                closed: false,
            }),
            wakeup: Notify::new(),
            visibility_timeout,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn push(&self, job: NotificationJob) -> Result<(), AppError> {
        {
            let mut inner = self.lock();
            if inner.closed {
                return Err(AppError::QueueClosed);
            }
            inner.pending.push_back(job);
        }
        self.wakeup.notify_one();
        Ok(())
    }

    /// Waits for the next job. Returns `None` once the queue is closed and
    /// the pending backlog is drained.
    pub async fn pull_or_wait(&self) -> Option<NotificationJob> {
        let mut notified = pin!(self.wakeup.notified());
        loop {
            // Register interest before inspecting state so a push or close
            // landing in between is not lost.
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if let Some(mut job) = inner.pending.pop_front() {
                    job.attempts += 1;
                    inner.in_flight.insert(
                        job.id,
                        InFlight {
                            job: job.clone(),
                            visible_again_at: Instant::now() + self.visibility_timeout,
                        },
                    );
                    return Some(job);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.as_mut().await;
            notified.set(self.wakeup.notified());
        }
    }

    /// Confirms a job is done. Acking a job the queue no longer tracks
    /// (already swept back out by the reaper) is a no-op.
    pub fn ack(&self, job_id: Uuid) {
        self.lock().in_flight.remove(&job_id);
    }

    /// Reports a failed attempt. The job is requeued while it has attempts
    /// left, otherwise dead-lettered. `None` means the queue no longer
    /// tracked the job.
    pub fn nack(&self, job_id: Uuid, reason: &str) -> Option<NackOutcome> {
        let mut inner = self.lock();
        let in_flight = inner.in_flight.remove(&job_id)?;

        if in_flight.job.attempts >= self.max_attempts {
            let dead = DeadJob {
                job: in_flight.job,
                reason: reason.to_string(),
                dead_at: Utc::now(),
            };
            inner.dead.push(dead.clone());
            Some(NackOutcome::DeadLettered(dead))
        } else {
            inner.pending.push_back(in_flight.job);
            drop(inner);
            self.wakeup.notify_one();
            Some(NackOutcome::Requeued)
        }
    }

    /// Returns expired in-flight jobs to the pending queue, dead-lettering
    /// the ones that were already on their last attempt.
    pub fn requeue_expired(&self) -> ExpiredSweep {
        let now = Instant::now();
        let mut sweep = ExpiredSweep::default();

        let mut inner = self.lock();
        let expired: Vec<Uuid> = inner
            .in_flight
            .iter()
            .filter(|(_, entry)| entry.visible_again_at <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in expired {
            let Some(entry) = inner.in_flight.remove(&id) else {
                continue;
            };
            if entry.job.attempts >= self.max_attempts {
                let dead = DeadJob {
                    job: entry.job,
                    reason: "visibility timeout exceeded on final attempt".to_string(),
                    dead_at: Utc::now(),
                };
                inner.dead.push(dead.clone());
                sweep.dead.push(dead);
            } else {
                inner.pending.push_back(entry.job);
                sweep.requeued += 1;
            }
        }
        drop(inner);

        for _ in 0..sweep.requeued {
            self.wakeup.notify_one();
        }
        sweep
    }

    /// Stops accepting pushes and wakes every waiting puller so it can
    /// drain the backlog and exit.
    pub fn close(&self) {
        self.lock().closed = true;
        self.wakeup.notify_waiters();
    }

    pub fn depth(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn dead_letters(&self) -> Vec<DeadJob> {
        self.lock().dead.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
