//! Bounded worker pool that runs one task per merged segment.
//!
//! Segments are queued on a channel and pulled by at most `concurrency`
//! named threads. Each result travels back tagged with its submission index,
//! so completion order never leaks into the report. A task that errors,
//! panics or overruns its timeout fails only its own segment.
//!
//! At most `concurrency` tasks execute at any instant. A task that overruns
//! its timeout keeps its permit until it really returns, so the next job
//! waits for it even though the timeout was already reported.

use crate::error::{DiarflowError, Result};
use crate::merge::MergedSegment;
use crate::pipeline::types::{DispatchReport, SegmentFailure, SegmentResult};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

type Outcome = (usize, MergedSegment, Result<SegmentResult>);

/// Runs segment tasks on a fixed-size thread pool.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    concurrency: usize,
    task_timeout: Option<Duration>,
}

impl Dispatcher {
    /// A `concurrency` of zero is treated as one.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            task_timeout: None,
        }
    }

    /// Fail any single task that runs longer than `timeout`.
    ///
    /// The overrunning task is not killed: its failure is reported at the
    /// deadline, but its worker slot stays occupied until it returns, and
    /// its result is then discarded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout
    }

    /// Run `task` once per segment and collect every outcome.
    ///
    /// Blocks until all segments are accounted for. Fails only if no worker
    /// thread could be started.
    pub fn run<F>(&self, segments: Vec<MergedSegment>, task: F) -> Result<DispatchReport>
    where
        F: Fn(&MergedSegment) -> Result<SegmentResult> + Send + Sync + 'static,
    {
        let total = segments.len();
        if total == 0 {
            return Ok(DispatchReport::default());
        }

        let started = Instant::now();
        let pool_size = self.concurrency.min(total);
        let task = Arc::new(task);

        let (job_tx, job_rx) = unbounded::<(usize, MergedSegment)>();
        let (result_tx, result_rx) = unbounded::<Outcome>();
        let (permit_tx, permit_rx) = bounded::<()>(pool_size);
        for _ in 0..pool_size {
            if permit_tx.send(()).is_err() {
                return Err(DiarflowError::Dispatch {
                    message: "permit pool closed during setup".to_string(),
                });
            }
        }

        for (index, segment) in segments.iter().cloned().enumerate() {
            if job_tx.send((index, segment)).is_err() {
                return Err(DiarflowError::Dispatch {
                    message: "job queue closed before submission finished".to_string(),
                });
            }
        }
        drop(job_tx);

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(pool_size);
        for id in 0..pool_size {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let permits = (permit_tx.clone(), permit_rx.clone());
            let task = Arc::clone(&task);
            let timeout = self.task_timeout;

            let spawned = thread::Builder::new()
                .name(format!("diarflow-worker-{id}"))
                .spawn(move || {
                    for (index, segment) in jobs.iter() {
                        let Some(permit) = Permit::acquire(&permits.0, &permits.1) else {
                            break;
                        };
                        let outcome = run_task(&task, &segment, timeout, permit);
                        if results.send((index, segment, outcome)).is_err() {
                            break;
                        }
                    }
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) if handles.is_empty() => {
                    return Err(DiarflowError::Dispatch {
                        message: format!("failed to start worker thread: {}", e),
                    });
                }
                Err(e) => {
                    warn!(requested = pool_size, started = handles.len(), error = %e, "worker pool is smaller than requested");
                    break;
                }
            }
        }
        drop(result_tx);
        drop(job_rx);
        drop(permit_rx);

        info!(segments = total, workers = handles.len(), "dispatching segments");

        let mut slots: Vec<Option<(MergedSegment, Result<SegmentResult>)>> =
            (0..total).map(|_| None).collect();
        for (index, segment, outcome) in result_rx.iter() {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some((segment, outcome));
            }
        }

        for handle in handles {
            if let Err(payload) = handle.join() {
                warn!(panic = %panic_message(payload.as_ref()), "worker thread panicked");
            }
        }

        let mut report = DispatchReport::default();
        for (index, (slot, original)) in slots.into_iter().zip(segments).enumerate() {
            match slot {
                Some((_, Ok(result))) => report.succeeded.push(result),
                Some((segment, Err(error))) => report.failed.push(SegmentFailure {
                    index,
                    segment,
                    error,
                }),
                None => report.failed.push(SegmentFailure {
                    index,
                    segment: original,
                    error: DiarflowError::Dispatch {
                        message: "segment result was lost".to_string(),
                    },
                }),
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dispatch complete"
        );

        Ok(report)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(crate::defaults::CONCURRENCY)
    }
}

/// Run `task` over `segments` with at most `concurrency` in flight.
pub fn dispatch<F>(segments: Vec<MergedSegment>, task: F, concurrency: usize) -> Result<DispatchReport>
where
    F: Fn(&MergedSegment) -> Result<SegmentResult> + Send + Sync + 'static,
{
    Dispatcher::new(concurrency).run(segments, task)
}

/// One unit of execution capacity; returned to the pool on drop.
struct Permit {
    release: Sender<()>,
}

impl Permit {
    /// Block until a slot is free.
    fn acquire(release: &Sender<()>, available: &Receiver<()>) -> Option<Self> {
        available.recv().ok().map(|()| Self {
            release: release.clone(),
        })
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if self.release.send(()).is_err() {
            debug!("permit released after dispatch finished");
        }
    }
}

fn run_task<F>(
    task: &Arc<F>,
    segment: &MergedSegment,
    timeout: Option<Duration>,
    permit: Permit,
) -> Result<SegmentResult>
where
    F: Fn(&MergedSegment) -> Result<SegmentResult> + Send + Sync + 'static,
{
    let Some(limit) = timeout else {
        let outcome = guarded(task.as_ref(), segment);
        drop(permit);
        return outcome;
    };

    let (tx, rx) = crossbeam_channel::bounded(1);
    let task = Arc::clone(task);
    let owned = segment.clone();
    thread::Builder::new()
        .name("diarflow-task".to_string())
        .spawn(move || {
            let outcome = guarded(task.as_ref(), &owned);
            drop(permit);
            if tx.send(outcome).is_err() {
                debug!(start = owned.start, "task finished after its deadline");
            }
        })?;

    match rx.recv_timeout(limit) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => Err(DiarflowError::TaskTimeout {
            timeout_ms: limit.as_millis(),
        }),
        Err(RecvTimeoutError::Disconnected) => Err(DiarflowError::WorkerPanicked {
            message: "task thread exited without a result".to_string(),
        }),
    }
}

fn guarded<F>(task: &F, segment: &MergedSegment) -> Result<SegmentResult>
where
    F: Fn(&MergedSegment) -> Result<SegmentResult>,
{
    panic::catch_unwind(AssertUnwindSafe(|| task(segment))).unwrap_or_else(|payload| {
        Err(DiarflowError::WorkerPanicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
