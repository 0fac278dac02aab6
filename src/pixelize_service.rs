//! Pixelization management service.
//!
//! Runs are processed one at a time. A run downscales its source once and then hands one job per
//! palette to a single worker thread, waiting for each job to finish before sending the next.

use std::{
    collections::VecDeque,
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use image::RgbaImage;
use palettize::{
    resample::{check_factor, downscale},
    Encoded, Job, Kernel, OutputFormat, Palette,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, trace};

/// Everything needed to process one image with a list of palettes.
pub struct RunRequest {
    /// The full resolution source image.
    pub image: RgbaImage,
    /// Palettes to apply, in the order their results should come back in.
    pub palettes: Vec<Arc<Palette>>,
    pub kernel: Option<Kernel>,
    pub factor: u32,
    pub upscale: bool,
    pub format: OutputFormat,
}

impl RunRequest {
    fn validate(&self) -> Result<(), Error> {
        if self.palettes.is_empty() {
            return Err(Error::NoPalettes);
        }
        check_factor(self.image.width(), self.image.height(), self.factor)
            .map_err(Error::Invalid)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

/// The result of a single job.
#[derive(Debug)]
pub struct JobOutcome {
    pub palette: Arc<Palette>,
    pub result: Result<Encoded, Error>,
}

#[derive(Debug)]
pub enum RunEvent {
    /// A job is done. Jobs complete in the order of the request's palettes.
    JobCompleted(JobOutcome),
    /// All jobs are done.
    Finished { elapsed: Duration },
    /// The run was aborted. Jobs completed before this event are still valid.
    Failed(Error),
    /// A newer run took over. Remaining jobs were dropped.
    Superseded,
}

/// A finished run, as collected by [`PixelizeServiceHandle::run`].
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<JobOutcome>,
    pub elapsed: Duration,
    /// Set if the run stopped early because the worker failed.
    pub failure: Option<Error>,
}

struct Submission {
    request: RunRequest,
    events: mpsc::UnboundedSender<RunEvent>,
}

struct WorkerJob {
    job: Job,
    responder: oneshot::Sender<Result<Encoded, palettize::Error>>,
}

/// Turns a job into its encoded result on the worker thread.
type Runner = fn(&Job) -> Result<Encoded, palettize::Error>;

enum RunEnd {
    Finished,
    Failed(Error),
    Superseded(Submission),
}

pub struct PixelizeService {
    requests: mpsc::Receiver<Submission>,
    worker: mpsc::Sender<WorkerJob>,
    state: watch::Sender<RunState>,
}

impl PixelizeService {
    pub fn spawn() -> Result<PixelizeServiceHandle, io::Error> {
        Self::spawn_with(Job::run)
    }

    fn spawn_with(runner: Runner) -> Result<PixelizeServiceHandle, io::Error> {
        let (requests_tx, requests_rx) = mpsc::channel(32);
        // One slot: the worker never has more than the job in flight waiting for it.
        let (worker_tx, worker_rx) = mpsc::channel(1);
        let (state_tx, state_rx) = watch::channel(RunState::Idle);

        thread::Builder::new()
            .name("pixelize-worker".to_owned())
            .spawn(move || Self::work(worker_rx, runner))?;

        let mut service = PixelizeService {
            requests: requests_rx,
            worker: worker_tx,
            state: state_tx,
        };
        tokio::spawn(async move {
            info!("pixelize service is ready");
            let mut pending = None;
            loop {
                let submission = match pending.take() {
                    Some(submission) => submission,
                    None => match service.requests.recv().await {
                        Some(submission) => submission,
                        None => break,
                    },
                };
                pending = service.run(submission).await;
            }
            info!("pixelize service stopped");
        });

        Ok(PixelizeServiceHandle {
            requests: requests_tx,
            state: state_rx,
        })
    }

    fn work(mut jobs: mpsc::Receiver<WorkerJob>, runner: Runner) {
        info!("pixelize worker is ready");
        while let Some(WorkerJob { job, responder }) = jobs.blocking_recv() {
            match panic::catch_unwind(AssertUnwindSafe(|| runner(&job))) {
                Ok(result) => {
                    // The run may have been dropped in the meantime.
                    let _ = responder.send(result);
                }
                // Dropping the responder tells the run that the job failed.
                Err(_) => error!(palette = job.palette.name(), "job panicked"),
            }
        }
        info!("pixelize worker stopped");
    }

    /// Processes one run. Returns the submission that superseded it, if any.
    async fn run(&mut self, submission: Submission) -> Option<Submission> {
        let Submission { request, events } = submission;
        let start = Instant::now();
        self.state.send_replace(RunState::Running);
        debug!(
            palettes = request.palettes.len(),
            factor = request.factor,
            kernel = ?request.kernel,
            "starting run"
        );

        let end = self.run_jobs(request, &events).await;

        self.state.send_replace(RunState::Idle);
        match end {
            RunEnd::Finished => {
                let elapsed = start.elapsed();
                info!("run completed in {:.3} s", elapsed.as_secs_f64());
                let _ = events.send(RunEvent::Finished { elapsed });
                None
            }
            RunEnd::Failed(error) => {
                error!("run failed: {error}");
                let _ = events.send(RunEvent::Failed(error));
                None
            }
            RunEnd::Superseded(newer) => {
                debug!("run superseded by a newer one");
                let _ = events.send(RunEvent::Superseded);
                Some(newer)
            }
        }
    }

    async fn run_jobs(
        &mut self,
        request: RunRequest,
        events: &mpsc::UnboundedSender<RunEvent>,
    ) -> RunEnd {
        let RunRequest {
            image,
            palettes,
            kernel,
            factor,
            upscale,
            format,
        } = request;

        let source = match tokio::task::spawn_blocking(move || downscale(&image, factor)).await {
            Ok(source) => Arc::new(source),
            Err(_) => return RunEnd::Failed(Error::WorkerFailure),
        };
        let mut queue: VecDeque<_> = palettes
            .into_iter()
            .map(|palette| Job {
                source: Arc::clone(&source),
                palette,
                kernel,
                factor,
                upscale,
                format,
            })
            .collect();

        let mut superseded: Option<Submission> = None;
        while let Some(job) = queue.pop_front() {
            let palette = Arc::clone(&job.palette);
            let (responder, mut result) = oneshot::channel();
            trace!(palette = palette.name(), "dispatching job");
            if self.worker.send(WorkerJob { job, responder }).await.is_err() {
                return RunEnd::Failed(Error::WorkerOffline);
            }

            // Jobs cannot be interrupted, so newer submissions only get noted until this one is
            // done.
            let result = loop {
                tokio::select! {
                    result = &mut result => break result,
                    Some(newer) = self.requests.recv() => {
                        if let Some(older) = superseded.replace(newer) {
                            let _ = older.events.send(RunEvent::Superseded);
                        }
                    }
                }
            };

            if let Some(newer) = superseded {
                return RunEnd::Superseded(newer);
            }
            match result {
                Ok(result) => {
                    trace!(palette = palette.name(), "job complete");
                    let _ = events.send(RunEvent::JobCompleted(JobOutcome {
                        palette,
                        result: result.map_err(Error::Encoding),
                    }));
                }
                Err(_) => return RunEnd::Failed(Error::WorkerFailure),
            }
        }

        RunEnd::Finished
    }
}

#[derive(Clone)]
pub struct PixelizeServiceHandle {
    requests: mpsc::Sender<Submission>,
    state: watch::Receiver<RunState>,
}

impl PixelizeServiceHandle {
    /// Validates and submits a run, superseding the one currently in progress. The returned
    /// receiver yields the run's events, ending with `Finished`, `Failed` or `Superseded`.
    pub async fn submit(
        &self,
        request: RunRequest,
    ) -> Result<mpsc::UnboundedReceiver<RunEvent>, Error> {
        request.validate()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.requests
            .send(Submission {
                request,
                events: events_tx,
            })
            .await
            .map_err(|_| Error::ServiceOffline)?;
        Ok(events_rx)
    }

    /// Submits a run and waits for all of its results.
    pub async fn run(&self, request: RunRequest) -> Result<RunReport, Error> {
        collect(self.submit(request).await?).await
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }
}

/// Gathers the events of a submitted run into a report.
pub async fn collect(mut events: mpsc::UnboundedReceiver<RunEvent>) -> Result<RunReport, Error> {
    let start = Instant::now();
    let mut outcomes = vec![];
    while let Some(event) = events.recv().await {
        match event {
            RunEvent::JobCompleted(outcome) => outcomes.push(outcome),
            RunEvent::Finished { elapsed } => {
                return Ok(RunReport {
                    outcomes,
                    elapsed,
                    failure: None,
                })
            }
            RunEvent::Failed(error) => {
                return Ok(RunReport {
                    outcomes,
                    elapsed: start.elapsed(),
                    failure: Some(error),
                })
            }
            RunEvent::Superseded => return Err(Error::Superseded),
        }
    }
    Err(Error::ServiceOffline)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("No palettes selected")]
    NoPalettes,
    #[error("{0}")]
    Invalid(palettize::Error),
    #[error("Cannot encode result: {0}")]
    Encoding(palettize::Error),
    #[error("Pixelize worker failed while processing a job")]
    WorkerFailure,
    #[error("Pixelize worker is offline (did the thread exit?)")]
    WorkerOffline,
    #[error("Cannot send request to pixelize service because it is offline (did the task panic?)")]
    ServiceOffline,
    #[error("Run was superseded by a newer one")]
    Superseded,
}

impl Error {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::NoPalettes | Self::Invalid(_))
    }
}
