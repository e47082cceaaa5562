//! Runs the reconstruction stages in order, in the foreground or on a
//! background thread that can be stopped while it works.

use std::{path::PathBuf, sync::Arc, thread};

use crate::{
    cancel::{CancellationToken, Outcome},
    config::ReconstructionConfig,
    engine::{GeometryEngine, PoseEstimator},
    error::Error,
    fragment::make_fragments::{self, RunSummary},
    progress::{self, ProgressReceiver, ProgressSink},
    slac,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Pose graphs, optimization and geometry of every fragment.
    MakeFragments,
    /// Global integration through the SLAC control grid.
    SlacIntegrate,
}

/// What the stages of a run produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SystemReport {
    /// Set when [`Stage::MakeFragments`] ran.
    pub fragments: Option<RunSummary>,
    /// Set when [`Stage::SlacIntegrate`] completed.
    pub slac_output: Option<PathBuf>,
    /// The run stopped because of the cancellation token.
    pub cancelled: bool,
}

/// Runs `stages` in the given order. A cancelled stage ends the run and the
/// following stages never start.
pub fn run_stages(
    stages: &[Stage],
    config: &ReconstructionConfig,
    engine: &dyn GeometryEngine,
    pose_estimator: Option<&dyn PoseEstimator>,
    cancel: &CancellationToken,
    progress: &ProgressSink,
) -> Result<SystemReport, Error> {
    let mut report = SystemReport::default();

    for stage in stages {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        log::debug!("Starting stage {stage:?}");
        match stage {
            Stage::MakeFragments => {
                let summary = make_fragments::run(config, engine, pose_estimator, cancel, progress)?;
                report.cancelled = summary.is_cancelled();
                report.fragments = Some(summary);
            }
            Stage::SlacIntegrate => match slac::run(config, engine, cancel, progress)? {
                Outcome::Completed(filepath) => report.slac_output = Some(filepath),
                Outcome::Cancelled => report.cancelled = true,
            },
        }

        if report.cancelled {
            log::info!("Reconstruction stopped during stage {stage:?}");
            break;
        }
    }

    Ok(report)
}

struct ActiveRun {
    cancel: CancellationToken,
    progress: ProgressReceiver,
    handle: thread::JoinHandle<Result<SystemReport, Error>>,
}

/// Background runner with start and stop controls.
///
/// One run at a time: [`ReconstructionSystem::start`] fails with
/// [`Error::AlreadyRunning`] until the previous run has finished.
pub struct ReconstructionSystem {
    engine: Arc<dyn GeometryEngine>,
    pose_estimator: Option<Arc<dyn PoseEstimator>>,
    active: Option<ActiveRun>,
}

impl ReconstructionSystem {
    pub fn new(engine: Arc<dyn GeometryEngine>) -> Self {
        Self {
            engine,
            pose_estimator: None,
            active: None,
        }
    }

    pub fn with_pose_estimator(mut self, pose_estimator: Arc<dyn PoseEstimator>) -> Self {
        self.pose_estimator = Some(pose_estimator);
        self
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .map_or(false, |run| !run.handle.is_finished())
    }

    /// Starts running `stages` on a background thread.
    ///
    /// A finished run that was never joined is discarded.
    pub fn start(&mut self, config: ReconstructionConfig, stages: Vec<Stage>) -> Result<(), Error> {
        if self.is_running() {
            return Err(Error::AlreadyRunning);
        }
        if self.active.take().is_some() {
            log::warn!("Discarding the result of the previous run");
        }

        let cancel = CancellationToken::new();
        let (sink, receiver) = progress::channel();
        let engine = self.engine.clone();
        let pose_estimator = self.pose_estimator.clone();
        let thread_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("recon3d-system".to_string())
            .spawn(move || {
                run_stages(
                    &stages,
                    &config,
                    engine.as_ref(),
                    pose_estimator.as_deref(),
                    &thread_cancel,
                    &sink,
                )
            })?;

        self.active = Some(ActiveRun {
            cancel,
            progress: receiver,
            handle,
        });
        Ok(())
    }

    /// Asks the current run to stop. Does not wait for it.
    pub fn stop(&self) {
        if let Some(run) = &self.active {
            run.cancel.cancel();
        }
    }

    /// Progress of the current (or last unjoined) run.
    pub fn progress(&self) -> Option<&ProgressReceiver> {
        self.active.as_ref().map(|run| &run.progress)
    }

    /// Waits for the current run and returns its report.
    pub fn join(&mut self) -> Result<SystemReport, Error> {
        let run = self
            .active
            .take()
            .ok_or_else(|| Error::invalid_parameter("No reconstruction was started"))?;
        run.handle
            .join()
            .map_err(|_| Error::engine("The reconstruction thread panicked"))?
    }
}
