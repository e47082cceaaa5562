//! Dataset-level driver of the fragment stages.

use std::path::PathBuf;

use rayon::prelude::*;

use super::{
    make_geometry_for_fragment, make_posegraph_for_fragment, optimize_posegraph_for_fragment,
    Fragment, FragmentContext,
};
use crate::{
    cancel::{CancellationToken, Outcome},
    config::ReconstructionConfig,
    engine::{GeometryEngine, PoseEstimator},
    error::Error,
    io::{
        dataset::{RgbdDataset, RgbdFileDataset},
        make_clean_folder,
    },
    progress::ProgressSink,
};

/// What a fragment run produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub n_fragments: usize,
    /// Ids of the fragments whose geometry was written, ascending.
    pub completed: Vec<usize>,
    /// Ids of the fragments abandoned because of the cancellation, ascending.
    pub cancelled: Vec<usize>,
    /// Geometry file of each completed fragment, in the order of `completed`.
    pub outputs: Vec<PathBuf>,
}

impl RunSummary {
    pub fn is_cancelled(&self) -> bool {
        !self.cancelled.is_empty()
    }
}

/// Runs the whole per-fragment sequence: pose graph, optimization, integration
/// and geometry output. The cancellation token is checked before each step.
pub fn process_single_fragment(
    ctx: &FragmentContext,
    fragment_id: usize,
    n_frames: usize,
) -> Result<Outcome<PathBuf>, Error> {
    let fragment = Fragment::new(fragment_id, ctx.config.n_frames_per_fragment, n_frames);
    let skip = || -> Result<Outcome<PathBuf>, Error> {
        ctx.post(format!(
            "Skipping fragment {fragment_id} as stop event is set"
        ));
        Ok(Outcome::Cancelled)
    };

    if ctx.cancel.is_cancelled() {
        return skip();
    }
    if make_posegraph_for_fragment(ctx, &fragment)?.is_cancelled() {
        return Ok(Outcome::Cancelled);
    }

    if ctx.cancel.is_cancelled() {
        return skip();
    }
    optimize_posegraph_for_fragment(ctx, &fragment)?;

    if ctx.cancel.is_cancelled() {
        return skip();
    }
    make_geometry_for_fragment(ctx, &fragment)
}

/// Makes every fragment of the dataset at `config.path_dataset`.
///
/// The color and depth file counts are checked before anything is touched, a
/// mismatch aborts the run. The fragment folder is then recreated empty.
pub fn run(
    config: &ReconstructionConfig,
    engine: &dyn GeometryEngine,
    pose_estimator: Option<&dyn PoseEstimator>,
    cancel: &CancellationToken,
    progress: &ProgressSink,
) -> Result<RunSummary, Error> {
    config.validate()?;
    progress.post(super::PROGRESS_SENDER, "making fragments from RGBD sequence.");

    let dataset = RgbdFileDataset::load(&config.path_dataset, config.depth_scale, config.depth_max)?;
    make_clean_folder(config.fragment_folder())?;

    run_with_dataset(config, &dataset, engine, pose_estimator, cancel, progress)
}

/// Makes every fragment of `dataset`, sequentially or on a worker pool
/// according to `config.multi_threading`. Both modes write the same files.
pub fn run_with_dataset(
    config: &ReconstructionConfig,
    dataset: &dyn RgbdDataset,
    engine: &dyn GeometryEngine,
    pose_estimator: Option<&dyn PoseEstimator>,
    cancel: &CancellationToken,
    progress: &ProgressSink,
) -> Result<RunSummary, Error> {
    let n_frames = dataset.len();
    let n_fragments = config.fragment_count(n_frames);
    let ctx = FragmentContext {
        config,
        dataset,
        intrinsic: config.intrinsic()?,
        engine,
        pose_estimator,
        cancel,
        progress,
        n_fragments,
    };

    let outcomes = if config.multi_threading {
        let n_workers = config.worker_count(n_fragments);
        log::debug!("Making {n_fragments} fragments on {n_workers} workers");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .build()
            .map_err(|err| Error::invalid_parameter(format!("Worker pool: {err}")))?;
        pool.install(|| {
            (0..n_fragments)
                .into_par_iter()
                .map(|fragment_id| process_single_fragment(&ctx, fragment_id, n_frames))
                .collect::<Result<Vec<_>, Error>>()
        })?
    } else {
        log::debug!("Making {n_fragments} fragments sequentially");
        (0..n_fragments)
            .map(|fragment_id| process_single_fragment(&ctx, fragment_id, n_frames))
            .collect::<Result<Vec<_>, Error>>()?
    };

    let mut summary = RunSummary {
        n_fragments,
        ..Default::default()
    };
    for (fragment_id, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Outcome::Completed(filepath) => {
                summary.completed.push(fragment_id);
                summary.outputs.push(filepath);
            }
            Outcome::Cancelled => summary.cancelled.push(fragment_id),
        }
    }
    Ok(summary)
}
