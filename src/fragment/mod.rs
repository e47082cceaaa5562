//! Fragment reconstruction: the frame sequence is cut into fragments and each
//! one is turned into a pose graph, optimized and fused into geometry.

use std::ops::Range;

use crate::{
    camera::CameraIntrinsics,
    cancel::CancellationToken,
    config::ReconstructionConfig,
    engine::{GeometryEngine, PoseEstimator},
    io::dataset::RgbdDataset,
    progress::ProgressSink,
};

mod register;
pub use register::register_rgbd_pair;

mod posegraph;
pub use posegraph::make_posegraph_for_fragment;

mod optimize;
pub use optimize::optimize_posegraph_for_fragment;

mod integrate;
pub use integrate::{integrate_rgb_frames_for_fragment, make_geometry_for_fragment};

pub mod make_fragments;

/// Progress sender name used by the fragment stages.
pub const PROGRESS_SENDER: &str = "make_fragments";

/// Contiguous frame range `[sid, eid)` processed as one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub id: usize,
    /// First frame, inclusive.
    pub sid: usize,
    /// Last frame, exclusive.
    pub eid: usize,
}

impl Fragment {
    /// The `id`-th fragment of a sequence of `n_frames`. The last one may be shorter.
    pub fn new(id: usize, n_frames_per_fragment: usize, n_frames: usize) -> Self {
        let sid = id * n_frames_per_fragment;
        let eid = sid.saturating_add(n_frames_per_fragment).min(n_frames);
        Self { id, sid, eid: eid.max(sid) }
    }

    pub fn frames(&self) -> Range<usize> {
        self.sid..self.eid
    }

    pub fn len(&self) -> usize {
        self.eid - self.sid
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the fragment stages share. Borrowed by every worker, so it only
/// holds read-only state, the cancellation token and the progress sink.
#[derive(Clone)]
pub struct FragmentContext<'a> {
    pub config: &'a ReconstructionConfig,
    pub dataset: &'a dyn RgbdDataset,
    pub intrinsic: CameraIntrinsics,
    pub engine: &'a dyn GeometryEngine,
    /// Seeds loop closure registration. Without it only adjacent frames are registered.
    pub pose_estimator: Option<&'a dyn PoseEstimator>,
    pub cancel: &'a CancellationToken,
    pub progress: &'a ProgressSink,
    pub n_fragments: usize,
}

impl<'a> FragmentContext<'a> {
    /// Prefix of the per-fragment progress messages, e.g. `Fragment 002 / 009`.
    pub(crate) fn fragment_label(&self, fragment_id: usize) -> String {
        format!(
            "Fragment {:03} / {:03}",
            fragment_id,
            self.n_fragments.saturating_sub(1)
        )
    }

    pub(crate) fn post<S: Into<String>>(&self, text: S) {
        self.progress.post(PROGRESS_SENDER, text);
    }
}
