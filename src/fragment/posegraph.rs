use itertools::Itertools;

use super::{register_rgbd_pair, Fragment, FragmentContext};
use crate::{
    cancel::Outcome,
    error::Error,
    io::write_pose_graph,
    pose_graph::{PoseGraph, PoseGraphEdge},
    trajectory_builder::TrajectoryBuilder,
};

/// Builds the pose graph of a fragment and writes it to the fragment pose graph path.
///
/// Node 0 is the identity and one node is added per adjacent frame pair, so the
/// graph has one node per frame. Adjacent pairs add odometry edges; pairs whose
/// frames are both multiples of the keyframe stride add a loop closure edge when
/// the registration succeeds. A pair that is both adjacent and a keyframe pair is
/// registered twice, once for each role.
///
/// Edges use fragment-local indices. When cancelled nothing is written.
pub fn make_posegraph_for_fragment(
    ctx: &FragmentContext,
    fragment: &Fragment,
) -> Result<Outcome<PoseGraph>, Error> {
    let keyframe_stride = ctx.config.n_keyframes_per_n_frame;
    let label = ctx.fragment_label(fragment.id);

    let mut pose_graph = PoseGraph::with_root();
    let mut trajectory = TrajectoryBuilder::default();

    for (s, t) in fragment.frames().tuple_combinations() {
        if ctx.cancel.is_cancelled() {
            ctx.post(format!(
                "Stopping posegraph creation for fragment {}",
                fragment.id
            ));
            return Ok(Outcome::Cancelled);
        }

        if t == s + 1 {
            ctx.post(format!(
                "{label} :: RGBD matching between frame : {s} and {t}"
            ));
            let odometry = register_rgbd_pair(ctx, s, t)?;
            let pose = trajectory.accumulate(&odometry.transform);
            pose_graph.add_node(pose);
            pose_graph.add_edge(PoseGraphEdge::odometry(
                s - fragment.sid,
                t - fragment.sid,
                odometry.transform,
                odometry.information,
            ));
        }

        if s % keyframe_stride == 0 && t % keyframe_stride == 0 {
            ctx.post(format!(
                "{label} :: RGBD matching between frame : {s} and {t}"
            ));
            let loop_closure = register_rgbd_pair(ctx, s, t)?;
            if loop_closure.success {
                pose_graph.add_edge(PoseGraphEdge::loop_closure(
                    s - fragment.sid,
                    t - fragment.sid,
                    loop_closure.transform,
                    loop_closure.information,
                ));
            }
        }
    }

    write_pose_graph(
        ctx.config.fragment_posegraph_path(fragment.id)?,
        &pose_graph,
    )?;
    log::debug!(
        "Fragment {} pose graph: {} nodes, {} edges",
        fragment.id,
        pose_graph.len(),
        pose_graph.edges.len()
    );
    Ok(Outcome::Completed(pose_graph))
}
