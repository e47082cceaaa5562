use super::{Fragment, FragmentContext};
use crate::{
    engine::GlobalOptimizationOption,
    error::Error,
    io::{read_pose_graph, write_pose_graph},
    pose_graph::PoseGraph,
};

/// Reads the fragment pose graph, optimizes it with the engine and writes the
/// result to the optimized pose graph path.
pub fn optimize_posegraph_for_fragment(
    ctx: &FragmentContext,
    fragment: &Fragment,
) -> Result<PoseGraph, Error> {
    let pose_graph = read_pose_graph(ctx.config.fragment_posegraph_path(fragment.id)?)?;
    let n_nodes = pose_graph.len();

    let option = GlobalOptimizationOption::for_fragment(ctx.config);
    let optimized = ctx.engine.optimize_pose_graph(pose_graph, &option)?;
    if optimized.len() != n_nodes {
        return Err(Error::engine(format!(
            "Optimizing fragment {} changed the node count from {n_nodes} to {}",
            fragment.id,
            optimized.len()
        )));
    }

    write_pose_graph(
        ctx.config.fragment_posegraph_optimized_path(fragment.id)?,
        &optimized,
    )?;
    Ok(optimized)
}
