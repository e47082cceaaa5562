use std::path::PathBuf;

use super::{Fragment, FragmentContext};
use crate::{
    cancel::Outcome,
    config::OutputKind,
    engine::TsdfVolumeParams,
    error::Error,
    io::{read_pose_graph, write_ply, Geometry},
    mesh::TriangleMesh,
    pose_graph::PoseGraph,
};

/// Fuses the frames of a fragment into a fresh TSDF volume following its
/// optimized pose graph, then extracts a mesh with vertex normals.
///
/// Node `i` of the graph is frame `fragment_id * n_frames_per_fragment + i`.
pub fn integrate_rgb_frames_for_fragment(
    ctx: &FragmentContext,
    fragment_id: usize,
    pose_graph: &PoseGraph,
) -> Result<Outcome<TriangleMesh>, Error> {
    let mut volume = ctx
        .engine
        .create_tsdf_volume(&TsdfVolumeParams::from_config(ctx.config))?;
    let label = ctx.fragment_label(fragment_id);
    let n_nodes = pose_graph.len();

    for (i, node) in pose_graph.nodes.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            ctx.post(format!("Stopping integration for fragment {fragment_id}"));
            return Ok(Outcome::Cancelled);
        }

        let i_abs = fragment_id * ctx.config.n_frames_per_fragment + i;
        ctx.post(format!(
            "{label} :: integrate rgbd frame {i_abs} ({} of {n_nodes}).",
            i + 1
        ));
        let rgbd = ctx.dataset.get(i_abs)?;
        volume.integrate(&rgbd, &ctx.intrinsic, &node.pose.inverse())?;
    }

    let mut mesh = volume.extract_triangle_mesh()?;
    mesh.compute_vertex_normals()?;
    Ok(Outcome::Completed(mesh))
}

/// Integrates the fragment from its optimized pose graph and writes the fused
/// point cloud or mesh (per `save_output_as`) to the fragment output path.
pub fn make_geometry_for_fragment(
    ctx: &FragmentContext,
    fragment: &Fragment,
) -> Result<Outcome<PathBuf>, Error> {
    let pose_graph = read_pose_graph(ctx.config.fragment_posegraph_optimized_path(fragment.id)?)?;

    let mesh = match integrate_rgb_frames_for_fragment(ctx, fragment.id, &pose_graph)? {
        Outcome::Completed(mesh) => mesh,
        Outcome::Cancelled => return Ok(Outcome::Cancelled),
    };

    let geometry = match ctx.config.save_output_as {
        OutputKind::PointCloud => Geometry::from(mesh.to_point_cloud()),
        OutputKind::Mesh => Geometry::from(mesh),
    };
    let filepath = ctx.config.fragment_output_path(fragment.id)?;
    write_ply(&filepath, &geometry)?;
    Ok(Outcome::Completed(filepath))
}
