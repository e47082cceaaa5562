//! Dataset-wide integration through the SLAC control grid.
//!
//! Every frame of every fragment is warped by the non-rigid control grid and
//! fused into a single voxel block grid, placed by the fragment pose from the
//! SLAC optimized pose graph composed with the frame pose inside its fragment.

use std::path::PathBuf;

use crate::{
    cancel::{CancellationToken, Outcome},
    config::{OutputKind, ReconstructionConfig},
    engine::{GeometryEngine, VoxelBlockGridParams},
    error::Error,
    io::{
        dataset::{RgbdDataset, RgbdFileDataset},
        read_pose_graph, write_ply, Geometry,
    },
    progress::ProgressSink,
};

/// Progress sender name of the SLAC stage.
pub const PROGRESS_SENDER: &str = "slac_integrate";

/// Edge length of the control grid cells, in meters.
pub const CONTROL_GRID_SIZE: f64 = 3.0 / 8.0;

const CONTROL_GRID_KEYS: &str = "ctr_grid_keys.npy";
const CONTROL_GRID_VALUES: &str = "ctr_grid_values.npy";

/// Integrates the dataset at `config.path_dataset` and writes the global point
/// cloud or mesh to [`ReconstructionConfig::slac_output_path`].
pub fn run(
    config: &ReconstructionConfig,
    engine: &dyn GeometryEngine,
    cancel: &CancellationToken,
    progress: &ProgressSink,
) -> Result<Outcome<PathBuf>, Error> {
    config.validate()?;
    progress.post(PROGRESS_SENDER, "slac non-rigid optimization.");

    let dataset = RgbdFileDataset::load(&config.path_dataset, config.depth_scale, config.depth_max)?;
    run_with_dataset(config, &dataset, engine, cancel, progress)
}

/// Same as [`run`] over an already opened dataset.
///
/// Frames are taken from `dataset` in order: the `k`-th node visited across
/// all fragment graphs is frame `k`. Nothing is written when cancelled.
pub fn run_with_dataset(
    config: &ReconstructionConfig,
    dataset: &dyn RgbdDataset,
    engine: &dyn GeometryEngine,
    cancel: &CancellationToken,
    progress: &ProgressSink,
) -> Result<Outcome<PathBuf>, Error> {
    let slac_folder = config.slac_folder();
    let posegraph = read_pose_graph(slac_folder.join(&config.template_optimized_posegraph_slac))?;
    let intrinsic = config.intrinsic()?;

    let mut voxel_grid = engine.create_voxel_block_grid(&VoxelBlockGridParams::from_config(config))?;
    let ctr_grid = engine.load_control_grid(
        CONTROL_GRID_SIZE,
        &slac_folder.join(CONTROL_GRID_KEYS),
        &slac_folder.join(CONTROL_GRID_VALUES),
    )?;

    let stop = || -> Result<Outcome<PathBuf>, Error> {
        progress.post(PROGRESS_SENDER, "Stopping SLAC integration");
        Ok(Outcome::Cancelled)
    };

    let (depth_scale, depth_max) = (config.depth_scale, config.depth_max);
    let mut k = 0;
    for (i, fragment_node) in posegraph.nodes.iter().enumerate() {
        if cancel.is_cancelled() {
            return stop();
        }

        let fragment_posegraph = read_pose_graph(config.fragment_posegraph_optimized_path(i)?)?;
        for node in fragment_posegraph.nodes.iter() {
            if cancel.is_cancelled() {
                return stop();
            }

            let extrinsic_local = node.pose.inverse();
            let extrinsic = (&fragment_node.pose * &node.pose).inverse();

            let rgbd = dataset.get(k)?;
            progress.post(
                PROGRESS_SENDER,
                format!("Deforming and integrating Frame {k:3}"),
            );
            let rgbd_projected =
                ctr_grid.deform(&rgbd, &intrinsic, &extrinsic_local, depth_scale, depth_max)?;

            let frustum_block_coords = voxel_grid.compute_unique_block_coordinates(
                &rgbd_projected,
                &intrinsic,
                &extrinsic,
                depth_scale,
                depth_max,
            )?;
            voxel_grid.integrate(
                &frustum_block_coords,
                &rgbd_projected,
                &intrinsic,
                &extrinsic,
                depth_scale,
                depth_max,
            )?;
            k += 1;
        }
    }
    log::debug!(
        "SLAC integrated {k} frames from {} fragments",
        posegraph.len()
    );

    let geometry = match config.save_output_as {
        OutputKind::PointCloud => Geometry::from(voxel_grid.extract_point_cloud()?),
        OutputKind::Mesh => Geometry::from(voxel_grid.extract_triangle_mesh()?),
    };
    let filepath = config.slac_output_path();
    write_ply(&filepath, &geometry)?;
    Ok(Outcome::Completed(filepath))
}
