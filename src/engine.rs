//! Capabilities of the dense geometry engine the pipeline orchestrates.
//!
//! Odometry, volumetric fusion, pose graph optimization and non-rigid
//! deformation are provided by an external library. The pipeline only talks
//! to it through these traits, so any backend (or a scripted fake) can be
//! plugged in.

use std::path::Path;

use nalgebra::Matrix6;

use crate::{
    camera::CameraIntrinsics, config::ReconstructionConfig, error::Error, image::RgbdImage,
    mesh::TriangleMesh, pointcloud::PointCloud, pose_graph::PoseGraph, transform::Transform,
};

/// Residual used by the RGBD odometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OdometryJacobian {
    /// Photometric term only.
    Color,
    /// Photometric plus geometric terms.
    Hybrid,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OdometryOption {
    /// Maximum depth difference for a pixel correspondence, in meters.
    pub depth_diff_max: f64,
    pub depth_min: f64,
    pub depth_max: f64,
    pub jacobian: OdometryJacobian,
}

impl OdometryOption {
    pub fn from_config(config: &ReconstructionConfig) -> Self {
        Self {
            depth_diff_max: config.depth_diff_max,
            depth_min: 0.0,
            depth_max: config.depth_max,
            jacobian: OdometryJacobian::Hybrid,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OdometryResult {
    pub success: bool,
    /// Transforms the source frame into the target frame.
    pub transform: Transform,
    pub information: Matrix6<f64>,
}

impl OdometryResult {
    /// Registration that found nothing: identity transform and information.
    pub fn failure() -> Self {
        Self {
            success: false,
            transform: Transform::eye(),
            information: Matrix6::identity(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TsdfColorType {
    NoColor,
    Rgb8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TsdfVolumeParams {
    pub voxel_length: f64,
    pub sdf_trunc: f64,
    pub color_type: TsdfColorType,
}

impl TsdfVolumeParams {
    pub fn from_config(config: &ReconstructionConfig) -> Self {
        Self {
            voxel_length: config.tsdf_voxel_length(),
            sdf_trunc: 0.04,
            color_type: TsdfColorType::Rgb8,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VoxelBlockGridParams {
    pub voxel_size: f64,
    /// Voxels per block edge.
    pub block_resolution: usize,
    pub block_count: usize,
}

impl VoxelBlockGridParams {
    pub fn from_config(config: &ReconstructionConfig) -> Self {
        Self {
            voxel_size: config.tsdf_voxel_length(),
            block_resolution: 16,
            block_count: config.block_count,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GlobalOptimizationOption {
    pub max_correspondence_distance: f64,
    /// Loop closure edges below this line process weight are pruned.
    pub edge_prune_threshold: f64,
    pub preference_loop_closure: f64,
    /// Node kept fixed during the optimization.
    pub reference_node: usize,
}

impl GlobalOptimizationOption {
    /// Options for optimizing a single fragment's graph.
    pub fn for_fragment(config: &ReconstructionConfig) -> Self {
        Self {
            max_correspondence_distance: config.depth_diff_max,
            edge_prune_threshold: 0.25,
            preference_loop_closure: config.preference_loop_closure_odometry,
            reference_node: 0,
        }
    }
}

/// Voxel block coordinates touched by a frame's frustum.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockCoordinates(pub Vec<[i32; 3]>);

impl BlockCoordinates {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Truncated signed distance volume. Owned by a single integration pass.
pub trait TsdfVolume {
    fn integrate(
        &mut self,
        rgbd: &RgbdImage,
        intrinsic: &CameraIntrinsics,
        extrinsic: &Transform,
    ) -> Result<(), Error>;

    fn extract_triangle_mesh(&mut self) -> Result<TriangleMesh, Error>;
}

/// Sparse block-hashed fusion volume used by the SLAC integration.
pub trait VoxelBlockGrid {
    fn compute_unique_block_coordinates(
        &self,
        depth: &RgbdImage,
        intrinsic: &CameraIntrinsics,
        extrinsic: &Transform,
        depth_scale: f64,
        depth_max: f64,
    ) -> Result<BlockCoordinates, Error>;

    #[allow(clippy::too_many_arguments)]
    fn integrate(
        &mut self,
        block_coords: &BlockCoordinates,
        rgbd: &RgbdImage,
        intrinsic: &CameraIntrinsics,
        extrinsic: &Transform,
        depth_scale: f64,
        depth_max: f64,
    ) -> Result<(), Error>;

    fn extract_point_cloud(&mut self) -> Result<PointCloud, Error>;

    fn extract_triangle_mesh(&mut self) -> Result<TriangleMesh, Error>;
}

/// Non-rigid correction lattice fitted by the SLAC optimization.
pub trait ControlGrid {
    /// Warps a frame through the grid. `extrinsic` is the frame's local (fragment) extrinsic.
    fn deform(
        &self,
        rgbd: &RgbdImage,
        intrinsic: &CameraIntrinsics,
        extrinsic: &Transform,
        depth_scale: f64,
        depth_max: f64,
    ) -> Result<RgbdImage, Error>;
}

/// Coarse feature-based pose estimation, used to seed odometry between
/// non-adjacent frames.
pub trait PoseEstimator: Send + Sync {
    /// Returns `None` when no pose could be estimated.
    fn estimate(
        &self,
        source: &RgbdImage,
        target: &RgbdImage,
        intrinsic: &CameraIntrinsics,
    ) -> Option<Transform>;
}

/// The dense geometry backend.
pub trait GeometryEngine: Send + Sync {
    fn compute_rgbd_odometry(
        &self,
        source: &RgbdImage,
        target: &RgbdImage,
        intrinsic: &CameraIntrinsics,
        init: &Transform,
        option: &OdometryOption,
    ) -> Result<OdometryResult, Error>;

    fn create_tsdf_volume(&self, params: &TsdfVolumeParams) -> Result<Box<dyn TsdfVolume>, Error>;

    /// Globally optimizes the graph. Loop closures may be pruned, node count is kept.
    fn optimize_pose_graph(
        &self,
        graph: PoseGraph,
        option: &GlobalOptimizationOption,
    ) -> Result<PoseGraph, Error>;

    fn create_voxel_block_grid(
        &self,
        params: &VoxelBlockGridParams,
    ) -> Result<Box<dyn VoxelBlockGrid>, Error>;

    /// Loads a control grid from its persisted key and value tensors.
    fn load_control_grid(
        &self,
        grid_size: f64,
        keys_path: &Path,
        values_path: &Path,
    ) -> Result<Box<dyn ControlGrid>, Error>;
}
