use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use nalgebra::{Matrix6, Vector6};
use ndarray::Array2;

use super::datasets::frame_index;
use crate::{
    camera::CameraIntrinsics,
    cancel::CancellationToken,
    engine::{
        BlockCoordinates, ControlGrid, GeometryEngine, GlobalOptimizationOption, OdometryOption,
        OdometryResult, PoseEstimator, TsdfVolume, TsdfVolumeParams, VoxelBlockGrid,
        VoxelBlockGridParams,
    },
    error::Error,
    image::RgbdImage,
    mesh::TriangleMesh,
    pointcloud::PointCloud,
    pose_graph::PoseGraph,
    transform::Transform,
};

/// Relative transform the fakes report between frames `s` and `t`.
pub fn step_transform(s: usize, t: usize) -> Transform {
    Transform::from_se3_exp(&Vector6::new(
        0.01 * s as f64,
        0.02 * t as f64,
        -0.01,
        0.001 * s as f64,
        0.0,
        0.002 * t as f64,
    ))
}

pub type PairPredicate = Box<dyn Fn(usize, usize) -> bool + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
pub struct OdometryCall {
    pub source: usize,
    pub target: usize,
    pub init: Transform,
}

/// A frame fused into a volume.
#[derive(Clone, Debug, PartialEq)]
pub struct IntegrateCall {
    pub frame: usize,
    pub extrinsic: Transform,
    /// Blocks passed along, only for voxel block grids.
    pub blocks: Option<BlockCoordinates>,
}

/// A frame warped through the control grid.
#[derive(Clone, Debug, PartialEq)]
pub struct DeformCall {
    pub frame: usize,
    pub extrinsic: Transform,
}

#[derive(Default)]
struct Records {
    odometry: Vec<OdometryCall>,
    integrations: Vec<IntegrateCall>,
    block_integrations: Vec<IntegrateCall>,
    deformations: Vec<DeformCall>,
    control_grid_size: Option<f64>,
    n_optimize: usize,
}

/// Engine that computes nothing and records every call.
///
/// Odometry returns [`step_transform`] between the frames. The optimizer keeps
/// the nodes and drops every uncertain edge. Volumes extract one vertex per
/// integrated frame and chain consecutive vertices into triangles.
pub struct ScriptedEngine {
    records: Arc<Mutex<Records>>,
    pub odometry_success: PairPredicate,
    /// Token cancelled by the `cancel_after_*` triggers.
    pub cancel: CancellationToken,
    pub cancel_after_odometry: Option<usize>,
    pub cancel_after_optimize: bool,
    pub cancel_after_integrations: Option<usize>,
    pub cancel_after_block_integrations: Option<usize>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(Records::default())),
            odometry_success: Box::new(|_, _| true),
            cancel: CancellationToken::new(),
            cancel_after_odometry: None,
            cancel_after_optimize: false,
            cancel_after_integrations: None,
            cancel_after_block_integrations: None,
        }
    }
}

impl ScriptedEngine {
    /// Engine whose triggers cancel `cancel`.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Default::default()
        }
    }

    pub fn odometry_calls(&self) -> Vec<OdometryCall> {
        self.records.lock().unwrap().odometry.clone()
    }

    pub fn integrate_calls(&self) -> Vec<IntegrateCall> {
        self.records.lock().unwrap().integrations.clone()
    }

    pub fn block_integrate_calls(&self) -> Vec<IntegrateCall> {
        self.records.lock().unwrap().block_integrations.clone()
    }

    pub fn deform_calls(&self) -> Vec<DeformCall> {
        self.records.lock().unwrap().deformations.clone()
    }

    pub fn control_grid_size(&self) -> Option<f64> {
        self.records.lock().unwrap().control_grid_size
    }

    pub fn optimize_count(&self) -> usize {
        self.records.lock().unwrap().n_optimize
    }
}

impl GeometryEngine for ScriptedEngine {
    fn compute_rgbd_odometry(
        &self,
        source: &RgbdImage,
        target: &RgbdImage,
        _intrinsic: &CameraIntrinsics,
        init: &Transform,
        _option: &OdometryOption,
    ) -> Result<OdometryResult, Error> {
        let (s, t) = (frame_index(source), frame_index(target));
        let n_calls = {
            let mut records = self.records.lock().unwrap();
            records.odometry.push(OdometryCall {
                source: s,
                target: t,
                init: init.clone(),
            });
            records.odometry.len()
        };
        if self.cancel_after_odometry == Some(n_calls) {
            self.cancel.cancel();
        }

        if (self.odometry_success)(s, t) {
            Ok(OdometryResult {
                success: true,
                transform: step_transform(s, t),
                information: Matrix6::identity() * 10.0,
            })
        } else {
            Ok(OdometryResult::failure())
        }
    }

    fn create_tsdf_volume(&self, _params: &TsdfVolumeParams) -> Result<Box<dyn TsdfVolume>, Error> {
        Ok(Box::new(ScriptedVolume {
            records: self.records.clone(),
            frames: Vec::new(),
            cancel: self.cancel.clone(),
            cancel_after: self.cancel_after_integrations,
        }))
    }

    fn optimize_pose_graph(
        &self,
        mut graph: PoseGraph,
        _option: &GlobalOptimizationOption,
    ) -> Result<PoseGraph, Error> {
        self.records.lock().unwrap().n_optimize += 1;
        if self.cancel_after_optimize {
            self.cancel.cancel();
        }
        graph.edges.retain(|edge| !edge.uncertain);
        Ok(graph)
    }

    fn create_voxel_block_grid(
        &self,
        _params: &VoxelBlockGridParams,
    ) -> Result<Box<dyn VoxelBlockGrid>, Error> {
        Ok(Box::new(ScriptedBlockGrid {
            volume: ScriptedVolume {
                records: self.records.clone(),
                frames: Vec::new(),
                cancel: self.cancel.clone(),
                cancel_after: None,
            },
            cancel_after: self.cancel_after_block_integrations,
        }))
    }

    fn load_control_grid(
        &self,
        grid_size: f64,
        keys_path: &Path,
        values_path: &Path,
    ) -> Result<Box<dyn ControlGrid>, Error> {
        std::fs::metadata(keys_path)?;
        std::fs::metadata(values_path)?;
        self.records.lock().unwrap().control_grid_size = Some(grid_size);
        Ok(Box::new(ScriptedControlGrid {
            records: self.records.clone(),
        }))
    }
}

struct ScriptedVolume {
    records: Arc<Mutex<Records>>,
    frames: Vec<(usize, u8, Transform)>,
    cancel: CancellationToken,
    /// Cancels after this many TSDF integrations, across volumes.
    cancel_after: Option<usize>,
}

impl ScriptedVolume {
    fn push(&mut self, rgbd: &RgbdImage, extrinsic: &Transform) {
        self.frames
            .push((frame_index(rgbd), rgbd.color[[0, 0, 0]], extrinsic.clone()));
    }

    /// One vertex per frame at its camera center, shifted so that consecutive
    /// vertices are never collinear.
    fn mesh(&self) -> TriangleMesh {
        let n_vertices = self.frames.len();
        let centers = self
            .frames
            .iter()
            .map(|(_, _, extrinsic)| extrinsic.inverse().translation())
            .collect::<Vec<_>>();
        let vertices = Array2::from_shape_fn((n_vertices, 3), |(i, c)| {
            let offset = if c == 1 { (i % 2) as f64 } else { 0.0 };
            (centers[i][c] + offset) as f32
        });
        let colors = Array2::from_shape_fn((n_vertices, 3), |(i, _)| self.frames[i].1);
        let n_triangles = n_vertices.saturating_sub(2);
        let triangles = Array2::from_shape_fn((n_triangles, 3), |(i, c)| i + c);

        TriangleMesh::new(vertices, triangles).with_colors(colors)
    }
}

impl TsdfVolume for ScriptedVolume {
    fn integrate(
        &mut self,
        rgbd: &RgbdImage,
        _intrinsic: &CameraIntrinsics,
        extrinsic: &Transform,
    ) -> Result<(), Error> {
        self.push(rgbd, extrinsic);
        let n_calls = {
            let mut records = self.records.lock().unwrap();
            records.integrations.push(IntegrateCall {
                frame: frame_index(rgbd),
                extrinsic: extrinsic.clone(),
                blocks: None,
            });
            records.integrations.len()
        };
        if self.cancel_after == Some(n_calls) {
            self.cancel.cancel();
        }
        Ok(())
    }

    fn extract_triangle_mesh(&mut self) -> Result<TriangleMesh, Error> {
        Ok(self.mesh())
    }
}

struct ScriptedBlockGrid {
    volume: ScriptedVolume,
    cancel_after: Option<usize>,
}

impl VoxelBlockGrid for ScriptedBlockGrid {
    fn compute_unique_block_coordinates(
        &self,
        depth: &RgbdImage,
        _intrinsic: &CameraIntrinsics,
        _extrinsic: &Transform,
        _depth_scale: f64,
        _depth_max: f64,
    ) -> Result<BlockCoordinates, Error> {
        Ok(BlockCoordinates(vec![[frame_index(depth) as i32, 0, 0]]))
    }

    fn integrate(
        &mut self,
        block_coords: &BlockCoordinates,
        rgbd: &RgbdImage,
        _intrinsic: &CameraIntrinsics,
        extrinsic: &Transform,
        _depth_scale: f64,
        _depth_max: f64,
    ) -> Result<(), Error> {
        self.volume.push(rgbd, extrinsic);
        let n_calls = {
            let mut records = self.volume.records.lock().unwrap();
            records.block_integrations.push(IntegrateCall {
                frame: frame_index(rgbd),
                extrinsic: extrinsic.clone(),
                blocks: Some(block_coords.clone()),
            });
            records.block_integrations.len()
        };
        if self.cancel_after == Some(n_calls) {
            self.volume.cancel.cancel();
        }
        Ok(())
    }

    fn extract_point_cloud(&mut self) -> Result<PointCloud, Error> {
        let mut pcl = self.volume.mesh().to_point_cloud();
        pcl.normals = Some(Array2::zeros((pcl.len(), 3)));
        Ok(pcl)
    }

    fn extract_triangle_mesh(&mut self) -> Result<TriangleMesh, Error> {
        Ok(self.volume.mesh())
    }
}

struct ScriptedControlGrid {
    records: Arc<Mutex<Records>>,
}

impl ControlGrid for ScriptedControlGrid {
    fn deform(
        &self,
        rgbd: &RgbdImage,
        _intrinsic: &CameraIntrinsics,
        extrinsic: &Transform,
        _depth_scale: f64,
        _depth_max: f64,
    ) -> Result<RgbdImage, Error> {
        self.records.lock().unwrap().deformations.push(DeformCall {
            frame: frame_index(rgbd),
            extrinsic: extrinsic.clone(),
        });
        Ok(rgbd.clone())
    }
}

/// Pose estimator accepting the pairs its predicate selects, with [`step_transform`].
pub struct ScriptedEstimator {
    pub accept: PairPredicate,
}

impl PoseEstimator for ScriptedEstimator {
    fn estimate(
        &self,
        source: &RgbdImage,
        target: &RgbdImage,
        _intrinsic: &CameraIntrinsics,
    ) -> Option<Transform> {
        let (s, t) = (frame_index(source), frame_index(target));
        if (self.accept)(s, t) {
            Some(step_transform(s, t))
        } else {
            None
        }
    }
}
