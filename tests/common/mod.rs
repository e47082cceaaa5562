#![allow(dead_code)]

use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use nalgebra::{UnitQuaternion, Vector3};
use ndarray::Array2;
use recon3d::{
    camera::CameraIntrinsics,
    config::ReconstructionConfig,
    engine::{
        BlockCoordinates, ControlGrid, GeometryEngine, GlobalOptimizationOption, OdometryOption,
        OdometryResult, TsdfVolume, TsdfVolumeParams, VoxelBlockGrid, VoxelBlockGridParams,
    },
    error::Error,
    io::write_pose_graph,
    mesh::TriangleMesh,
    pointcloud::PointCloud,
    pose_graph::PoseGraph,
    transform::Transform,
    RgbdImage,
};

/// Writes `n_frames` 16x12 frames under `rgb/` and `depth/`. Every depth pixel
/// of frame `i` is `1500 + i` and every color channel is `10 * i`.
pub fn write_dataset(dir: &Path, n_frames: usize) {
    write_dataset_unpaired(dir, n_frames, n_frames);
}

pub fn write_dataset_unpaired(dir: &Path, n_color: usize, n_depth: usize) {
    std::fs::create_dir_all(dir.join("rgb")).unwrap();
    std::fs::create_dir_all(dir.join("depth")).unwrap();
    for i in 0..n_color {
        let value = (10 * i) as u8;
        let color: RgbImage = ImageBuffer::from_pixel(16, 12, Rgb([value, value, value]));
        color.save(dir.join(format!("rgb/{i:05}.png"))).unwrap();
    }
    for i in 0..n_depth {
        let depth: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(16, 12, Luma([1500 + i as u16]));
        depth.save(dir.join(format!("depth/{i:05}.png"))).unwrap();
    }
}

pub fn frame_of(rgbd: &RgbdImage) -> usize {
    (rgbd.depth[[0, 0]] - 1500) as usize
}

/// Writes the inputs the SLAC stage expects besides the fragment graphs.
pub fn write_slac_inputs(config: &ReconstructionConfig, n_fragments: usize) {
    let slac_folder = config.slac_folder();
    let mut graph = PoseGraph::new();
    for i in 0..n_fragments {
        graph.add_node(Transform::new(
            &Vector3::new(i as f64, 0.0, 0.0),
            UnitQuaternion::identity(),
        ));
    }
    write_pose_graph(
        slac_folder.join(&config.template_optimized_posegraph_slac),
        &graph,
    )
    .unwrap();
    std::fs::write(slac_folder.join("ctr_grid_keys.npy"), b"").unwrap();
    std::fs::write(slac_folder.join("ctr_grid_values.npy"), b"").unwrap();
}

/// Engine that moves the camera 5cm along x per frame and fuses one vertex per frame.
#[derive(Default)]
pub struct WalkingEngine {
    pub n_odometry: AtomicUsize,
    pub n_optimize: AtomicUsize,
    pub intrinsics: Mutex<Vec<CameraIntrinsics>>,
}

impl WalkingEngine {
    pub fn odometry_count(&self) -> usize {
        self.n_odometry.load(Ordering::SeqCst)
    }
}

fn walk(s: usize, t: usize) -> Transform {
    Transform::new(
        &Vector3::new(-0.05 * (t as f64 - s as f64), 0.0, 0.0),
        UnitQuaternion::identity(),
    )
}

impl GeometryEngine for WalkingEngine {
    fn compute_rgbd_odometry(
        &self,
        source: &RgbdImage,
        target: &RgbdImage,
        intrinsic: &CameraIntrinsics,
        _init: &Transform,
        _option: &OdometryOption,
    ) -> Result<OdometryResult, Error> {
        self.n_odometry.fetch_add(1, Ordering::SeqCst);
        self.intrinsics.lock().unwrap().push(intrinsic.clone());
        Ok(OdometryResult {
            success: true,
            transform: walk(frame_of(source), frame_of(target)),
            information: nalgebra::Matrix6::identity(),
        })
    }

    fn create_tsdf_volume(&self, _params: &TsdfVolumeParams) -> Result<Box<dyn TsdfVolume>, Error> {
        Ok(Box::new(VertexVolume::default()))
    }

    fn optimize_pose_graph(
        &self,
        mut graph: PoseGraph,
        option: &GlobalOptimizationOption,
    ) -> Result<PoseGraph, Error> {
        self.n_optimize.fetch_add(1, Ordering::SeqCst);
        assert_eq!(option.reference_node, 0);
        graph.edges.retain(|edge| !edge.uncertain);
        Ok(graph)
    }

    fn create_voxel_block_grid(
        &self,
        _params: &VoxelBlockGridParams,
    ) -> Result<Box<dyn VoxelBlockGrid>, Error> {
        Ok(Box::new(VertexVolume::default()))
    }

    fn load_control_grid(
        &self,
        _grid_size: f64,
        keys_path: &Path,
        values_path: &Path,
    ) -> Result<Box<dyn ControlGrid>, Error> {
        std::fs::metadata(keys_path)?;
        std::fs::metadata(values_path)?;
        Ok(Box::new(IdentityGrid))
    }
}

/// Keeps the camera center and color of every integrated frame.
#[derive(Default)]
struct VertexVolume {
    centers: Vec<[f32; 3]>,
    colors: Vec<u8>,
}

impl VertexVolume {
    fn push(&mut self, rgbd: &RgbdImage, extrinsic: &Transform) {
        let center = extrinsic.inverse().translation();
        let zigzag = (self.centers.len() % 2) as f64;
        self.centers
            .push([center[0] as f32, (center[1] + zigzag) as f32, center[2] as f32]);
        self.colors.push(rgbd.color[[0, 0, 0]]);
    }

    fn mesh(&self) -> TriangleMesh {
        let n = self.centers.len();
        let vertices = Array2::from_shape_fn((n, 3), |(i, c)| self.centers[i][c]);
        let colors = Array2::from_shape_fn((n, 3), |(i, _)| self.colors[i]);
        let triangles = Array2::from_shape_fn((n.saturating_sub(2), 3), |(i, c)| i + c);
        TriangleMesh::new(vertices, triangles).with_colors(colors)
    }
}

impl TsdfVolume for VertexVolume {
    fn integrate(
        &mut self,
        rgbd: &RgbdImage,
        _intrinsic: &CameraIntrinsics,
        extrinsic: &Transform,
    ) -> Result<(), Error> {
        self.push(rgbd, extrinsic);
        Ok(())
    }

    fn extract_triangle_mesh(&mut self) -> Result<TriangleMesh, Error> {
        Ok(self.mesh())
    }
}

impl VoxelBlockGrid for VertexVolume {
    fn compute_unique_block_coordinates(
        &self,
        _depth: &RgbdImage,
        _intrinsic: &CameraIntrinsics,
        extrinsic: &Transform,
        _depth_scale: f64,
        _depth_max: f64,
    ) -> Result<BlockCoordinates, Error> {
        let center = extrinsic.inverse().translation();
        Ok(BlockCoordinates(vec![[
            center[0].floor() as i32,
            center[1].floor() as i32,
            center[2].floor() as i32,
        ]]))
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
        assert!(!block_coords.is_empty());
        self.push(rgbd, extrinsic);
        Ok(())
    }

    fn extract_point_cloud(&mut self) -> Result<PointCloud, Error> {
        Ok(self.mesh().to_point_cloud())
    }

    fn extract_triangle_mesh(&mut self) -> Result<TriangleMesh, Error> {
        Ok(self.mesh())
    }
}

struct IdentityGrid;

impl ControlGrid for IdentityGrid {
    fn deform(
        &self,
        rgbd: &RgbdImage,
        _intrinsic: &CameraIntrinsics,
        _extrinsic: &Transform,
        _depth_scale: f64,
        _depth_max: f64,
    ) -> Result<RgbdImage, Error> {
        Ok(rgbd.clone())
    }
}
