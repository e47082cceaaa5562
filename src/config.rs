//! Reconstruction configuration, read from the same JSON file the
//! reconstruction system is driven with.

use std::path::{Path, PathBuf};

use serde_derive::{Deserialize, Serialize};

use crate::{camera::CameraIntrinsics, error::Error, io::read_pinhole_camera_intrinsic};

/// Which geometry the integration stages persist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    PointCloud,
    Mesh,
}

impl Default for OutputKind {
    fn default() -> Self {
        OutputKind::PointCloud
    }
}

mod defaults {
    pub fn depth_scale() -> f64 {
        1000.0
    }
    pub fn depth_max() -> f64 {
        3.0
    }
    pub fn depth_diff_max() -> f64 {
        0.07
    }
    pub fn n_frames_per_fragment() -> usize {
        100
    }
    pub fn n_keyframes_per_n_frame() -> usize {
        5
    }
    pub fn tsdf_cubic_size() -> f64 {
        3.0
    }
    pub fn multi_threading() -> bool {
        true
    }
    pub fn preference_loop_closure_odometry() -> f64 {
        0.1
    }
    pub fn folder_fragment() -> String {
        "fragments/".to_string()
    }
    pub fn template_fragment_posegraph() -> String {
        "fragments/fragment_%03d.json".to_string()
    }
    pub fn template_fragment_posegraph_optimized() -> String {
        "fragments/fragment_optimized_%03d.json".to_string()
    }
    pub fn template_fragment_pointcloud() -> String {
        "fragments/fragment_%03d.ply".to_string()
    }
    pub fn template_fragment_mesh() -> String {
        "fragments/fragment_mesh_%03d.ply".to_string()
    }
    pub fn subfolder_slac() -> String {
        "slac/0.050/".to_string()
    }
    pub fn template_optimized_posegraph_slac() -> String {
        "optimized_posegraph_slac.json".to_string()
    }
    pub fn block_count() -> usize {
        40000
    }
}

/// Settings shared by every reconstruction stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    /// Root of the RGBD dataset. Every output path is relative to it.
    pub path_dataset: PathBuf,
    /// Pinhole intrinsic JSON. Empty selects the PrimeSense default.
    #[serde(default)]
    pub path_intrinsic: String,
    #[serde(default = "defaults::depth_scale")]
    pub depth_scale: f64,
    /// Depth truncation in meters.
    #[serde(default = "defaults::depth_max")]
    pub depth_max: f64,
    #[serde(default = "defaults::depth_diff_max")]
    pub depth_diff_max: f64,
    #[serde(default = "defaults::n_frames_per_fragment")]
    pub n_frames_per_fragment: usize,
    /// Keyframe stride: frame pairs that are both multiples of it are loop closure candidates.
    #[serde(default = "defaults::n_keyframes_per_n_frame")]
    pub n_keyframes_per_n_frame: usize,
    #[serde(default = "defaults::tsdf_cubic_size")]
    pub tsdf_cubic_size: f64,
    /// Process fragments on a worker pool instead of one after another.
    #[serde(
        default = "defaults::multi_threading",
        rename = "python_multi_threading",
        alias = "multi_threading"
    )]
    pub multi_threading: bool,
    /// Overrides the worker pool size.
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default = "defaults::preference_loop_closure_odometry")]
    pub preference_loop_closure_odometry: f64,
    #[serde(default = "defaults::folder_fragment")]
    pub folder_fragment: String,
    #[serde(default = "defaults::template_fragment_posegraph")]
    pub template_fragment_posegraph: String,
    #[serde(default = "defaults::template_fragment_posegraph_optimized")]
    pub template_fragment_posegraph_optimized: String,
    #[serde(default = "defaults::template_fragment_pointcloud")]
    pub template_fragment_pointcloud: String,
    #[serde(default = "defaults::template_fragment_mesh")]
    pub template_fragment_mesh: String,
    #[serde(default = "defaults::subfolder_slac")]
    pub subfolder_slac: String,
    #[serde(default = "defaults::template_optimized_posegraph_slac")]
    pub template_optimized_posegraph_slac: String,
    #[serde(default)]
    pub save_output_as: OutputKind,
    /// Capacity hint for the SLAC voxel block grid.
    #[serde(default = "defaults::block_count")]
    pub block_count: usize,
}

impl ReconstructionConfig {
    /// Configuration with every default and the given dataset.
    pub fn new<P: AsRef<Path>>(path_dataset: P) -> Self {
        Self {
            path_dataset: path_dataset.as_ref().to_path_buf(),
            path_intrinsic: String::new(),
            depth_scale: defaults::depth_scale(),
            depth_max: defaults::depth_max(),
            depth_diff_max: defaults::depth_diff_max(),
            n_frames_per_fragment: defaults::n_frames_per_fragment(),
            n_keyframes_per_n_frame: defaults::n_keyframes_per_n_frame(),
            tsdf_cubic_size: defaults::tsdf_cubic_size(),
            multi_threading: defaults::multi_threading(),
            max_workers: None,
            preference_loop_closure_odometry: defaults::preference_loop_closure_odometry(),
            folder_fragment: defaults::folder_fragment(),
            template_fragment_posegraph: defaults::template_fragment_posegraph(),
            template_fragment_posegraph_optimized: defaults::template_fragment_posegraph_optimized(),
            template_fragment_pointcloud: defaults::template_fragment_pointcloud(),
            template_fragment_mesh: defaults::template_fragment_mesh(),
            subfolder_slac: defaults::subfolder_slac(),
            template_optimized_posegraph_slac: defaults::template_optimized_posegraph_slac(),
            save_output_as: OutputKind::default(),
            block_count: defaults::block_count(),
        }
    }

    /// Loads and validates a JSON configuration file.
    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self, Error> {
        let buffer = std::io::BufReader::new(std::fs::File::open(filepath)?);
        let config: Self = serde_json::from_reader(buffer)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.n_frames_per_fragment == 0 {
            return Err(Error::invalid_parameter(
                "n_frames_per_fragment must be greater than zero",
            ));
        }
        if self.n_keyframes_per_n_frame == 0 {
            return Err(Error::invalid_parameter(
                "n_keyframes_per_n_frame must be greater than zero",
            ));
        }
        if self.depth_scale <= 0.0 {
            return Err(Error::invalid_parameter("depth_scale must be positive"));
        }
        if self.tsdf_cubic_size <= 0.0 {
            return Err(Error::invalid_parameter("tsdf_cubic_size must be positive"));
        }
        for template in [
            &self.template_fragment_posegraph,
            &self.template_fragment_posegraph_optimized,
            &self.template_fragment_pointcloud,
            &self.template_fragment_mesh,
        ] {
            format_template(template, 0)?;
        }
        Ok(())
    }

    /// Camera intrinsic from `path_intrinsic`, or the PrimeSense default.
    pub fn intrinsic(&self) -> Result<CameraIntrinsics, Error> {
        if self.path_intrinsic.is_empty() {
            Ok(CameraIntrinsics::primesense_default())
        } else {
            read_pinhole_camera_intrinsic(&self.path_intrinsic)
        }
    }

    pub fn fragment_folder(&self) -> PathBuf {
        self.path_dataset.join(&self.folder_fragment)
    }

    pub fn fragment_posegraph_path(&self, fragment_id: usize) -> Result<PathBuf, Error> {
        self.dataset_path_from_template(&self.template_fragment_posegraph, fragment_id)
    }

    pub fn fragment_posegraph_optimized_path(&self, fragment_id: usize) -> Result<PathBuf, Error> {
        self.dataset_path_from_template(&self.template_fragment_posegraph_optimized, fragment_id)
    }

    /// Where the fused fragment geometry goes, according to `save_output_as`.
    pub fn fragment_output_path(&self, fragment_id: usize) -> Result<PathBuf, Error> {
        let template = match self.save_output_as {
            OutputKind::PointCloud => &self.template_fragment_pointcloud,
            OutputKind::Mesh => &self.template_fragment_mesh,
        };
        self.dataset_path_from_template(template, fragment_id)
    }

    pub fn slac_folder(&self) -> PathBuf {
        self.path_dataset.join(&self.subfolder_slac)
    }

    pub fn slac_output_path(&self) -> PathBuf {
        self.slac_folder().join(match self.save_output_as {
            OutputKind::PointCloud => "output_slac_pointcloud.ply",
            OutputKind::Mesh => "output_slac_mesh.ply",
        })
    }

    /// Voxel edge length of the fusion volumes.
    pub fn tsdf_voxel_length(&self) -> f64 {
        self.tsdf_cubic_size / 512.0
    }

    /// Number of fragments needed to cover `n_frames`.
    pub fn fragment_count(&self, n_frames: usize) -> usize {
        n_frames.div_ceil(self.n_frames_per_fragment)
    }

    /// Worker pool size: `max(1, cores - 1)` capped at the fragment count,
    /// unless `max_workers` is set.
    pub fn worker_count(&self, n_fragments: usize) -> usize {
        let available = self.max_workers.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            cores.saturating_sub(1).max(1)
        });
        available.min(n_fragments).max(1)
    }

    fn dataset_path_from_template(&self, template: &str, index: usize) -> Result<PathBuf, Error> {
        Ok(self.path_dataset.join(format_template(template, index)?))
    }
}

/// Substitutes the printf-style integer placeholder (`%d`, `%03d`) of a path template.
pub fn format_template(template: &str, index: usize) -> Result<String, Error> {
    let start = template
        .find('%')
        .ok_or_else(|| Error::invalid_parameter(format!("Template without index: {template}")))?;
    let placeholder = &template[start + 1..];
    let end = placeholder
        .find('d')
        .ok_or_else(|| Error::invalid_parameter(format!("Invalid template: {template}")))?;
    let width = &placeholder[..end];
    if !width.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::invalid_parameter(format!(
            "Invalid template: {template}"
        )));
    }

    let number = if width.starts_with('0') {
        let width = width.parse::<usize>().unwrap_or(0);
        format!("{index:0width$}")
    } else if width.is_empty() {
        index.to_string()
    } else {
        let width = width.parse::<usize>().unwrap_or(0);
        format!("{index:width$}")
    };

    Ok(format!(
        "{}{}{}",
        &template[..start],
        number,
        &placeholder[end + 1..]
    ))
}
