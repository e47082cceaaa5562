use std::path::{Path, PathBuf};

use nshare::ToNdarray2;

use super::core::RgbdDataset;
use crate::{
    error::Error,
    image::{IntoArray3, RgbdImage},
};

const COLOR_FOLDERS: [&str; 3] = ["image", "rgb", "color"];
const DEPTH_FOLDER: &str = "depth";

fn list_files(folder: &Path, extension: &str) -> Result<Vec<PathBuf>, Error> {
    let pattern = folder.join(format!("*.{extension}"));
    let pattern = pattern
        .to_str()
        .ok_or_else(|| Error::invalid_parameter(format!("Non UTF-8 path: {folder:?}")))?;
    glob::glob(pattern)?
        .map(|entry| entry.map_err(|err| Error::Io(err.into())))
        .collect()
}

/// Lists the color and depth images of a dataset directory.
///
/// Colors come from the first existing folder among `image/`, `rgb/` and
/// `color/` (`.jpg` files first, then `.png`), depths from `depth/` (`.png`).
/// Each list is sorted by file name. The lists may differ in length, use
/// [`RgbdFileDataset::load`] to enforce that they pair up.
pub fn get_rgbd_file_lists<P>(path_dataset: P) -> Result<(Vec<PathBuf>, Vec<PathBuf>), Error>
where
    P: AsRef<Path>,
{
    let path_dataset = path_dataset.as_ref();
    let color_folder = COLOR_FOLDERS
        .iter()
        .map(|name| path_dataset.join(name))
        .find(|folder| folder.is_dir())
        .ok_or_else(|| {
            Error::invalid_parameter(format!(
                "No color folder (image/, rgb/ or color/) in {}",
                path_dataset.display()
            ))
        })?;

    let mut color_files = list_files(&color_folder, "jpg")?;
    color_files.extend(list_files(&color_folder, "png")?);
    let depth_files = list_files(&path_dataset.join(DEPTH_FOLDER), "png")?;

    Ok((color_files, depth_files))
}

/// RGBD sequence stored as paired color and depth image files.
#[derive(Clone, Debug)]
pub struct RgbdFileDataset {
    color_files: Vec<PathBuf>,
    depth_files: Vec<PathBuf>,
    depth_scale: f64,
    depth_trunc: f64,
}

impl RgbdFileDataset {
    /// Lists the dataset files.
    ///
    /// # Arguments
    ///
    /// * `path_dataset` - Dataset root directory.
    /// * `depth_scale` - Raw depth units per meter.
    /// * `depth_trunc` - Maximum depth in meters.
    ///
    /// # Errors
    ///
    /// `Error::FrameCountMismatch` if there are not as many color images as depth images.
    pub fn load<P>(path_dataset: P, depth_scale: f64, depth_trunc: f64) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let (color_files, depth_files) = get_rgbd_file_lists(path_dataset)?;
        Self::from_file_lists(color_files, depth_files, depth_scale, depth_trunc)
    }

    pub fn from_file_lists(
        color_files: Vec<PathBuf>,
        depth_files: Vec<PathBuf>,
        depth_scale: f64,
        depth_trunc: f64,
    ) -> Result<Self, Error> {
        if color_files.len() != depth_files.len() {
            return Err(Error::FrameCountMismatch {
                color: color_files.len(),
                depth: depth_files.len(),
            });
        }

        Ok(Self {
            color_files,
            depth_files,
            depth_scale,
            depth_trunc,
        })
    }

    pub fn color_files(&self) -> &[PathBuf] {
        &self.color_files
    }

    pub fn depth_files(&self) -> &[PathBuf] {
        &self.depth_files
    }
}

impl RgbdDataset for RgbdFileDataset {
    fn len(&self) -> usize {
        self.color_files.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<RgbdImage, Error> {
        let (color_file, depth_file) = self
            .color_files
            .get(index)
            .zip(self.depth_files.get(index))
            .ok_or_else(|| {
                Error::invalid_parameter(format!(
                    "Frame {index} is out of range, the dataset has {} frames",
                    self.len()
                ))
            })?;

        let color = image::open(color_file)?.into_rgb8().into_array3()?;
        let depth = image::open(depth_file)?.into_luma16().into_ndarray2();

        Ok(RgbdImage::new(color, depth, self.depth_scale, self.depth_trunc))
    }
}
