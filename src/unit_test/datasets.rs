use std::path::Path;

use image::{ImageBuffer, Luma};
use ndarray::{Array2, Array3};
use rstest::fixture;

use crate::{
    error::Error,
    image::{IntoImageRgb8, RgbdImage},
    io::dataset::RgbdDataset,
};

pub const FRAME_WIDTH: usize = 8;
pub const FRAME_HEIGHT: usize = 6;

/// Raw depth of every pixel of frame `index`. Fakes use it to tell frames apart.
pub fn frame_depth(index: usize) -> u16 {
    1000 + index as u16
}

/// Frame index encoded by [`sample_frame`].
pub fn frame_index(rgbd: &RgbdImage) -> usize {
    (rgbd.depth[[0, 0]] - 1000) as usize
}

/// Uniform 8x6 frame: every color channel is `index`, every depth is `1000 + index`.
pub fn sample_frame(index: usize) -> RgbdImage {
    RgbdImage::new(
        Array3::from_elem((FRAME_HEIGHT, FRAME_WIDTH, 3), index as u8),
        Array2::from_elem((FRAME_HEIGHT, FRAME_WIDTH), frame_depth(index)),
        1000.0,
        3.0,
    )
}

/// Frames kept in memory.
pub struct MemoryDataset {
    frames: Vec<RgbdImage>,
}

impl MemoryDataset {
    pub fn new(n_frames: usize) -> Self {
        Self {
            frames: (0..n_frames).map(sample_frame).collect(),
        }
    }
}

impl RgbdDataset for MemoryDataset {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn get(&self, index: usize) -> Result<RgbdImage, Error> {
        self.frames
            .get(index)
            .cloned()
            .ok_or_else(|| Error::invalid_parameter(format!("No frame {index}")))
    }
}

/// Writes `n_color` color PNGs under `color/` and `n_depth` 16 bit depth PNGs
/// under `depth/`, encoded like [`sample_frame`].
pub fn write_frame_files(dir: &Path, n_color: usize, n_depth: usize) {
    let color_dir = dir.join("color");
    let depth_dir = dir.join("depth");
    std::fs::create_dir_all(&color_dir).unwrap();
    std::fs::create_dir_all(&depth_dir).unwrap();

    for i in 0..n_color {
        let color = sample_frame(i).color.into_image_rgb8().unwrap();
        color.save(color_dir.join(format!("{i:06}.png"))).unwrap();
    }

    for i in 0..n_depth {
        let depth: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(
            FRAME_WIDTH as u32,
            FRAME_HEIGHT as u32,
            Luma([frame_depth(i)]),
        );
        depth.save(depth_dir.join(format!("{i:06}.png"))).unwrap();
    }
}

/// Dataset directory with 10 paired frames.
#[fixture]
pub fn sample_dataset_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_frame_files(dir.path(), 10, 10);
    dir
}
