use ndarray::{Array2, Array3};

/// Color and depth images of one frame, with how to read the depth in meters.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbdImage {
    /// Color with shape (height, width, 3).
    pub color: Array3<u8>,
    /// Raw depth with shape (height, width).
    pub depth: Array2<u16>,
    /// Raw depth units per meter, e.g. 1000 for millimeters.
    pub depth_scale: f64,
    /// Depths beyond this distance (in meters) are treated as missing.
    pub depth_trunc: f64,
}

impl RgbdImage {
    pub fn new(color: Array3<u8>, depth: Array2<u16>, depth_scale: f64, depth_trunc: f64) -> Self {
        Self {
            color,
            depth,
            depth_scale,
            depth_trunc,
        }
    }

    pub fn width(&self) -> usize {
        self.color.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.color.shape()[0]
    }
}
