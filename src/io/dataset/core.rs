use crate::{error::Error, image::RgbdImage};

/// Indexed, ordered sequence of RGBD frames.
pub trait RgbdDataset: Send + Sync {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    /// Loads the frame at `index`. Frames are read on demand and never cached.
    fn get(&self, index: usize) -> Result<RgbdImage, Error>;
}
