mod rgb;
pub use rgb::{IntoArray3, IntoImageRgb8};

mod rgbd_image;
pub use rgbd_image::RgbdImage;
