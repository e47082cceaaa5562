use image::{flat::SampleLayout, RgbImage};
use ndarray::{Array3, ShapeBuilder};

use crate::error::Error;

/// Trait to convert into ndarray::Array3, this is different than nshare version
/// because it uses the shape [height, width, channels] instead of [channels, height, width].
pub trait IntoArray3 {
    fn into_array3(self) -> Result<Array3<u8>, Error>;
}

impl IntoArray3 for RgbImage {
    fn into_array3(self) -> Result<Array3<u8>, Error> {
        let SampleLayout {
            channels,
            channel_stride,
            height,
            height_stride,
            width,
            width_stride,
        } = self.sample_layout();
        let shape = (height as usize, width as usize, channels as usize);
        let strides = (height_stride, width_stride, channel_stride);
        Array3::from_shape_vec(shape.strides(strides), self.into_raw())
            .map_err(|err| Error::Parser(err.to_string()))
    }
}

/// Trait to convert objects into image::RgbImage
pub trait IntoImageRgb8 {
    fn into_image_rgb8(self) -> Result<RgbImage, Error>;
}

impl IntoImageRgb8 for Array3<u8> {
    fn into_image_rgb8(self) -> Result<RgbImage, Error> {
        let (height, width, channels) = self.dim();
        if channels != 3 {
            return Err(Error::invalid_parameter("Array3 must have 3 channels"));
        }
        let raw = self.as_standard_layout().iter().copied().collect();
        RgbImage::from_raw(width as u32, height as u32, raw)
            .ok_or_else(|| Error::invalid_parameter("Array3 doesn't match the image size"))
    }
}
