use std::path;

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

use crate::error::CaptionError;

/// Maps a raw channel value from [0, 255] onto [-1, 1].
pub fn rescale(value: f32) -> f32 {
    value / 127.5 - 1.0
}

/// Decodes an uploaded image and prepares it for the feature extractor.
pub fn prepare_bytes(buffer: &[u8], size: usize) -> Result<Array4<f32>, CaptionError> {
    let img = image::load_from_memory(buffer)?;
    Ok(prepare_image(&img, size))
}

pub fn prepare_path<P>(path: P, size: usize) -> Result<Array4<f32>, CaptionError>
where
    P: AsRef<path::Path>,
{
    let img = image::open(path)?;
    Ok(prepare_image(&img, size))
}

/// Resizes to `size`x`size` without keeping the aspect ratio, keeps the first
/// three channels and rescales them. The result has shape (1, size, size, 3).
pub fn prepare_image(img: &DynamicImage, size: usize) -> Array4<f32> {
    let img = img.resize_exact(size as u32, size as u32, FilterType::CatmullRom);
    // alpha is dropped, not composited
    let rgb = img.to_rgb8();
    Array4::from_shape_fn((1, size, size, 3), |(_, y, x, c)| {
        rescale(rgb.get_pixel(x as u32, y as u32)[c] as f32)
    })
}
