//! Image preprocessing for classification models

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

use crate::error::AnalyzeError;

/// ImageNet channel means (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Preprocess an image for a classifier with a square input of `size` pixels.
///
/// The center square is cropped and resized to `size`, then the pixels are
/// scaled to [0, 1] and normalized with ImageNet statistics into a 1x3xHxW
/// tensor in RGB order.
pub fn preprocess_for_classification(image: &DynamicImage, size: u32) -> Array4<f32> {
    let cropped = resize_and_center_crop(image, size);
    image_to_nchw(&cropped)
}

/// Crop the centered square of the shorter side, then resize it to `size`x`size`.
///
/// Cropping in source coordinates keeps the work bounded by the source and
/// target sizes, whatever the aspect ratio.
pub fn resize_and_center_crop(image: &DynamicImage, size: u32) -> DynamicImage {
    let (orig_w, orig_h) = image.dimensions();
    let side = orig_w.min(orig_h);

    let square = if orig_w == orig_h {
        image.clone()
    } else {
        image.crop_imm((orig_w - side) / 2, (orig_h - side) / 2, side, side)
    };

    if side == size {
        return square;
    }
    square.resize_exact(size, size, FilterType::Triangle)
}

/// Convert image to a normalized NCHW tensor
fn image_to_nchw(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    tensor
}

/// Decode image from bytes with EXIF orientation handling
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, AnalyzeError> {
    let image = image::load_from_memory(data).map_err(|e| AnalyzeError::Decode(e.to_string()))?;
    Ok(apply_exif_orientation(data, image))
}

/// Apply the EXIF orientation tag, if any.
/// Phones often store a rotation tag instead of rotating the pixels.
fn apply_exif_orientation(data: &[u8], image: DynamicImage) -> DynamicImage {
    use std::io::Cursor;

    let orientation = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif_data) => exif_data
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    };

    // https://exiftool.org/TagNames/EXIF.html (Orientation)
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}
