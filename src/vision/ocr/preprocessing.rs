// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the PaddleOCR detection and recognition models

use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Square input size of the detection model
pub const OCR_INPUT_SIZE: u32 = 640;

/// Recognition model input height
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum width for recognition model input
pub const REC_MAX_WIDTH: u32 = 320;

/// Minimum width for recognition model input
pub const REC_MIN_WIDTH: u32 = 4;

/// ImageNet channel means
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

const PAD_GRAY: Rgb<u8> = Rgb([128, 128, 128]);

/// Convert an RGB buffer into a normalized NCHW tensor of shape [1, 3, H, W]
fn to_normalized_tensor(rgb: &RgbImage) -> Array4<f32> {
    let (width, height) = rgb.dimensions();
    let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    tensor
}

/// Preprocess a full image for text detection
///
/// The image is letterboxed into an `OCR_INPUT_SIZE` square (gray padding,
/// aspect ratio kept) and normalized into a [1, 3, 640, 640] tensor.
/// Use [`PreprocessInfo`] to map detections back onto the source image.
pub fn preprocess_for_detection(image: &DynamicImage) -> Array4<f32> {
    let letterboxed = resize_with_padding(image, OCR_INPUT_SIZE);
    to_normalized_tensor(&letterboxed.to_rgb8())
}

/// Preprocess a cropped text line for recognition
///
/// Height is fixed at `REC_INPUT_HEIGHT`; width follows the aspect ratio and
/// is clamped to `[REC_MIN_WIDTH, REC_MAX_WIDTH]`. No padding is added.
pub fn preprocess_for_recognition(image: &DynamicImage) -> Array4<f32> {
    let (orig_w, orig_h) = image.dimensions();

    let scale = REC_INPUT_HEIGHT as f32 / orig_h.max(1) as f32;
    let new_width = ((orig_w as f32 * scale).round() as u32).clamp(REC_MIN_WIDTH, REC_MAX_WIDTH);

    let resized = image.resize_exact(new_width, REC_INPUT_HEIGHT, FilterType::Lanczos3);
    to_normalized_tensor(&resized.to_rgb8())
}

/// Scale `image` to fit a `target_size` square and center it on gray padding
pub fn resize_with_padding(image: &DynamicImage, target_size: u32) -> DynamicImage {
    let info = PreprocessInfo::new(image, target_size);
    let mut output = RgbImage::from_pixel(target_size, target_size, PAD_GRAY);

    if info.original_width == 0 || info.original_height == 0 {
        return DynamicImage::ImageRgb8(output);
    }

    let (new_w, new_h) = info.scaled_size();
    let resized = image
        .resize_exact(new_w, new_h, FilterType::Lanczos3)
        .to_rgb8();

    image::imageops::replace(
        &mut output,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );

    DynamicImage::ImageRgb8(output)
}

/// Geometry of the letterbox transform applied by [`preprocess_for_detection`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessInfo {
    /// Scale factor applied to the source image
    pub scale: f32,
    /// Horizontal padding on the left
    pub offset_x: u32,
    /// Vertical padding on the top
    pub offset_y: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl PreprocessInfo {
    pub fn new(image: &DynamicImage, target_size: u32) -> Self {
        let (orig_w, orig_h) = image.dimensions();

        if orig_w == 0 || orig_h == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                original_width: orig_w,
                original_height: orig_h,
            };
        }

        let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
        let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Size of the source image after scaling, before padding
    pub fn scaled_size(&self) -> (u32, u32) {
        let w = ((self.original_width as f32 * self.scale).round() as u32).max(1);
        let h = ((self.original_height as f32 * self.scale).round() as u32).max(1);
        (w, h)
    }

    /// Map a point from detection-input space back to source image space,
    /// clamped to the source image bounds
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (
            orig_x.clamp(0.0, self.original_width as f32),
            orig_y.clamp(0.0, self.original_height as f32),
        )
    }
}
