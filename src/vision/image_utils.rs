// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image loading for OCR
//!
//! Reads an image from disk and decodes it, keeping "the file is missing",
//! "the file is not an image" and "something else broke" apart so callers can
//! classify failures without matching on messages.

use image::{DynamicImage, ImageFormat};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading an image
#[derive(Debug, Error)]
pub enum ImageLoadError {
    /// The path does not exist; carries the original I/O error
    #[error(transparent)]
    NotFound(io::Error),

    #[error("Failed to read image file: {0}")]
    Io(#[source] io::Error),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image exceeds decoder limits: {0}")]
    Limits(String),

    #[error("Unexpected image error: {0}")]
    Other(String),
}

impl ImageLoadError {
    /// True when the data itself is not a usable image, as opposed to an
    /// environment or I/O failure
    pub fn is_undecodable(&self) -> bool {
        matches!(
            self,
            ImageLoadError::EmptyData
                | ImageLoadError::UnsupportedFormat
                | ImageLoadError::DecodeFailed(_)
        )
    }
}

impl From<image::ImageError> for ImageLoadError {
    fn from(err: image::ImageError) -> Self {
        use image::ImageError;

        match err {
            ImageError::Decoding(e) => ImageLoadError::DecodeFailed(e.to_string()),
            ImageError::Unsupported(_) => ImageLoadError::UnsupportedFormat,
            ImageError::Limits(e) => ImageLoadError::Limits(e.to_string()),
            // Truncated files surface as short reads from the decoder
            ImageError::IoError(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                ImageLoadError::DecodeFailed(e.to_string())
            }
            ImageError::IoError(e) => ImageLoadError::Io(e),
            other => ImageLoadError::Other(other.to_string()),
        }
    }
}

/// Image information extracted during loading
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub size_bytes: usize,
}

/// Read and decode the image at `path`
///
/// # Errors
/// * `ImageLoadError::NotFound` - the path does not exist
/// * `ImageLoadError::Io` - the file could not be read
/// * anything `decode_image_bytes` returns
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<(DynamicImage, ImageInfo), ImageLoadError> {
    let bytes = std::fs::read(path.as_ref()).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ImageLoadError::NotFound(e),
        _ => ImageLoadError::Io(e),
    })?;

    decode_image_bytes(&bytes)
}

/// Decode raw image bytes, detecting the format from magic bytes
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageLoadError> {
    if bytes.is_empty() {
        return Err(ImageLoadError::EmptyData);
    }

    let format = image::guess_format(bytes).map_err(|_| ImageLoadError::UnsupportedFormat)?;
    let img = image::load_from_memory_with_format(bytes, format)?;

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((img, info))
}
