// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based image analysis
//!
//! This module provides OCR (Optical Character Recognition) via PaddleOCR
//! ONNX models, plus the image loading it relies on.

pub mod image_utils;
pub mod ocr;

pub use image_utils::{decode_image_bytes, load_image, ImageInfo, ImageLoadError};
pub use ocr::{OcrError, OcrRegion, OcrService, TextDetection};
