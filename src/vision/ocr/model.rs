// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR pipeline: detection, per-region crop, recognition

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::detection::{OcrDetectionModel, TextBox};
use super::engine::{Language, RecognitionEngine, SharedEngine};
use super::preprocessing::{
    preprocess_for_detection, preprocess_for_recognition, PreprocessInfo, OCR_INPUT_SIZE,
};
use super::recognition::OcrRecognitionModel;
use super::result::TextDetection;
use crate::config::OcrConfig;

/// Detection model file name inside the model directory
pub const DETECTION_MODEL_FILE: &str = "det_model.onnx";

/// Recognition model file name inside the model directory
pub const RECOGNITION_MODEL_FILE: &str = "rec_model.onnx";

/// PaddleOCR model for text extraction (CPU only)
///
/// Expected files in the model directory:
/// - `det_model.onnx` (text detection)
/// - `rec_model.onnx` (text recognition for the primary language)
/// - the primary language's character dictionary, e.g. `japan_dict.txt`
#[derive(Debug, Clone)]
pub struct PaddleOcrModel {
    detector: OcrDetectionModel,
    recognizer: OcrRecognitionModel,
}

impl PaddleOcrModel {
    /// Load the detection and recognition models for `languages`
    ///
    /// The first language is the primary one and selects the dictionary;
    /// the Japanese dictionary also covers Latin script.
    pub fn load(config: &OcrConfig, languages: &[Language]) -> Result<Self> {
        let primary = languages
            .first()
            .context("At least one OCR language is required")?;
        let model_dir = &config.model_dir;

        info!(
            "Loading PaddleOCR models from {} (primary language: {})",
            model_dir.display(),
            primary.code()
        );

        let detector =
            OcrDetectionModel::load(model_dir.join(DETECTION_MODEL_FILE), config.intra_threads)?
                .with_confidence_threshold(config.detection_threshold);

        let recognizer = OcrRecognitionModel::load(
            model_dir.join(RECOGNITION_MODEL_FILE),
            model_dir.join(primary.dictionary_file()),
            config.intra_threads,
        )?;

        info!("✅ PaddleOCR model loaded from {}", model_dir.display());

        Ok(Self {
            detector,
            recognizer,
        })
    }

    /// Load as the shared engine handle type
    pub fn load_shared(config: &OcrConfig, languages: &[Language]) -> Result<SharedEngine> {
        Ok(Arc::new(Self::load(config, languages)?))
    }
}

impl RecognitionEngine for PaddleOcrModel {
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<TextDetection>> {
        let start = Instant::now();

        let info = PreprocessInfo::new(image, OCR_INPUT_SIZE);
        let boxes = self
            .detector
            .detect(&preprocess_for_detection(image))
            .context("Text detection failed")?;

        let mut detections = Vec::with_capacity(boxes.len());
        for text_box in boxes {
            let polygon = to_source_polygon(&text_box, &info);
            let Some(crop) = crop_polygon(image, &polygon) else {
                continue;
            };

            let recognized = self
                .recognizer
                .recognize(&preprocess_for_recognition(&crop))
                .context("Text recognition failed")?;

            if recognized.is_empty() {
                continue;
            }

            detections.push(TextDetection::new(
                polygon,
                recognized.text,
                recognized.confidence,
            ));
        }

        debug!(
            "PaddleOCR found {} text regions in {}ms",
            detections.len(),
            start.elapsed().as_millis()
        );

        Ok(detections)
    }
}

/// Map a detection-space box onto the source image, clamped to its bounds
fn to_source_polygon(text_box: &TextBox, info: &PreprocessInfo) -> [[f32; 2]; 4] {
    text_box.corners().map(|[x, y]| {
        let (ox, oy) = info.map_to_original(x, y);
        [ox, oy]
    })
}

/// Crop the axis-aligned extent of `polygon`; `None` when it is empty
fn crop_polygon(image: &DynamicImage, polygon: &[[f32; 2]; 4]) -> Option<DynamicImage> {
    let (width, height) = image.dimensions();

    let min_x = polygon.iter().map(|p| p[0]).fold(f32::INFINITY, f32::min);
    let max_x = polygon.iter().map(|p| p[0]).fold(f32::NEG_INFINITY, f32::max);
    let min_y = polygon.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min);
    let max_y = polygon.iter().map(|p| p[1]).fold(f32::NEG_INFINITY, f32::max);

    let x0 = (min_x.floor().max(0.0) as u32).min(width);
    let y0 = (min_y.floor().max(0.0) as u32).min(height);
    let x1 = (max_x.ceil().max(0.0) as u32).min(width);
    let y1 = (max_y.ceil().max(0.0) as u32).min(height);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(image.crop_imm(x0, y0, x1 - x0, y1 - y0))
}
