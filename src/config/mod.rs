// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the OCR engine

use std::env;
use std::path::PathBuf;

/// Default PaddleOCR model directory
pub const DEFAULT_MODEL_DIR: &str = "./models/paddleocr-onnx";

/// Default ONNX Runtime intra-op thread count
pub const DEFAULT_INTRA_THREADS: usize = 4;

/// Default text-pixel probability threshold for detection
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.3;

/// Configuration for loading the OCR engine
#[derive(Debug, Clone, PartialEq)]
pub struct OcrConfig {
    /// Directory holding the detection/recognition models and dictionaries
    pub model_dir: PathBuf,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
    /// Detection probability threshold (0.0-1.0)
    pub detection_threshold: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            intra_threads: DEFAULT_INTRA_THREADS,
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
        }
    }
}

impl OcrConfig {
    /// Load configuration from environment variables
    ///
    /// - `OCR_MODEL_DIR`
    /// - `OCR_INTRA_THREADS`
    /// - `OCR_DETECTION_THRESHOLD`
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            model_dir: lookup("OCR_MODEL_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            intra_threads: lookup("OCR_INTRA_THREADS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.intra_threads),
            detection_threshold: lookup("OCR_DETECTION_THRESHOLD")
                .and_then(|v| v.trim().parse::<f32>().ok())
                .filter(|t| t.is_finite())
                .map(|t| t.clamp(0.0, 1.0))
                .unwrap_or(defaults.detection_threshold),
        }
    }
}
