// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR integration for text extraction from images
//!
//! Components:
//! - `service` - Validated OCR entry point with failure classification
//! - `engine` - Process-wide recognition engine handle
//! - `model` - PaddleOCR detection + recognition pipeline
//! - `detection` - Text region detection
//! - `recognition` - Text recognition from detected regions
//! - `preprocessing` - Image preprocessing for models
//! - `result` - Raw and normalized result types
//! - `errors` - Error taxonomy

pub mod detection;
pub mod engine;
pub mod errors;
pub mod model;
pub mod preprocessing;
pub mod recognition;
pub mod result;
pub mod service;

pub use crate::config::OcrConfig;
pub use detection::{OcrDetectionModel, TextBox};
pub use engine::{is_initialized, shared_engine, Language, RecognitionEngine, SharedEngine};
pub use errors::{ErrorCode, ErrorResponse, OcrError};
pub use model::PaddleOcrModel;
pub use recognition::{OcrRecognitionModel, RecognizedText};
pub use result::{normalize, OcrRegion, TextDetection};
pub use service::OcrService;
