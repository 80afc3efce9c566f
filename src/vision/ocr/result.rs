// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Raw and normalized OCR result types

use serde::{Deserialize, Serialize};

/// One text region as produced by the recognition engine
///
/// The polygon is in source-image pixel space using the engine's float
/// coordinates, clockwise from the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextDetection {
    pub polygon: [[f32; 2]; 4],
    pub text: String,
    /// Recognition confidence (0.0-1.0)
    pub confidence: f32,
}

impl TextDetection {
    pub fn new(polygon: [[f32; 2]; 4], text: impl Into<String>, confidence: f32) -> Self {
        Self {
            polygon,
            text: text.into(),
            confidence,
        }
    }
}

/// Serialization-ready text region handed to the web layer
///
/// Serializes as `{"points": [[x, y], ...], "text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrRegion {
    pub points: [[i32; 2]; 4],
    pub text: String,
}

impl From<&TextDetection> for OcrRegion {
    fn from(detection: &TextDetection) -> Self {
        // `as` truncates toward zero and saturates; NaN becomes 0
        let points = detection.polygon.map(|[x, y]| [x as i32, y as i32]);
        Self {
            points,
            text: detection.text.clone(),
        }
    }
}

/// Normalize raw detections: integer points, confidence dropped, order kept
pub fn normalize(results: &[TextDetection]) -> Vec<OcrRegion> {
    results.iter().map(OcrRegion::from).collect()
}
