// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text detection model
//!
//! Runs the DB detection network over a letterboxed image and turns its
//! per-pixel text probability map into axis-aligned text boxes.

use anyhow::{anyhow, Context, Result};
use ndarray::{Array2, Array4, ArrayViewD, Axis};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Regions with fewer probability-map pixels than this are treated as noise
const MIN_REGION_PIXELS: usize = 10;

/// Default box expansion ratio (DB "unclip")
pub const DEFAULT_UNCLIP_RATIO: f32 = 1.5;

/// A detected text box in detection-input coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    /// X coordinate of the top-left corner
    pub x: f32,
    /// Y coordinate of the top-left corner
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Mean text probability over the region (0.0-1.0)
    pub confidence: f32,
}

impl TextBox {
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.confidence > 0.0
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Corner points clockwise from the top-left: TL, TR, BR, BL
    pub fn corners(&self) -> [[f32; 2]; 4] {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (self.x + self.width, self.y + self.height);
        [[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
    }

    /// Grow the box on every side by `area * ratio / perimeter`
    ///
    /// The DB probability map marks a shrunken text kernel, so boxes are
    /// expanded back out before cropping.
    pub fn unclip(&self, ratio: f32) -> TextBox {
        let perimeter = 2.0 * (self.width + self.height);
        if perimeter <= 0.0 {
            return self.clone();
        }
        let delta = self.area() * ratio / perimeter;
        TextBox {
            x: self.x - delta,
            y: self.y - delta,
            width: self.width + 2.0 * delta,
            height: self.height + 2.0 * delta,
            confidence: self.confidence,
        }
    }
}

/// PaddleOCR text detection model (CPU only)
#[derive(Clone)]
pub struct OcrDetectionModel {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
    confidence_threshold: f32,
    unclip_ratio: f32,
}

impl std::fmt::Debug for OcrDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrDetectionModel")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("unclip_ratio", &self.unclip_ratio)
            .finish_non_exhaustive()
    }
}

impl OcrDetectionModel {
    /// Load the detection model (`det_model.onnx`)
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime rejects it.
    pub fn load<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR detection model not found: {}", model_path.display());
        }

        info!("Loading OCR detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!(
                    "Failed to load OCR detection model from {}",
                    model_path.display()
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .unwrap_or_else(|| "sigmoid_0.tmp_0".to_string());

        debug!(
            "Detection model loaded - input: {}, output: {}",
            input_name, output_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            confidence_threshold: 0.3,
            unclip_ratio: DEFAULT_UNCLIP_RATIO,
        })
    }

    /// Set the probability threshold for text pixels
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Run text detection on a tensor from `preprocess_for_detection()`
    ///
    /// Boxes come back in detection-input coordinates, sorted top to bottom
    /// then left to right.
    pub fn detect(&self, input: &Array4<f32>) -> Result<Vec<TextBox>> {
        let shape = input.shape();
        if shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }
        let (input_height, input_width) = (shape[2], shape[3]);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Detection session lock poisoned"))?;

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let prob_map = probability_map(output_tensor.view())?;
        let boxes = extract_boxes(
            &prob_map,
            self.confidence_threshold,
            input_height,
            input_width,
        )
        .into_iter()
        .map(|b| b.unclip(self.unclip_ratio))
        .collect::<Vec<_>>();

        debug!("Detected {} text regions", boxes.len());

        Ok(boxes)
    }
}

/// Squeeze a [1, 1, H, W] or [1, H, W] model output into an H x W map
fn probability_map(output: ArrayViewD<f32>) -> Result<Array2<f32>> {
    let mut view = output;
    while view.ndim() > 2 {
        if view.shape()[0] != 1 {
            anyhow::bail!("Unexpected detection output shape: {:?}", view.shape());
        }
        view = view.index_axis_move(Axis(0), 0);
    }
    view.into_dimensionality::<ndarray::Ix2>()
        .map(|v| v.to_owned())
        .context("Detection output is not two-dimensional")
}

/// Threshold the probability map and collect 4-connected regions as boxes
/// scaled into `input_height` x `input_width` space
fn extract_boxes(
    prob_map: &Array2<f32>,
    threshold: f32,
    input_height: usize,
    input_width: usize,
) -> Vec<TextBox> {
    let (prob_height, prob_width) = prob_map.dim();
    if prob_height == 0 || prob_width == 0 {
        return Vec::new();
    }

    let scale_y = input_height as f32 / prob_height as f32;
    let scale_x = input_width as f32 / prob_width as f32;

    let mut visited = Array2::from_elem((prob_height, prob_width), false);
    let mut boxes = Vec::new();

    for y in 0..prob_height {
        for x in 0..prob_width {
            if visited[[y, x]] || prob_map[[y, x]] < threshold {
                continue;
            }

            let region = flood_fill(prob_map, &mut visited, x, y, threshold);
            if region.count < MIN_REGION_PIXELS {
                continue;
            }

            let text_box = TextBox {
                x: region.min_x as f32 * scale_x,
                y: region.min_y as f32 * scale_y,
                width: (region.max_x - region.min_x + 1) as f32 * scale_x,
                height: (region.max_y - region.min_y + 1) as f32 * scale_y,
                confidence: region.sum / region.count as f32,
            };
            // A zero threshold floods empty background into one box
            if text_box.is_valid() {
                boxes.push(text_box);
            }
        }
    }

    boxes.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
    boxes
}

struct Region {
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
    count: usize,
    sum: f32,
}

fn flood_fill(
    prob_map: &Array2<f32>,
    visited: &mut Array2<bool>,
    start_x: usize,
    start_y: usize,
    threshold: f32,
) -> Region {
    let (height, width) = prob_map.dim();
    let mut region = Region {
        min_x: start_x,
        max_x: start_x,
        min_y: start_y,
        max_y: start_y,
        count: 0,
        sum: 0.0,
    };
    let mut stack = vec![(start_x, start_y)];

    while let Some((x, y)) = stack.pop() {
        if visited[[y, x]] {
            continue;
        }
        let prob = prob_map[[y, x]];
        if prob < threshold {
            continue;
        }

        visited[[y, x]] = true;
        region.count += 1;
        region.sum += prob;
        region.min_x = region.min_x.min(x);
        region.max_x = region.max_x.max(x);
        region.min_y = region.min_y.min(y);
        region.max_y = region.max_y.max(y);

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    region
}
