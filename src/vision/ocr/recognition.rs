// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text recognition model
//!
//! Recognizes the text inside a single cropped line and decodes the model's
//! per-timestep class scores with greedy CTC against a character dictionary.

use anyhow::{anyhow, Context, Result};
use ndarray::{Array4, ArrayView2, ArrayViewD, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{REC_INPUT_HEIGHT, REC_MIN_WIDTH};

/// CTC blank token index
const BLANK_INDEX: usize = 0;

/// Recognized text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// Mean per-character confidence (0.0-1.0)
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(text: String, confidence: f32) -> Self {
        Self { text, confidence }
    }

    /// Check if the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// PaddleOCR text recognition model (CPU only)
#[derive(Clone)]
pub struct OcrRecognitionModel {
    session: Arc<Mutex<Session>>,
    /// Character dictionary; index 0 is the CTC blank
    dictionary: Arc<Vec<char>>,
    input_name: String,
}

impl std::fmt::Debug for OcrRecognitionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrRecognitionModel")
            .field("dictionary_size", &self.dictionary.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OcrRecognitionModel {
    /// Load the recognition model and its character dictionary
    ///
    /// # Errors
    /// Returns error if either file is missing or ONNX Runtime rejects the model.
    pub fn load<P: AsRef<Path>, D: AsRef<Path>>(
        model_path: P,
        dict_path: D,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let dict_path = dict_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR recognition model not found: {}", model_path.display());
        }
        if !dict_path.exists() {
            anyhow::bail!(
                "OCR character dictionary not found: {}",
                dict_path.display()
            );
        }

        info!(
            "Loading OCR recognition model from {}",
            model_path.display()
        );

        let dictionary = load_dictionary(dict_path)?;
        info!(
            "Loaded character dictionary with {} characters",
            dictionary.len()
        );

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
                    "Failed to load OCR recognition model from {}",
                    model_path.display()
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        debug!("Recognition model loaded - input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            dictionary: Arc::new(dictionary),
            input_name,
        })
    }

    pub fn dictionary_size(&self) -> usize {
        self.dictionary.len()
    }

    /// Recognize text from a tensor produced by `preprocess_for_recognition()`
    pub fn recognize(&self, input: &Array4<f32>) -> Result<RecognizedText> {
        let shape = input.shape();
        if shape[0] != 1
            || shape[1] != 3
            || shape[2] != REC_INPUT_HEIGHT as usize
            || shape[3] < REC_MIN_WIDTH as usize
        {
            anyhow::bail!(
                "Invalid input shape: {:?}, expected [1, 3, {}, W>={}]",
                shape,
                REC_INPUT_HEIGHT,
                REC_MIN_WIDTH
            );
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Recognition session lock poisoned"))?;

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Recognition inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let scores = timestep_scores(output_tensor.view())?;
        Ok(ctc_greedy_decode(scores, &self.dictionary))
    }
}

/// Load a PaddleOCR character dictionary, one character per line
///
/// Index 0 is reserved for the CTC blank; a trailing space class is appended
/// when the file does not already contain one.
pub fn load_dictionary<P: AsRef<Path>>(path: P) -> Result<Vec<char>> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open dictionary: {}", path.as_ref().display()))?;

    let mut dictionary = vec![' '];
    let mut has_space = false;

    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read dictionary line")?;
        if let Some(ch) = line.chars().next() {
            has_space |= ch == ' ';
            dictionary.push(ch);
        }
    }

    if !has_space {
        dictionary.push(' ');
    }

    Ok(dictionary)
}

/// View a [1, T, C] or [T, C] model output as a T x C score matrix
fn timestep_scores(output: ArrayViewD<'_, f32>) -> Result<ArrayView2<'_, f32>> {
    let output = match output.ndim() {
        3 if output.shape()[0] == 1 => output.index_axis_move(Axis(0), 0),
        2 => output,
        _ => anyhow::bail!("Unexpected recognition output shape: {:?}", output.shape()),
    };
    output
        .into_dimensionality::<Ix2>()
        .context("Recognition output is not two-dimensional")
}

/// Greedy CTC decoding: best class per timestep, repeats collapsed, blanks dropped
pub fn ctc_greedy_decode(scores: ArrayView2<'_, f32>, dictionary: &[char]) -> RecognizedText {
    let mut text = String::new();
    let mut total_confidence = 0.0f32;
    let mut kept = 0usize;
    let mut prev_index = BLANK_INDEX;

    for row in scores.rows() {
        let (max_index, max_prob) = row
            .iter()
            .copied()
            .enumerate()
            .fold((BLANK_INDEX, f32::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });

        if max_index != BLANK_INDEX && max_index != prev_index {
            if let Some(&ch) = dictionary.get(max_index) {
                text.push(ch);
                total_confidence += max_prob;
                kept += 1;
            }
        }
        prev_index = max_index;
    }

    // Scores are softmax probabilities, so the mean is already in [0, 1]
    let confidence = if kept == 0 {
        0.0
    } else {
        (total_confidence / kept as f32).clamp(0.0, 1.0)
    };

    RecognizedText::new(text.trim().to_string(), confidence)
}
