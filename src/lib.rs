// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod version;
pub mod vision;

pub use config::OcrConfig;
pub use vision::ocr::{
    ErrorCode, ErrorResponse, OcrError, OcrRegion, OcrService, TextDetection,
};
