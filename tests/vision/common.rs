// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for vision integration tests
//!
//! Every test in this binary shares one process, and therefore one engine
//! handle. All services are built through [`stub_service`] so whichever test
//! runs first installs the same stub.

use anyhow::Result;
use fabstir_imaging_services::vision::ocr::{
    Language, OcrService, RecognitionEngine, SharedEngine, TextDetection,
};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub static FACTORY_CALLS: AtomicUsize = AtomicUsize::new(0);
pub static FACTORY_LANGUAGES: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

/// Reports one region covering the whole image, labelled "TEST"
pub struct StubEngine;

impl RecognitionEngine for StubEngine {
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<TextDetection>> {
        let (w, h) = image.dimensions();
        let (w, h) = (w as f32 - 0.5, h as f32 - 0.5);
        Ok(vec![TextDetection::new(
            [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]],
            "TEST",
            0.99,
        )])
    }
}

fn stub_factory(languages: &[Language]) -> Result<SharedEngine> {
    FACTORY_CALLS.fetch_add(1, Ordering::SeqCst);
    *FACTORY_LANGUAGES.lock().unwrap() = languages.iter().map(Language::code).collect();
    Ok(Arc::new(StubEngine))
}

pub fn stub_service() -> OcrService {
    OcrService::with_factory(stub_factory).expect("stub engine never fails")
}

/// Write a small PNG with a dark bar across it
pub fn write_test_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for x in width / 4..width * 3 / 4 {
        img.put_pixel(x, height / 2, Rgb([0, 0, 0]));
    }
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}
