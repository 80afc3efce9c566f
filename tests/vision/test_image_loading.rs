// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Image loading from disk

use super::common::write_test_png;
use fabstir_imaging_services::vision::{decode_image_bytes, load_image, ImageLoadError};
use image::ImageFormat;
use tempfile::TempDir;

#[test]
fn test_load_png_reports_info() {
    let dir = TempDir::new().unwrap();
    let path = write_test_png(dir.path(), "info.png", 30, 12);

    let (image, info) = load_image(&path).unwrap();

    assert_eq!((image.width(), image.height()), (30, 12));
    assert_eq!((info.width, info.height), (30, 12));
    assert_eq!(info.format, ImageFormat::Png);
    assert_eq!(info.size_bytes, std::fs::metadata(&path).unwrap().len() as usize);
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = load_image(dir.path().join("absent.png")).unwrap_err();
    assert!(matches!(err, ImageLoadError::NotFound(_)));
    assert!(!err.is_undecodable());
}

#[test]
fn test_decode_garbage_is_undecodable() {
    let err = decode_image_bytes(b"definitely not pixels").unwrap_err();
    assert!(err.is_undecodable());

    let err = decode_image_bytes(&[]).unwrap_err();
    assert!(matches!(err, ImageLoadError::EmptyData));
}
