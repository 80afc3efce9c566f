// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! OCR service tests: shared engine, validation and failure classification

use super::common::{stub_service, write_test_png, FACTORY_CALLS, FACTORY_LANGUAGES};
use fabstir_imaging_services::vision::ocr::{is_initialized, ErrorCode, OcrError};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_engine_constructed_once_across_services() {
    let services: Vec<_> = (0..5).map(|_| stub_service()).collect();

    assert_eq!(services.len(), 5);
    assert!(is_initialized());
    assert_eq!(FACTORY_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(*FACTORY_LANGUAGES.lock().unwrap(), ["ja", "en"]);
}

#[test]
fn test_concurrent_services_share_engine() {
    let handles: Vec<_> = (0..8).map(|_| thread::spawn(stub_service)).collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(FACTORY_CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_process_valid_image() {
    let dir = TempDir::new().unwrap();
    let path = write_test_png(dir.path(), "sign.png", 120, 40);

    let results = stub_service().process(&path).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "TEST");
    assert_eq!(results[0].polygon[2], [119.5, 39.5]);
    assert!((results[0].confidence - 0.99).abs() < 1e-6);
}

#[test]
fn test_process_accepts_str_and_pathbuf() {
    let dir = TempDir::new().unwrap();
    let path = write_test_png(dir.path(), "a.png", 16, 16);
    let service = stub_service();

    let as_str = service.process(path.to_str().unwrap()).unwrap();
    let as_buf = service.process(&path).unwrap();
    assert_eq!(as_str, as_buf);
}

#[test]
fn test_empty_path_is_invalid_argument() {
    let err = stub_service().process("").unwrap_err();

    assert!(matches!(err, OcrError::InvalidArgument { name: "image_path", .. }));
    assert!(err.to_string().starts_with("Invalid argument 'image_path'"));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_missing_file_is_not_classified() {
    let err = stub_service().process("nonexistent.jpg").unwrap_err();

    assert_eq!(err.code(), None);
    assert_eq!(err.status_code(), 404);
    match err {
        OcrError::FileNotFound(io_err) => assert_eq!(io_err.kind(), io::ErrorKind::NotFound),
        other => panic!("expected FileNotFound, got {:?}", other),
    }
}

#[test]
fn test_corrupt_file_is_image_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupted.jpg");
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A]).unwrap();

    let err = stub_service().process(&path).unwrap_err();

    assert_eq!(err.code(), Some(ErrorCode::ImageError));
    let response = err.to_response();
    assert_eq!(response.code, Some(ErrorCode::ImageError));
    assert!(response.message.contains("corrupted.jpg"));
}

#[test]
fn test_text_file_is_image_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.png");
    std::fs::write(&path, "not really a png").unwrap();

    let err = stub_service().process(&path).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ImageError));
}

#[test]
fn test_directory_is_system_error() {
    let dir = TempDir::new().unwrap();
    let path: PathBuf = dir.path().to_path_buf();

    let err = stub_service().process(&path).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::SystemError));
    assert_eq!(err.status_code(), 500);
}
