// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Normalized result shape handed to web callers

use super::common::{stub_service, write_test_png};
use fabstir_imaging_services::vision::ocr::{OcrRegion, TextDetection};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_format_results_reference_example() {
    let raw = vec![TextDetection::new(
        [[10.0, 10.0], [50.0, 10.0], [50.0, 30.0], [10.0, 30.0]],
        "TEST",
        0.99,
    )];

    let formatted = stub_service().format_results(&raw);

    assert_eq!(
        serde_json::to_value(&formatted).unwrap(),
        json!([{"points": [[10, 10], [50, 10], [50, 30], [10, 30]], "text": "TEST"}])
    );
}

#[test]
fn test_process_then_format() {
    let dir = TempDir::new().unwrap();
    let path = write_test_png(dir.path(), "label.png", 64, 20);
    let service = stub_service();

    let raw = service.process(&path).unwrap();
    let formatted = service.format_results(&raw);

    assert_eq!(
        formatted,
        vec![OcrRegion {
            points: [[0, 0], [63, 0], [63, 19], [0, 19]],
            text: "TEST".to_string(),
        }]
    );
}

#[test]
fn test_formatted_regions_round_trip_as_json() {
    let raw = vec![
        TextDetection::new([[1.9, 2.1]; 4], "日本語", 0.7),
        TextDetection::new([[3.0, 4.0]; 4], "English", 0.8),
    ];
    let formatted = stub_service().format_results(&raw);

    let text = serde_json::to_string(&formatted).unwrap();
    assert!(!text.contains("confidence"));
    let parsed: Vec<OcrRegion> = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, formatted);
    assert_eq!(parsed[0].points[0], [1, 2]);
    assert_eq!(parsed[1].text, "English");
}
