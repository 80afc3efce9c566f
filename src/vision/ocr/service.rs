// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR service: validated image-in, text-regions-out

use anyhow::Result;
use std::any::type_name;
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::engine::{shared_engine, Language, SharedEngine};
use super::errors::{ErrorCode, OcrError};
use super::model::PaddleOcrModel;
use super::result::{normalize, OcrRegion, TextDetection};
use crate::config::OcrConfig;
use crate::vision::image_utils::{load_image, ImageLoadError};

/// Recognizes text in image files using the process-wide engine
///
/// Cloning or constructing more services is cheap: every instance holds the
/// same engine handle.
#[derive(Clone)]
pub struct OcrService {
    engine: SharedEngine,
}

impl OcrService {
    /// Create a service backed by the shared PaddleOCR engine
    ///
    /// Loads the models from `config.model_dir` on first use in the process.
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        Self::with_factory(|languages| PaddleOcrModel::load_shared(config, languages))
    }

    /// Create a service whose shared engine is built by `factory` if it does
    /// not exist yet
    pub fn with_factory<F>(factory: F) -> Result<Self, OcrError>
    where
        F: FnOnce(&[Language]) -> Result<SharedEngine>,
    {
        let engine = shared_engine(factory).map_err(|e| {
            error!("Failed to initialize OCR engine: {:#}", e);
            OcrError::EngineUnavailable(e)
        })?;

        Ok(Self { engine })
    }

    /// Recognize text in the image at `image_path`
    ///
    /// Returns the engine's detections unmodified. A missing file comes back
    /// as [`OcrError::FileNotFound`]; decode and recognition failures are
    /// classified as `IMAGE_ERROR` or `SYSTEM_ERROR`.
    pub fn process<P>(&self, image_path: &P) -> Result<Vec<TextDetection>, OcrError>
    where
        P: AsRef<Path> + ?Sized,
    {
        let path = image_path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(OcrError::InvalidArgument {
                name: "image_path",
                actual: format!("empty `{}`", type_name::<P>()),
            });
        }

        info!("Processing image: {}", path.display());

        let (image, image_info) = match load_image(path) {
            Ok(loaded) => loaded,
            Err(ImageLoadError::NotFound(io_err)) => {
                warn!("Image file not found: {}", path.display());
                return Err(OcrError::FileNotFound(io_err));
            }
            Err(e) if e.is_undecodable() => {
                error!("Invalid image file {}: {}", path.display(), e);
                return Err(OcrError::processing(ErrorCode::ImageError, path, e));
            }
            Err(e) => {
                error!("Error reading image {}: {}", path.display(), e);
                return Err(OcrError::processing(ErrorCode::SystemError, path, e));
            }
        };

        debug!(
            "Decoded {}x{} {:?} image ({} bytes)",
            image_info.width, image_info.height, image_info.format, image_info.size_bytes
        );

        let results = self.engine.read_text(&image).map_err(|e| {
            error!("Error processing image {}: {:#}", path.display(), e);
            OcrError::processing(ErrorCode::SystemError, path, e)
        })?;

        info!("OCR completed: {} text regions", results.len());
        if let Some(first) = results.first() {
            info!(
                "First result: text={:?} confidence={:.3}",
                first.text, first.confidence
            );
        }

        Ok(results)
    }

    /// Convert raw detections into the serialization-ready shape
    pub fn format_results(&self, results: &[TextDetection]) -> Vec<OcrRegion> {
        normalize(results)
    }
}

impl std::fmt::Debug for OcrService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::ocr::engine::{
        engine_test_lock, reset_shared_engine, MockRecognitionEngine,
    };
    use image::{GenericImageView, RgbImage};
    use std::io;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, MutexGuard};
    use tempfile::TempDir;

    const SQUARE: [[f32; 2]; 4] = [[10.0, 10.0], [50.0, 10.0], [50.0, 30.0], [10.0, 30.0]];

    fn fresh_engine() -> MutexGuard<'static, ()> {
        let guard = engine_test_lock();
        reset_shared_engine();
        guard
    }

    fn service_with(engine: MockRecognitionEngine) -> OcrService {
        OcrService::with_factory(move |_| Ok(Arc::new(engine) as SharedEngine)).unwrap()
    }

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.path().join(name);
        RgbImage::new(width, height).save(&path).unwrap();
        path
    }

    #[test]
    fn test_services_share_one_engine() {
        let _guard = fresh_engine();

        let calls = Arc::new(AtomicUsize::new(0));
        let mut languages = Vec::new();
        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            OcrService::with_factory(|langs| {
                calls.fetch_add(1, Ordering::SeqCst);
                languages = langs.iter().map(Language::code).collect();
                Ok(Arc::new(MockRecognitionEngine::new()) as SharedEngine)
            })
            .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(languages, ["ja", "en"]);
    }

    #[test]
    fn test_engine_construction_failure() {
        let _guard = fresh_engine();

        let err = OcrService::with_factory(|_| Err(anyhow::anyhow!("det_model.onnx missing")))
            .unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable(_)));
        assert_eq!(err.code(), Some(ErrorCode::SystemError));
    }

    #[test]
    fn test_empty_path_is_rejected_before_io() {
        let _guard = fresh_engine();
        // No expectations: the engine must not be called
        let service = service_with(MockRecognitionEngine::new());

        let err = service.process("").unwrap_err();
        match &err {
            OcrError::InvalidArgument { name, actual } => {
                assert_eq!(*name, "image_path");
                assert!(actual.contains("str"));
            }
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
        assert!(err.to_string().contains("image_path"));
        assert_eq!(err.code(), None);

        let err = service.process(&PathBuf::new()).unwrap_err();
        assert!(err.to_string().contains("PathBuf"));
    }

    #[test]
    fn test_missing_file_passes_through() {
        let _guard = fresh_engine();
        let service = service_with(MockRecognitionEngine::new());

        let err = service.process("nonexistent.jpg").unwrap_err();
        match err {
            OcrError::FileNotFound(io_err) => assert_eq!(io_err.kind(), io::ErrorKind::NotFound),
            other => panic!("expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_undecodable_file_is_image_error() {
        let _guard = fresh_engine();
        let service = service_with(MockRecognitionEngine::new());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupted.jpg");
        std::fs::write(&path, b"this is not an image").unwrap();

        let err = service.process(&path).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ImageError));
        assert_eq!(err.status_code(), 422);
        assert!(err.to_string().contains("corrupted.jpg"));
    }

    #[test]
    fn test_empty_file_is_image_error() {
        let _guard = fresh_engine();
        let service = service_with(MockRecognitionEngine::new());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();

        let err = service.process(&path).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ImageError));
    }

    #[test]
    fn test_engine_failure_is_system_error() {
        let _guard = fresh_engine();
        let mut engine = MockRecognitionEngine::new();
        engine
            .expect_read_text()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("inference session crashed")));
        let service = service_with(engine);

        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "ok.png", 32, 16);

        let err = service.process(&path).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::SystemError));
        assert_eq!(err.status_code(), 500);
        let response = err.to_response();
        assert!(response.message.starts_with("Failed to process image: "));
        assert_eq!(
            response.details.unwrap()["cause"],
            "inference session crashed"
        );
    }

    #[test]
    fn test_engine_output_returned_unmodified() {
        let _guard = fresh_engine();
        let mut engine = MockRecognitionEngine::new();
        engine
            .expect_read_text()
            .withf(|image| image.dimensions() == (64, 24))
            .times(1)
            .returning(|_| {
                Ok(vec![
                    TextDetection::new(SQUARE, "TEST", 0.99),
                    TextDetection::new([[0.5, 0.5]; 4], "テスト", 0.42),
                ])
            });
        let service = service_with(engine);

        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "text.png", 64, 24);

        let results = service.process(&path).unwrap();
        assert_eq!(
            results,
            vec![
                TextDetection::new(SQUARE, "TEST", 0.99),
                TextDetection::new([[0.5, 0.5]; 4], "テスト", 0.42),
            ]
        );
    }

    #[test]
    fn test_no_text_found() {
        let _guard = fresh_engine();
        let mut engine = MockRecognitionEngine::new();
        engine.expect_read_text().returning(|_| Ok(Vec::new()));
        let service = service_with(engine);

        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "blank.png", 10, 10);

        assert!(service.process(&path).unwrap().is_empty());
    }

    #[test]
    fn test_format_results() {
        let _guard = fresh_engine();
        let service = service_with(MockRecognitionEngine::new());

        let regions = service.format_results(&[TextDetection::new(SQUARE, "TEST", 0.99)]);
        assert_eq!(
            serde_json::to_value(&regions).unwrap(),
            serde_json::json!([{
                "points": [[10, 10], [50, 10], [50, 30], [10, 30]],
                "text": "TEST"
            }])
        );
    }
}
