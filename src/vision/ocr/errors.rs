// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR service error types
//!
//! Only failures inside the service are classified with an [`ErrorCode`].
//! Caller mistakes (bad argument, missing file) come back unclassified so
//! callers can tell "your input was wrong" from "our processing broke".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Machine-readable classification of a processing failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The file exists but is not a decodable image
    ImageError,
    /// Any other unexpected failure during decode or recognition
    SystemError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ImageError => "IMAGE_ERROR",
            ErrorCode::SystemError => "SYSTEM_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum OcrError {
    /// Precondition failure, raised before any I/O
    #[error("Invalid argument '{name}': expected a non-empty path, got {actual}")]
    InvalidArgument { name: &'static str, actual: String },

    /// The image file does not exist; the I/O error is passed through as-is
    #[error(transparent)]
    FileNotFound(io::Error),

    /// Classified failure while decoding or recognizing
    #[error("Failed to process image: {}", path.display())]
    Processing {
        code: ErrorCode,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The shared recognition engine could not be constructed
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(#[source] anyhow::Error),
}

impl OcrError {
    pub(crate) fn processing(
        code: ErrorCode,
        path: impl Into<PathBuf>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        OcrError::Processing {
            code,
            path: path.into(),
            source: source.into(),
        }
    }

    /// Classification code, for the failures that carry one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            OcrError::Processing { code, .. } => Some(*code),
            OcrError::EngineUnavailable(_) => Some(ErrorCode::SystemError),
            OcrError::InvalidArgument { .. } | OcrError::FileNotFound(_) => None,
        }
    }

    /// HTTP status a web caller should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            OcrError::InvalidArgument { .. } => 400,
            OcrError::FileNotFound(_) => 404,
            OcrError::Processing {
                code: ErrorCode::ImageError,
                ..
            } => 422,
            OcrError::Processing {
                code: ErrorCode::SystemError,
                ..
            } => 500,
            OcrError::EngineUnavailable(_) => 503,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            OcrError::InvalidArgument { .. } => "invalid_argument",
            OcrError::FileNotFound(_) => "file_not_found",
            OcrError::Processing { .. } => "processing_error",
            OcrError::EngineUnavailable(_) => "service_unavailable",
        }
    }

    /// Build a serializable error body
    pub fn to_response(&self) -> ErrorResponse {
        let details = match self {
            OcrError::InvalidArgument { name, actual } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(name.to_string()),
                );
                details.insert(
                    "actual".to_string(),
                    serde_json::Value::String(actual.clone()),
                );
                Some(details)
            }
            OcrError::Processing { source, .. } | OcrError::EngineUnavailable(source) => {
                let mut details = HashMap::new();
                details.insert(
                    "cause".to_string(),
                    serde_json::Value::String(format!("{:#}", source)),
                );
                Some(details)
            }
            OcrError::FileNotFound(_) => None,
        };

        ErrorResponse {
            error_type: self.error_type().to_string(),
            message: self.to_string(),
            code: self.code(),
            details,
        }
    }
}

/// Error body for callers that report failures as JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}
