// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::vision::ocr::{ErrorResponse, OcrRegion, OcrService, TextDetection};

/// Fabstir Imaging OCR CLI
#[derive(Parser, Debug)]
#[command(name = "imaging-ocr")]
#[command(version)]
#[command(about = "Extract Japanese and English text from images", long_about = None)]
pub struct Cli {
    /// Image files to process
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Print raw detections (float coordinates and confidence)
    #[arg(long)]
    pub raw: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// PaddleOCR model directory (overrides OCR_MODEL_DIR)
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// ONNX Runtime threads per session (overrides OCR_INTRA_THREADS)
    #[arg(long)]
    pub threads: Option<usize>,
}

impl Cli {
    /// Environment configuration with command-line overrides applied
    pub fn ocr_config(&self) -> OcrConfig {
        self.apply_overrides(OcrConfig::from_env())
    }

    fn apply_overrides(&self, mut config: OcrConfig) -> OcrConfig {
        if let Some(dir) = self
            .model_dir
            .as_ref()
            .filter(|d| !d.as_os_str().to_string_lossy().trim().is_empty())
        {
            config.model_dir = dir.clone();
        }
        if let Some(threads) = self.threads.filter(|&t| t > 0) {
            config.intra_threads = threads;
        }
        config
    }
}

/// Outcome for one input path, printed as one JSON document
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FileReport {
    Regions {
        path: String,
        regions: Vec<OcrRegion>,
    },
    Raw {
        path: String,
        detections: Vec<TextDetection>,
    },
    Failed {
        path: String,
        error: ErrorResponse,
    },
}

impl FileReport {
    pub fn is_failure(&self) -> bool {
        matches!(self, FileReport::Failed { .. })
    }
}

/// Run every path through `service` on the blocking pool
///
/// Reports come back in input order.
pub async fn process_paths(
    service: &OcrService,
    paths: Vec<PathBuf>,
    raw: bool,
) -> Result<Vec<FileReport>> {
    let handles: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let service = service.clone();
            tokio::task::spawn_blocking(move || process_one(&service, path, raw))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        reports.push(handle.await.context("OCR worker task panicked")?);
    }
    Ok(reports)
}

fn process_one(service: &OcrService, path: PathBuf, raw: bool) -> FileReport {
    let display = path.display().to_string();
    match service.process(&path) {
        Ok(detections) if raw => FileReport::Raw {
            path: display,
            detections,
        },
        Ok(detections) => FileReport::Regions {
            path: display,
            regions: service.format_results(&detections),
        },
        Err(e) => FileReport::Failed {
            path: display,
            error: e.to_response(),
        },
    }
}

/// Execute CLI command, returning the number of paths that failed
pub async fn execute(cli: Cli) -> Result<usize> {
    let config = cli.ocr_config();

    // Load models up front so per-file work never pays the startup cost
    let service = tokio::task::spawn_blocking(move || OcrService::new(&config))
        .await
        .context("OCR engine initialization panicked")??;

    info!("Processing {} image(s)", cli.paths.len());
    let reports = process_paths(&service, cli.paths, cli.raw).await?;

    let mut failed = 0;
    for report in &reports {
        if report.is_failure() {
            failed += 1;
        }
        let line = if cli.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        println!("{}", line);
    }

    if failed > 0 {
        warn!("{} of {} image(s) failed", failed, reports.len());
    }
    Ok(failed)
}
