// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use fabstir_imaging_services::cli::{execute, Cli};
use fabstir_imaging_services::version;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before OcrConfig reads the environment
    dotenv::dotenv().ok();

    // Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    // Parse CLI arguments
    let cli = Cli::parse();
    info!("{}", version::get_version_string());

    match execute(cli).await {
        Ok(0) => Ok(()),
        Ok(_) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
