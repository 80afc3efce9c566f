// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide OCR engine handle
//!
//! Loading recognition models is expensive, so the process holds exactly one
//! engine. The first caller constructs it under a mutex; every later caller,
//! from any thread or service instance, gets a clone of the same `Arc`.

use anyhow::Result;
use image::DynamicImage;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

use super::result::TextDetection;

/// Languages the recognition engine can be configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Japanese,
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Japanese => "ja",
            Language::English => "en",
        }
    }

    /// PaddleOCR character dictionary for a recognition model of this language
    pub fn dictionary_file(&self) -> &'static str {
        match self {
            Language::Japanese => "japan_dict.txt",
            Language::English => "en_dict.txt",
        }
    }
}

/// Fixed engine language set: primary script first, then English
pub const ENGINE_LANGUAGES: [Language; 2] = [Language::Japanese, Language::English];

/// A loaded, ready-to-use recognition capability
///
/// Given decoded pixels, produce text regions in engine detection order.
#[cfg_attr(test, mockall::automock)]
pub trait RecognitionEngine: Send + Sync {
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<TextDetection>>;
}

/// Handle type shared by every service in the process
pub type SharedEngine = Arc<dyn RecognitionEngine>;

static SHARED_ENGINE: Mutex<Option<SharedEngine>> = Mutex::new(None);

fn lock_engine() -> MutexGuard<'static, Option<SharedEngine>> {
    // The slot is only ever replaced wholesale, so a poisoned lock still
    // holds a consistent value
    SHARED_ENGINE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Return the process-wide engine, constructing it with `factory` on first use
///
/// `factory` receives [`ENGINE_LANGUAGES`] and runs while the handle's lock is
/// held, so concurrent first callers construct exactly one engine. It is not
/// called at all once the engine exists. A failed construction stores nothing
/// and the next caller tries again.
pub fn shared_engine<F>(factory: F) -> Result<SharedEngine>
where
    F: FnOnce(&[Language]) -> Result<SharedEngine>,
{
    let mut slot = lock_engine();

    if let Some(engine) = slot.as_ref() {
        return Ok(Arc::clone(engine));
    }

    let codes: Vec<&str> = ENGINE_LANGUAGES.iter().map(Language::code).collect();
    info!("Initializing shared OCR engine for languages {:?}", codes);

    let engine = factory(&ENGINE_LANGUAGES)?;
    *slot = Some(Arc::clone(&engine));

    info!("✅ Shared OCR engine ready");
    Ok(engine)
}

/// Whether the process-wide engine has been constructed
pub fn is_initialized() -> bool {
    lock_engine().is_some()
}

/// Drop the process-wide engine so the next caller constructs a fresh one
#[cfg(test)]
pub(crate) fn reset_shared_engine() {
    *lock_engine() = None;
}

/// Serializes unit tests that touch the process-wide engine
#[cfg(test)]
pub(crate) fn engine_test_lock() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
