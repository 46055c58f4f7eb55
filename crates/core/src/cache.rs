//! File-based caching of synthesis responses.
//!
//! Synthesized audio is keyed by a SHA-256 of the rendered SSML and the
//! voice settings, so repeated runs over the same script only pay for the
//! segments that changed.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::BoxError;
use crate::pipeline::Synthesizer;
use crate::voice::VoiceRequest;

/// Get the cache directory.
///
/// Uses `SEGUE_CACHE_DIR` env var if set, otherwise `~/.cache/segue`.
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SEGUE_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".cache").join("segue")
}

/// Cache key for a voice request. Returns a 64-character hex string.
pub fn request_key(request: &VoiceRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.ssml().as_bytes());
    hasher.update(request.settings.stability.to_le_bytes());
    hasher.update(request.settings.expressiveness.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Atomically write data to a file via temp file + rename.
fn atomic_write(target: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = target.with_extension("tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, target)?;
    Ok(())
}

fn short(key: &str) -> &str {
    &key[..12.min(key.len())]
}

/// A [`Synthesizer`] that serves repeated requests from disk.
pub struct CachedSynthesizer<S> {
    inner: S,
    dir: PathBuf,
}

impl<S: Synthesizer> CachedSynthesizer<S> {
    /// Cache under `cache_dir()/synth`.
    pub fn new(inner: S) -> Self {
        Self::with_dir(inner, cache_dir().join("synth"))
    }

    pub fn with_dir(inner: S, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.audio", key))
    }

    /// Return cached audio, or None if not cached.
    pub fn get_cached(&self, request: &VoiceRequest) -> Option<Vec<u8>> {
        let key = request_key(request);
        let path = self.entry_path(&key);
        if !path.metadata().map(|m| m.len() > 0).unwrap_or(false) {
            return None;
        }
        let data = std::fs::read(&path).ok()?;
        log::info!("Cache hit: synthesis ({}...)", short(&key));
        Some(data)
    }

    fn store(&self, request: &VoiceRequest, audio: &[u8]) {
        let key = request_key(request);
        match atomic_write(&self.entry_path(&key), audio) {
            Ok(()) => log::debug!("Cached synthesis ({}...)", short(&key)),
            // A failed write only costs a future cache miss.
            Err(e) => log::warn!("Could not cache synthesis ({}...): {}", short(&key), e),
        }
    }
}

impl<S: Synthesizer> Synthesizer for CachedSynthesizer<S> {
    fn synthesize(&self, request: &VoiceRequest) -> Result<Vec<u8>, BoxError> {
        if let Some(audio) = self.get_cached(request) {
            return Ok(audio);
        }
        let audio = self.inner.synthesize(request)?;
        if !audio.is_empty() {
            self.store(request, &audio);
        }
        Ok(audio)
    }
}
