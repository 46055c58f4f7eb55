//! Output directory names derived from the mix itself.
//!
//! A run is named after its scene and emotional arc plus its length, e.g.
//! `bedroom-whisper-to-climax-42s`, so a directory listing reads like a
//! table of contents.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::ScheduledSegment;

/// Lowercase ASCII alphanumerics separated by single dashes.
pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-').len();
    out.truncate(trimmed);
    out
}

/// Name for a mix: first segment's environment (when tagged), the tone of
/// the first and last segment, and the rounded duration in seconds.
pub fn mix_name(segments: &[ScheduledSegment], duration: f64) -> String {
    let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
        return "empty".to_string();
    };

    let mut parts = Vec::with_capacity(3);
    let scene = slug(&first.segment.environment);
    if !scene.is_empty() {
        parts.push(scene);
    }
    let (from, to) = (first.segment.emotional_tone, last.segment.emotional_tone);
    if from == to {
        parts.push(from.as_str().to_string());
    } else {
        parts.push(format!("{}-to-{}", from.as_str(), to.as_str()));
    }
    parts.push(format!("{}s", duration.max(0.0).round() as u64));
    parts.join("-")
}

/// Create `root/name`, or `root/name-2`, `root/name-3`, ... if taken.
pub fn create_output_dir(root: &Path, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    let name = match slug(name) {
        s if s.is_empty() => "mix".to_string(),
        s => s,
    };

    let mut attempt = 1u32;
    loop {
        let candidate = match attempt {
            1 => root.join(&name),
            n => root.join(format!("{}-{}", name, n)),
        };
        match std::fs::create_dir(&candidate) {
            Ok(()) => {
                log::debug!("Created output directory {}", candidate.display());
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
