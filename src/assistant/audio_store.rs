//! Persists synthesized audio under unique file names and maps them to
//! retrieval URLs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// URL prefix the HTTP layer serves the audio directory under.
pub const AUDIO_URL_PREFIX: &str = "/static/audio";

/// Extensions considered audio by `cleanup_old`.
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioNaming {
    /// Random v4 UUID per file.
    #[default]
    Uuid,
    /// SHA-256 of the payload; identical audio maps to one file.
    ContentHash,
}

/// Reference to a persisted audio file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioRef {
    pub file_name: String,
    pub url: String,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
    naming: AudioNaming,
}

impl AudioStore {
    pub fn new(dir: PathBuf, naming: AudioNaming) -> Self {
        Self { dir, naming }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Write `audio` and return its reference.
    ///
    /// The payload goes to a `.part` file first and is renamed into place,
    /// so a failed write never leaves a truncated file under the final name.
    pub fn save(&self, audio: &[u8], extension: &str) -> io::Result<AudioRef> {
        self.ensure_dir()?;

        let stem = match self.naming {
            AudioNaming::Uuid => Uuid::new_v4().simple().to_string(),
            AudioNaming::ContentHash => hex_digest(audio),
        };
        let file_name = format!("{stem}.{extension}");
        let final_path = self.dir.join(&file_name);
        let part_path = self.dir.join(format!("{file_name}.part"));

        if let Err(e) = fs::write(&part_path, audio).and_then(|_| fs::rename(&part_path, &final_path)) {
            let _ = fs::remove_file(&part_path);
            return Err(e);
        }

        tracing::debug!(file = %file_name, bytes = audio.len(), "Audio saved");
        Ok(AudioRef {
            url: audio_url(&file_name),
            file_name,
            size_bytes: audio.len(),
            created_at: Utc::now(),
        })
    }

    /// Path of a stored file, or `None` for names that are unsafe or absent.
    pub fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        if !is_safe_file_name(file_name) {
            return None;
        }
        let path = self.dir.join(file_name);
        path.is_file().then_some(path)
    }

    pub fn delete(&self, file_name: &str) -> bool {
        match self.resolve(file_name) {
            Some(path) => fs::remove_file(path).is_ok(),
            None => false,
        }
    }

    /// Keep the newest `max_files` audio files, delete the rest.
    /// Returns how many files were removed.
    pub fn cleanup_old(&self, max_files: usize) -> io::Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_audio = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| AUDIO_EXTENSIONS.contains(&e));
            if !is_audio {
                continue;
            }
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                files.push((path, modified));
            }
        }

        files.sort_by(|a, b| b.1.cmp(&a.1));
        let mut removed = 0;
        for (path, _) in files.into_iter().skip(max_files) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Audio cleanup failed"),
            }
        }
        if removed > 0 {
            tracing::info!(removed, kept = max_files, "Old audio files cleaned up");
        }
        Ok(removed)
    }
}

pub fn audio_url(file_name: &str) -> String {
    format!("{AUDIO_URL_PREFIX}/{file_name}")
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}
