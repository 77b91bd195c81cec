//! Media publishing: copies (and optionally converts) media files into the
//! output `media/` directory.
//!
//! Published names are sanitised versions of the source basename. When a file
//! of that name already exists its content hash decides between reuse and a
//! numbered name (`clip1.wav`, `clip2.wav`, ...). A missing source never fails
//! the render; the caller gets a best-effort path that may not resolve.

use crate::markup::normalize;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// Output-relative directory holding published media
pub const MEDIA_DIR: &str = "media";

/// Kind of a media file, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Other,
}

impl MediaKind {
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" | "webp" | "tif" | "tiff" => {
                MediaKind::Image
            }
            "wav" | "wave" | "mp3" | "ogg" | "oga" | "m4a" | "flac" | "aif" | "aiff" | "wma" => {
                MediaKind::Audio
            }
            "mp4" | "webm" | "ogv" | "mov" | "avi" | "mkv" => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }

    /// MIME type for `<source type=...>`
    pub fn mime(path: &str) -> Option<&'static str> {
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        Some(match ext.as_str() {
            "wav" | "wave" => "audio/wav",
            "mp3" => "audio/mpeg",
            "ogg" | "oga" => "audio/ogg",
            "m4a" => "audio/mp4",
            "flac" => "audio/flac",
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            "ogv" => "video/ogg",
            _ => return None,
        })
    }
}

fn is_uncompressed_audio(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("wav" | "wave" | "aif" | "aiff")
    )
}

/// Converts uncompressed audio to a compressed format
pub trait AudioConverter: Send + Sync {
    /// Extension of the produced files, without the dot
    fn extension(&self) -> &str;

    fn convert(&self, source: &Path, dest: &Path) -> io::Result<()>;
}

/// Converter running an external program as `<program> <args...> <source> <dest>`-style
/// command line, with `{input}` and `{output}` placeholders in `args`
#[derive(Debug, Clone)]
pub struct CommandConverter {
    pub program: String,
    pub args: Vec<String>,
    pub extension: String,
}

impl CommandConverter {
    pub fn ffmpeg_mp3() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            args: ["-y", "-loglevel", "error", "-i", "{input}", "{output}"]
                .iter()
                .map(|a| a.to_string())
                .collect(),
            extension: "mp3".to_string(),
        }
    }
}

impl AudioConverter for CommandConverter {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn convert(&self, source: &Path, dest: &Path) -> io::Result<()> {
        let args = self.args.iter().map(|a| match a.as_str() {
            "{input}" => source.as_os_str().to_owned(),
            "{output}" => dest.as_os_str().to_owned(),
            other => other.into(),
        });
        let status = Command::new(&self.program).args(args).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} exited with {}", self.program, status),
            ))
        }
    }
}

/// Publishes media files into `<output>/media`, deduplicating by content
pub struct MediaPublisher {
    output_dir: PathBuf,
    convert_audio: bool,
    converter: Option<Box<dyn AudioConverter>>,
    /// Source path -> published relative path
    published: Mutex<HashMap<PathBuf, String>>,
    /// One lock per destination path, held across check-then-copy
    dest_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for MediaPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPublisher")
            .field("output_dir", &self.output_dir)
            .field("convert_audio", &self.convert_audio)
            .field("converter", &self.converter.as_ref().map(|c| c.extension().to_string()))
            .finish()
    }
}

impl MediaPublisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            convert_audio: false,
            converter: None,
            published: Mutex::new(HashMap::new()),
            dest_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Request compressed audio; without a converter originals are published as-is
    pub fn with_audio_conversion(mut self, converter: Option<Box<dyn AudioConverter>>) -> Self {
        self.convert_audio = true;
        self.converter = converter;
        self
    }

    pub fn media_dir(&self) -> PathBuf {
        self.output_dir.join(MEDIA_DIR)
    }

    /// Number of distinct sources published so far
    pub fn published_count(&self) -> usize {
        self.published.lock().len()
    }

    /// Publish `source` and return its output-relative path (`media/<name>`)
    pub fn publish(&self, source: &Path) -> String {
        if let Some(existing) = self.published.lock().get(source) {
            return existing.clone();
        }

        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .map(sanitize_file_name)
            .unwrap_or_else(|| "media".to_string());

        if !source.is_file() {
            tracing::warn!("Media file {:?} is missing; linking to it anyway", source);
            return relative(&file_name);
        }

        let (content, file_name, staged) = self.prepare(source, file_name);
        let result = self.place(&content, &file_name);
        if staged {
            let _ = fs::remove_file(&content);
        }

        match result {
            Ok(rel) => {
                self.published
                    .lock()
                    .insert(source.to_path_buf(), rel.clone());
                rel
            }
            Err(err) => {
                tracing::warn!("Failed to publish media {:?}: {}", source, err);
                relative(&file_name)
            }
        }
    }

    /// File whose bytes will be published and the name to publish it under.
    /// The flag marks a staged conversion output to remove afterwards.
    fn prepare(&self, source: &Path, file_name: String) -> (PathBuf, String, bool) {
        let converter = match &self.converter {
            Some(c) if self.convert_audio && is_uncompressed_audio(source) => c,
            _ => {
                if self.convert_audio && is_uncompressed_audio(source) {
                    tracing::debug!("No audio converter available; publishing {:?} unchanged", source);
                }
                return (source.to_path_buf(), file_name, false);
            }
        };

        let stem = Path::new(&file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("media")
            .to_string();
        let converted_name = format!("{}.{}", stem, converter.extension());
        let staging = self
            .media_dir()
            .join(format!(".staging-{}-{}", std::process::id(), converted_name));

        let converted = fs::create_dir_all(self.media_dir())
            .and_then(|_| converter.convert(source, &staging));
        match converted {
            Ok(()) => (staging, converted_name, true),
            Err(err) => {
                tracing::warn!(
                    "Audio conversion of {:?} failed ({}); publishing original",
                    source,
                    err
                );
                let _ = fs::remove_file(&staging);
                (source.to_path_buf(), file_name, false)
            }
        }
    }

    fn place(&self, content: &Path, file_name: &str) -> io::Result<String> {
        let media_dir = self.media_dir();
        fs::create_dir_all(&media_dir)?;
        let content_hash = hash_file(content)?;

        let mut n = 0;
        loop {
            let candidate = disambiguate(file_name, n);
            let dest = media_dir.join(&candidate);
            let lock = self.lock_for(&dest);
            let _guard = lock.lock();

            if !dest.exists() {
                fs::copy(content, &dest)?;
                tracing::debug!("Published {:?} as {}", content, candidate);
                return Ok(relative(&candidate));
            }
            if hash_file(&dest)? == content_hash {
                tracing::debug!("Reusing identical {}", candidate);
                return Ok(relative(&candidate));
            }
            n += 1;
        }
    }

    fn lock_for(&self, dest: &Path) -> Arc<Mutex<()>> {
        self.dest_locks
            .lock()
            .entry(dest.to_path_buf())
            .or_default()
            .clone()
    }
}

fn relative(file_name: &str) -> String {
    format!("{}/{}", MEDIA_DIR, file_name)
}

/// `name.ext`, `name1.ext`, `name2.ext`, ...
fn disambiguate(file_name: &str, n: usize) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}{}.{}", stem, n, ext),
        _ => format!("{}{}", file_name, n),
    }
}

/// Strip characters that are not allowed in published file names
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = normalize(name)
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "media".to_string()
    } else {
        trimmed.to_string()
    }
}

fn hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize())
}
