//! File packager
//!
//! The parse step only accepts zip archives. Zip inputs are uploaded as they
//! are; any other supported model or texture file is wrapped into a new
//! single-entry archive under a unique work directory.

use coohom_common::human_size::{estimate_upload_time, format_file_size, DEFAULT_CONNECTION_SPEED_MBPS};
use coohom_common::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Extensions accepted for upload (lowercase, with dot)
pub const SUPPORTED_EXTENSIONS: [&str; 14] = [
    ".zip", ".obj", ".fbx", ".3ds", ".dae", ".ply", ".stl", ".jpg", ".png", ".tga", ".bmp",
    ".jpeg", ".tiff", ".stp",
];

/// Hard upload limit
pub const MAX_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// Files above this size upload slowly; logged as a warning
pub const LARGE_FILE_WARNING: u64 = 50 * 1024 * 1024;

/// Lowercase extension with leading dot, empty if none
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

pub fn validate_file_type(file_name: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_of(file_name).as_str())
}

/// Description of a local input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub file_name: String,
    pub size_bytes: u64,
    pub size_formatted: String,
    /// At the default connection speed
    pub estimated_upload_time: String,
    pub extension: String,
    pub is_zip: bool,
    pub is_valid: bool,
}

impl FileInfo {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let file_name = file_name_of(path)?;
        let extension = extension_of(&file_name);

        Ok(Self {
            size_bytes: metadata.len(),
            size_formatted: format_file_size(metadata.len()),
            estimated_upload_time: estimate_upload_time(metadata.len(), DEFAULT_CONNECTION_SPEED_MBPS),
            is_zip: extension == ".zip",
            is_valid: validate_file_type(&file_name),
            extension,
            file_name,
        })
    }
}

/// Archive ready for upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagedArchive {
    pub path: PathBuf,
    /// File name sent to the STS endpoint
    pub file_name: String,
    pub size_bytes: u64,
    /// True when the packager created the archive
    pub compressed: bool,
}

impl PackagedArchive {
    /// Remove the work directory of a generated archive; inputs are left alone
    pub async fn cleanup(&self) {
        if !self.compressed {
            return;
        }
        if let Some(dir) = self.path.parent() {
            if let Err(e) = tokio::fs::remove_dir_all(dir).await {
                tracing::debug!(dir = %dir.display(), error = %e, "Failed to remove work directory");
            }
        }
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidInput(format!("Not a file path: {}", path.display())))
}

/// Turns input files into uploadable zip archives
#[derive(Debug, Clone)]
pub struct FilePackager {
    work_dir: PathBuf,
}

impl FilePackager {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Validate `source` and produce the archive to upload
    pub async fn package(&self, source: &Path) -> Result<PackagedArchive> {
        let info = FileInfo::from_path(source).map_err(|e| match e {
            Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                Error::InvalidInput(format!("File not found: {}", source.display()))
            }
            other => other,
        })?;

        if !info.is_valid {
            return Err(Error::InvalidInput(format!(
                "Unsupported file type '{}' for {}; supported: {}",
                info.extension,
                info.file_name,
                SUPPORTED_EXTENSIONS.join(" ")
            )));
        }
        if info.size_bytes > MAX_FILE_SIZE {
            return Err(Error::InvalidInput(format!(
                "{} is {}, above the {} upload limit",
                info.file_name,
                info.size_formatted,
                format_file_size(MAX_FILE_SIZE)
            )));
        }
        if info.size_bytes > LARGE_FILE_WARNING {
            tracing::warn!(
                file = %info.file_name,
                size = %info.size_formatted,
                estimate = %info.estimated_upload_time,
                "Large file, upload may take a while"
            );
        }

        if info.is_zip {
            tracing::debug!(file = %info.file_name, "Input is already a zip archive");
            return Ok(PackagedArchive {
                path: source.to_path_buf(),
                file_name: info.file_name,
                size_bytes: info.size_bytes,
                compressed: false,
            });
        }

        let stem = Path::new(&info.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model")
            .to_string();
        let target_dir = self.work_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&target_dir).await?;
        let archive_path = target_dir.join(format!("{}.zip", stem));

        let source_path = source.to_path_buf();
        let entry_name = info.file_name.clone();
        let output = archive_path.clone();
        let written = tokio::task::spawn_blocking(move || {
            write_single_entry_zip(&source_path, &entry_name, &output)
        })
        .await
        .map_err(|e| Error::Internal(format!("Packaging task failed: {}", e)))
        .and_then(|result| result);
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&target_dir).await {
                tracing::warn!(dir = %target_dir.display(), error = %cleanup, "Failed to remove work directory");
            }
            return Err(e);
        }

        let size_bytes = tokio::fs::metadata(&archive_path).await?.len();
        tracing::info!(
            source = %info.file_name,
            archive = %archive_path.display(),
            original = %info.size_formatted,
            compressed = %format_file_size(size_bytes),
            "Packaged file into zip archive"
        );

        Ok(PackagedArchive {
            path: archive_path,
            file_name: format!("{}.zip", stem),
            size_bytes,
            compressed: true,
        })
    }
}

fn write_single_entry_zip(source: &Path, entry_name: &str, output: &Path) -> Result<()> {
    let zip_error = |e: zip::result::ZipError| Error::Internal(format!("Zip error: {}", e));

    let mut writer = ZipWriter::new(BufWriter::new(File::create(output)?));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(entry_name, options).map_err(zip_error)?;

    let mut reader = BufReader::new(File::open(source)?);
    std::io::copy(&mut reader, &mut writer)?;
    writer.finish().map_err(zip_error)?;
    Ok(())
}
