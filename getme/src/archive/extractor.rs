//! Shell-based archive extractor.

use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Output, Stdio};

use super::{ArchiveError, ArchiveExtractor, ArchiveFormat, ArchiveResult, ExtractedFile};

/// Extractor driving the system `tar` and `unzip` tools.
///
/// `tar` detects the compression of the archive on its own, so every
/// tar-family suffix goes through the same invocation.
#[derive(Debug, Default)]
pub struct ShellExtractor;

impl ShellExtractor {
    /// Create a new shell-based extractor.
    pub fn new() -> Self {
        Self
    }

    fn run(&self, archive: &Path, command: &mut Command) -> ArchiveResult<Output> {
        let tool = command.get_program().to_string_lossy().to_string();
        let output = command
            .output()
            .map_err(|e| ArchiveError::ExtractionFailed {
                path: archive.to_path_buf(),
                reason: format!("Failed to run {}: {}", tool, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ArchiveError::ExtractionFailed {
                path: archive.to_path_buf(),
                reason: format!("{} failed: {}", tool, stderr.trim()),
            });
        }

        Ok(output)
    }

    /// Stream one entry straight into `dest`.
    fn extract_entry(
        &self,
        format: ArchiveFormat,
        archive: &Path,
        entry: &str,
        dest: &Path,
    ) -> ArchiveResult<()> {
        let file = File::create(dest).map_err(|e| ArchiveError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let mut command = match format {
            ArchiveFormat::Tar => {
                let mut c = Command::new("tar");
                c.arg("-xOf").arg(archive).arg("--").arg(entry);
                c
            }
            ArchiveFormat::Zip => {
                let mut c = Command::new("unzip");
                c.arg("-p").arg(archive).arg(unzip_pattern(entry));
                c
            }
        };
        command.stdout(Stdio::from(file));

        if let Err(e) = self.run(archive, &mut command) {
            fs::remove_file(dest).ok();
            return Err(e);
        }
        Ok(())
    }
}

impl ArchiveExtractor for ShellExtractor {
    fn extract_all(
        &self,
        format: ArchiveFormat,
        archive: &Path,
        dest_dir: &Path,
    ) -> ArchiveResult<usize> {
        create_dir(dest_dir)?;

        let mut command = match format {
            ArchiveFormat::Tar => {
                let mut c = Command::new("tar");
                c.arg("-xf").arg(archive).arg("-C").arg(dest_dir);
                c
            }
            ArchiveFormat::Zip => {
                let mut c = Command::new("unzip");
                c.args(["-o", "-q"]).arg(archive).arg("-d").arg(dest_dir);
                c
            }
        };
        self.run(archive, &mut command)?;

        count_files_recursive(dest_dir)
    }

    fn extract_files(
        &self,
        format: ArchiveFormat,
        archive: &Path,
        files: &[ExtractedFile],
    ) -> ArchiveResult<()> {
        for file in files {
            if let Some(parent) = file.destination.parent().filter(|p| !p.as_os_str().is_empty()) {
                create_dir(parent)?;
            }
            self.extract_entry(format, archive, &file.source, &file.destination)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> ArchiveResult<()> {
    fs::create_dir_all(dir).map_err(|e| ArchiveError::CreateDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// `unzip` matches entry names as wildcard patterns and reads a leading
/// `-` as an option; escape both so the name is taken literally.
fn unzip_pattern(entry: &str) -> String {
    let mut pattern = String::with_capacity(entry.len());
    for (i, c) in entry.chars().enumerate() {
        if matches!(c, '*' | '?' | '[' | '\\') || (i == 0 && c == '-') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}

/// Count files recursively in a directory.
fn count_files_recursive(dir: &Path) -> ArchiveResult<usize> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir).map_err(|e| ArchiveError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            count += 1;
        } else if path.is_dir() {
            count += count_files_recursive(&path)?;
        }
    }

    Ok(count)
}
