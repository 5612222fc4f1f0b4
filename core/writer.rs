use crate::error::{AppError, Result};
use crate::rules::GITIGNORE_FILENAME;
use chrono::Local;
use log;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Destination for rendered chunks. `index` is 1-based.
pub trait ChunkSink {
    fn write_chunk(&mut self, index: usize, total: usize, rendered: &str) -> Result<PathBuf>;
}

/// Writes `{prefix}_part{index}.txt` files into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    prefix: String,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_prefix(dir, timestamp_prefix())
    }

    pub fn with_prefix(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}_part{}.txt", self.prefix, index))
    }
}

pub fn timestamp_prefix() -> String {
    format!("xflat_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

impl ChunkSink for DirectorySink {
    fn write_chunk(&mut self, index: usize, total: usize, rendered: &str) -> Result<PathBuf> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| AppError::DirCreation {
                path: self.dir.clone(),
                source: e,
            })?;
        }
        let path = self.chunk_path(index);
        fs::write(&path, rendered).map_err(|e| AppError::FileWrite {
            path: path.clone(),
            source: e,
        })?;
        log::info!(
            "Wrote chunk {}/{} ({} bytes) to {}",
            index,
            total,
            rendered.len(),
            path.display()
        );
        Ok(path)
    }
}

/// Keeps rendered chunks in memory; used for `--stdout` and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub chunks: Vec<String>,
}

impl ChunkSink for MemorySink {
    fn write_chunk(&mut self, index: usize, _total: usize, rendered: &str) -> Result<PathBuf> {
        self.chunks.push(rendered.to_string());
        Ok(PathBuf::from(format!("<memory>/part{}", index)))
    }
}

/// Appends `entry` to the project's `.gitignore` unless a line already names it.
/// Returns whether the file changed.
pub fn ensure_gitignore_entry(project_root: &Path, entry: &str) -> Result<bool> {
    let path = project_root.join(GITIGNORE_FILENAME);
    let existing = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(AppError::FileRead { path, source: e }),
    };

    let wanted = entry.trim().trim_matches('/');
    let present = existing
        .lines()
        .map(|l| l.trim().trim_matches('/'))
        .any(|l| l == wanted);
    if present {
        log::debug!("{} already lists {}", path.display(), entry);
        return Ok(false);
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(entry);
    updated.push('\n');
    fs::write(&path, updated).map_err(|e| AppError::FileWrite {
        path: path.clone(),
        source: e,
    })?;
    log::info!("Added {} to {}", entry, path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn directory_sink_creates_numbered_files() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let mut sink = DirectorySink::with_prefix(&out, "xflat_test");
        let first = sink.write_chunk(1, 2, "one").unwrap();
        let second = sink.write_chunk(2, 2, "two").unwrap();
        assert_eq!(first, out.join("xflat_test_part1.txt"));
        assert_eq!(fs::read_to_string(second).unwrap(), "two");
    }

    #[test]
    fn timestamp_prefix_shape() {
        let prefix = timestamp_prefix();
        assert!(prefix.starts_with("xflat_"));
        assert_eq!(prefix.len(), "xflat_20240101_120000".len());
    }

    #[test]
    fn gitignore_entry_is_added_once() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "target").unwrap();
        assert!(ensure_gitignore_entry(dir.path(), ".xtools/xflat/output/").unwrap());
        assert!(!ensure_gitignore_entry(dir.path(), ".xtools/xflat/output").unwrap());
        assert_eq!(
            fs::read_to_string(dir.path().join(".gitignore")).unwrap(),
            "target\n.xtools/xflat/output/\n"
        );
    }
}
