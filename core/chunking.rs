use crate::error::{AppError, Result};
use crate::gather::CandidateFile;
use crate::progress::{CancellationToken, ProgressEvent, ProgressObserver};
use crate::tree::render_tree;
use log;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

pub const TREE_HEADER: &str = "=== Directory Tree ===\n";

/// What happens to a file whose entry is larger than the per-file limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OversizePolicy {
    #[default]
    Skip,
    Truncate,
}

impl FromStr for OversizePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(OversizePolicy::Skip),
            "truncate" => Ok(OversizePolicy::Truncate),
            other => Err(format!(
                "unknown oversize policy '{}', expected 'skip' or 'truncate'",
                other
            )),
        }
    }
}

impl fmt::Display for OversizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OversizePolicy::Skip => write!(f, "skip"),
            OversizePolicy::Truncate => write!(f, "truncate"),
        }
    }
}

pub fn entry_header(relative_path: &str) -> String {
    format!("\n\n=== FILE: {} ===\n", relative_path)
}

pub fn entry_text(relative_path: &str, content: &str) -> String {
    let mut text = entry_header(relative_path);
    text.push_str(content);
    text
}

pub fn truncation_marker(omitted_bytes: usize) -> String {
    format!("\n... [truncated: {} bytes omitted]\n", omitted_bytes)
}

/// A file's text as read from disk, keyed by its project-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub relative_path: String,
    pub content: String,
}

impl FileContent {
    pub fn new(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ExceedsFileLimit,
    ExceedsChunkLimit,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ExceedsFileLimit => write!(f, "exceeds per-file limit"),
            SkipReason::ExceedsChunkLimit => write!(f, "exceeds chunk limit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub relative_path: String,
    pub entry_size: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncatedFile {
    pub relative_path: String,
    pub original_size: usize,
    pub omitted_bytes: usize,
}

/// A sealed output unit: concatenated entries plus the manifest of files in append order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub included_relative_paths: Vec<String>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.included_relative_paths.is_empty()
    }

    fn append(&mut self, relative_path: &str, entry: &str) {
        self.content.push_str(entry);
        self.included_relative_paths.push(relative_path.to_string());
    }

    /// Artifact text: tree header built from the manifest, then the packed entries.
    pub fn render(&self) -> String {
        let tree = render_tree(&self.included_relative_paths);
        let capacity = TREE_HEADER.len() + tree.len() + 2 + self.content.len();
        let mut out = String::with_capacity(capacity);
        out.push_str(TREE_HEADER);
        out.push_str(&tree);
        out.push_str("\n\n");
        out.push_str(&self.content);
        out
    }
}

/// Sizes are in UTF-8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackLimits {
    pub max_chunk_size: usize,
    pub max_file_size: usize,
    pub oversize: OversizePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackOutcome {
    pub chunks: Vec<Chunk>,
    pub skipped: Vec<SkippedFile>,
    pub truncated: Vec<TruncatedFile>,
}

impl PackOutcome {
    pub fn packed_paths(&self) -> impl Iterator<Item = &str> {
        self.chunks
            .iter()
            .flat_map(|c| c.included_relative_paths.iter().map(String::as_str))
    }
}

/// Greedy in-order packing. Files are never split across chunks.
pub fn pack_entries(files: &[FileContent], limits: PackLimits) -> Result<PackOutcome> {
    if limits.max_chunk_size == 0 {
        return Err(AppError::Chunking(
            "Chunk size must be greater than 0 bytes".to_string(),
        ));
    }
    log::debug!(
        "Packing {} files (chunk limit {} bytes, file limit {} bytes, oversize policy {})",
        files.len(),
        limits.max_chunk_size,
        limits.max_file_size,
        limits.oversize
    );

    let mut outcome = PackOutcome::default();
    let mut current = Chunk::default();

    for file in files {
        let mut entry = entry_text(&file.relative_path, &file.content);

        if entry.len() > limits.max_file_size {
            match limits.oversize {
                OversizePolicy::Skip => {
                    log::warn!(
                        "Skipping {} ({} bytes exceeds per-file limit of {} bytes)",
                        file.relative_path,
                        entry.len(),
                        limits.max_file_size
                    );
                    outcome.skipped.push(SkippedFile {
                        relative_path: file.relative_path.clone(),
                        entry_size: entry.len(),
                        reason: SkipReason::ExceedsFileLimit,
                    });
                    continue;
                }
                OversizePolicy::Truncate => match truncate_entry(file, limits.max_file_size) {
                    Some((text, omitted)) => {
                        log::warn!(
                            "Truncating {} ({} bytes omitted)",
                            file.relative_path,
                            omitted
                        );
                        outcome.truncated.push(TruncatedFile {
                            relative_path: file.relative_path.clone(),
                            original_size: entry.len(),
                            omitted_bytes: omitted,
                        });
                        entry = text;
                    }
                    None => {
                        log::warn!(
                            "Skipping {}: per-file limit of {} bytes leaves no room for content",
                            file.relative_path,
                            limits.max_file_size
                        );
                        outcome.skipped.push(SkippedFile {
                            relative_path: file.relative_path.clone(),
                            entry_size: entry.len(),
                            reason: SkipReason::ExceedsFileLimit,
                        });
                        continue;
                    }
                },
            }
        }

        if entry.len() > limits.max_chunk_size {
            log::warn!(
                "Skipping {} ({} bytes exceeds chunk limit of {} bytes)",
                file.relative_path,
                entry.len(),
                limits.max_chunk_size
            );
            outcome.skipped.push(SkippedFile {
                relative_path: file.relative_path.clone(),
                entry_size: entry.len(),
                reason: SkipReason::ExceedsChunkLimit,
            });
            continue;
        }

        if !current.is_empty() && current.len() + entry.len() > limits.max_chunk_size {
            log::trace!(
                "Sealing chunk {} ({} bytes, {} files)",
                outcome.chunks.len() + 1,
                current.len(),
                current.included_relative_paths.len()
            );
            outcome.chunks.push(std::mem::take(&mut current));
        }
        current.append(&file.relative_path, &entry);
    }

    if !current.is_empty() {
        outcome.chunks.push(current);
    }

    log::info!(
        "Packed {} files into {} chunks ({} skipped, {} truncated)",
        files.len() - outcome.skipped.len(),
        outcome.chunks.len(),
        outcome.skipped.len(),
        outcome.truncated.len()
    );
    Ok(outcome)
}

/// Returns the truncated entry and the number of omitted content bytes, or `None` when even
/// the header and marker exceed `max_file_size`.
fn truncate_entry(file: &FileContent, max_file_size: usize) -> Option<(String, usize)> {
    let header = entry_header(&file.relative_path);
    // Widest marker this file could need.
    let marker_budget = truncation_marker(file.content.len()).len();
    let room = max_file_size.checked_sub(header.len() + marker_budget)?;
    let keep = find_char_boundary(&file.content, room);
    let omitted = file.content.len() - keep;

    let mut text = header;
    text.push_str(&file.content[..keep]);
    text.push_str(&truncation_marker(omitted));
    Some((text, omitted))
}

/// Largest char boundary in `s` that is `<= index`.
pub fn find_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadIssue {
    pub relative_path: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    Text(FileContent),
    Binary(String),
    Failed(ReadIssue),
}

#[derive(Debug, Clone, Default)]
pub struct ReadOutcome {
    /// Text contents in candidate order.
    pub contents: Vec<FileContent>,
    pub unreadable: Vec<ReadIssue>,
    pub binary: Vec<String>,
    pub degraded_to_sequential: bool,
}

pub fn read_file(file: &CandidateFile) -> ReadResult {
    match fs::read(&file.absolute_path) {
        Ok(bytes) => {
            if bytes.contains(&0) {
                return ReadResult::Binary(file.relative_path.clone());
            }
            match String::from_utf8(bytes) {
                Ok(text) => ReadResult::Text(FileContent::new(file.relative_path.clone(), text)),
                Err(_) => ReadResult::Binary(file.relative_path.clone()),
            }
        }
        Err(e) => ReadResult::Failed(ReadIssue {
            relative_path: file.relative_path.clone(),
            error: e.to_string(),
        }),
    }
}

pub fn read_contents(
    files: &[CandidateFile],
    max_concurrent: usize,
    cancel: &CancellationToken,
    observer: &dyn ProgressObserver,
) -> Result<ReadOutcome> {
    read_contents_with(files, max_concurrent, cancel, observer, read_file)
}

/// Reads `files` in batches of `max_concurrent` on a dedicated rayon pool.
///
/// Each batch resolves fully before the next starts and results keep input order. If the pool
/// cannot be built, or a batch panics, that batch and every later one are read sequentially.
/// Cancellation is checked before each batch.
pub fn read_contents_with<F>(
    files: &[CandidateFile],
    max_concurrent: usize,
    cancel: &CancellationToken,
    observer: &dyn ProgressObserver,
    reader: F,
) -> Result<ReadOutcome>
where
    F: Fn(&CandidateFile) -> ReadResult + Sync,
{
    let width = max_concurrent.max(1);
    let mut outcome = ReadOutcome::default();

    let mut pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(width)
        .thread_name(|i| format!("xflat-read-{}", i))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            log::warn!("Could not start read pool ({}), reading sequentially", e);
            outcome.degraded_to_sequential = true;
            None
        }
    };

    log::debug!("Reading {} files in batches of {}", files.len(), width);
    let total = files.len();
    let mut done = 0usize;

    for batch in files.chunks(width) {
        cancel.check()?;

        let attempt = pool.as_ref().map(|p| {
            panic::catch_unwind(AssertUnwindSafe(|| {
                p.install(|| batch.par_iter().map(&reader).collect::<Vec<_>>())
            }))
        });
        let results = match attempt {
            Some(Ok(results)) => results,
            Some(Err(_)) => {
                log::warn!(
                    "Parallel read failed at file {} of {}, continuing sequentially",
                    done + 1,
                    total
                );
                pool = None;
                outcome.degraded_to_sequential = true;
                batch.iter().map(&reader).collect()
            }
            None => batch.iter().map(&reader).collect(),
        };

        for result in results {
            match result {
                ReadResult::Text(content) => outcome.contents.push(content),
                ReadResult::Binary(path) => {
                    log::info!("Skipping binary file: {}", path);
                    outcome.binary.push(path);
                }
                ReadResult::Failed(issue) => {
                    log::warn!("Failed to read {}: {}", issue.relative_path, issue.error);
                    outcome.unreadable.push(issue);
                }
            }
        }
        done += batch.len();
        observer.notify(&ProgressEvent::FilesRead { done, total });
    }

    Ok(outcome)
}
