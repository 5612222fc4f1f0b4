use indicatif::{ProgressBar, ProgressStyle};
use log;
use std::sync::{Mutex, OnceLock};
use xflat_core::{ProgressEvent, ProgressObserver};

/// Terminal progress for a flatten run: a bar over file reads, warnings kept for the summary.
pub struct TerminalProgress {
    quiet: bool,
    bar: OnceLock<ProgressBar>,
    warnings: Mutex<Vec<String>>,
}

impl TerminalProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            bar: OnceLock::new(),
            warnings: Mutex::new(Vec::new()),
        }
    }

    fn read_bar(&self, total: usize) -> &ProgressBar {
        self.bar.get_or_init(|| {
            if self.quiet {
                return ProgressBar::hidden();
            }
            let pb = ProgressBar::new(total as u64);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|e| {
                log::warn!("Failed to parse progress bar template: {}", e);
                ProgressStyle::default_bar()
            })
            .progress_chars("#>-");
            pb.set_style(style);
            pb.set_message("reading files");
            pb
        })
    }

    pub fn finish(&self) {
        if let Some(pb) = self.bar.get() {
            pb.finish_and_clear();
        }
    }

    pub fn take_warnings(&self) -> Vec<String> {
        match self.warnings.lock() {
            Ok(mut w) => std::mem::take(&mut *w),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl ProgressObserver for TerminalProgress {
    fn notify(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::CollectionStarted { root } => {
                log::debug!("Collecting files under {}", root.display());
            }
            ProgressEvent::CollectionComplete { candidates } => {
                log::info!("{} candidate files", candidates);
            }
            ProgressEvent::EstimateReady(estimate) => {
                log::info!(
                    "Estimate: {} chunks, {} bytes",
                    estimate.estimated_chunk_count,
                    estimate.total_size
                );
            }
            ProgressEvent::FilesRead { done, total } => {
                let pb = self.read_bar(*total);
                pb.set_position(*done as u64);
                if done == total {
                    pb.set_message("packing");
                }
            }
            ProgressEvent::ChunkWritten { index, total, .. } => {
                if let Some(pb) = self.bar.get() {
                    pb.set_message(format!("wrote chunk {}/{}", index, total));
                }
            }
            ProgressEvent::Warning(message) => {
                if let Ok(mut w) = self.warnings.lock() {
                    w.push(message.clone());
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_collected_once() {
        let progress = TerminalProgress::new(true);
        progress.notify(&ProgressEvent::Warning("skipped a".to_string()));
        progress.notify(&ProgressEvent::FilesRead { done: 1, total: 2 });
        assert_eq!(progress.take_warnings(), vec!["skipped a".to_string()]);
        assert!(progress.take_warnings().is_empty());
        progress.finish();
    }
}
