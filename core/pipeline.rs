//! The end-to-end flatten run: collect, score, estimate, decide, read, pack, write.

use crate::chunking::{
    PackLimits, ReadIssue, SkippedFile, TruncatedFile, pack_entries, read_contents,
};
use crate::config::FlattenOptions;
use crate::error::{AppError, Result};
use crate::estimate::{
    BudgetContext, BudgetDecision, BudgetPolicy, SizeEstimate, estimate_chunks,
    exceeds_threshold, filter_to_smallest, library_patterns,
};
use crate::gather::{CandidateFile, collect_candidates};
use crate::progress::{CancellationToken, ProgressEvent, ProgressObserver};
use crate::rules::{CompiledRules, DEFAULT_RULES_FILENAME, RuleSet, append_blacklist_patterns};
use crate::scoring::{score_candidates, sort_by_importance};
use crate::writer::ChunkSink;
use log;
use serde::Serialize;
use std::path::PathBuf;
use std::time::SystemTime;

/// The host-supplied pieces a run talks to.
pub struct Collaborators<'a> {
    pub budget_policy: &'a dyn BudgetPolicy,
    pub observer: &'a dyn ProgressObserver,
    pub cancel: &'a CancellationToken,
    pub sink: &'a mut dyn ChunkSink,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlattenOutcome {
    Completed(FlattenReport),
    Aborted,
    Cancelled,
    RulesUpdated { path: PathBuf, added: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenReport {
    pub project_root: PathBuf,
    pub candidates: usize,
    pub files_read: usize,
    pub packed_files: usize,
    pub max_chunk_size: u64,
    pub estimate: SizeEstimate,
    pub decision: Option<String>,
    pub chunk_paths: Vec<PathBuf>,
    pub chunk_sizes: Vec<usize>,
    pub skipped: Vec<SkippedFile>,
    pub truncated: Vec<TruncatedFile>,
    pub binary: Vec<String>,
    pub unreadable: Vec<ReadIssue>,
    pub unreadable_dirs: Vec<(String, String)>,
    pub degraded_to_sequential: bool,
}

impl FlattenReport {
    pub fn chunk_count(&self) -> usize {
        self.chunk_paths.len()
    }
}

/// Candidates after collection and scoring, plus the projected chunk count.
#[derive(Debug, Clone)]
pub struct FlattenPlan {
    pub candidates: Vec<CandidateFile>,
    pub estimate: SizeEstimate,
    pub unreadable_dirs: Vec<(String, String)>,
    pub pruned_dirs: usize,
}

pub fn plan_flatten(
    options: &FlattenOptions,
    rules: &CompiledRules,
    cancel: &CancellationToken,
    observer: &dyn ProgressObserver,
) -> Result<FlattenPlan> {
    let root = &options.project_root;
    observer.notify(&ProgressEvent::CollectionStarted { root: root.clone() });

    let collected = collect_candidates(root, rules, &options.include_extensions, cancel)?;
    for (path, error) in &collected.unreadable {
        observer.notify(&ProgressEvent::Warning(format!(
            "Skipped unreadable entry {}: {}",
            path, error
        )));
    }
    observer.notify(&ProgressEvent::CollectionComplete {
        candidates: collected.files.len(),
    });

    let mut candidates = collected.files;
    if candidates.is_empty() {
        return Err(AppError::NoCandidates(root.clone()));
    }

    score_candidates(&mut candidates, SystemTime::now());
    if options.sort_by_importance {
        log::debug!("Ordering candidates by importance");
        sort_by_importance(&mut candidates);
    }

    let estimate = estimate_chunks(&candidates, options.max_chunk_size());
    observer.notify(&ProgressEvent::EstimateReady(estimate));

    Ok(FlattenPlan {
        candidates,
        estimate,
        unreadable_dirs: collected.unreadable,
        pruned_dirs: collected.pruned_dirs,
    })
}

/// Runs a full flatten. Cancellation is reported as [`FlattenOutcome::Cancelled`]; no chunk is
/// written unless packing finished.
pub fn run_flatten(
    options: &FlattenOptions,
    rules: &RuleSet,
    collaborators: &mut Collaborators<'_>,
) -> Result<FlattenOutcome> {
    match run_flatten_inner(options, rules, collaborators) {
        Err(AppError::Cancelled) => {
            log::warn!("Run cancelled; no output written");
            Ok(FlattenOutcome::Cancelled)
        }
        other => other,
    }
}

fn run_flatten_inner(
    options: &FlattenOptions,
    rules: &RuleSet,
    collab: &mut Collaborators<'_>,
) -> Result<FlattenOutcome> {
    for warning in &rules.warnings {
        collab.observer.notify(&ProgressEvent::Warning(warning.clone()));
    }

    let compiled = rules.compile()?;
    let plan = plan_flatten(options, &compiled, collab.cancel, collab.observer)?;
    let mut estimate = plan.estimate;
    let mut max_chunk_size = options.max_chunk_size();
    let mut decision_label = None;

    let selected = if exceeds_threshold(&estimate, options.budget_chunk_threshold) {
        let context = BudgetContext {
            estimate: &estimate,
            threshold: options.budget_chunk_threshold,
            max_token_limit: options.max_token_limit,
            candidates: &plan.candidates,
        };
        let decision = collab.budget_policy.decide(&context);
        log::info!(
            "Estimated {} chunks exceeds threshold of {}; decision: {:?}",
            estimate.estimated_chunk_count,
            options.budget_chunk_threshold,
            decision
        );
        decision_label = Some(format!("{:?}", decision));

        match decision {
            BudgetDecision::Proceed => plan.candidates,
            BudgetDecision::FilterToSmallest => {
                let library = library_patterns()?;
                let kept =
                    filter_to_smallest(&plan.candidates, options.filtered_budget_bytes(), &library);
                if kept.is_empty() {
                    return Err(AppError::NoCandidates(options.project_root.clone()));
                }
                estimate = estimate_chunks(&kept, max_chunk_size);
                kept
            }
            BudgetDecision::ExpandBudget { max_token_limit } => {
                if max_token_limit == 0 {
                    return Err(AppError::InvalidArgument(
                        "Expanded token limit must be greater than 0".to_string(),
                    ));
                }
                max_chunk_size = max_token_limit.saturating_mul(options.chars_per_token);
                estimate = estimate_chunks(&plan.candidates, max_chunk_size);
                collab.observer.notify(&ProgressEvent::EstimateReady(estimate));
                plan.candidates
            }
            BudgetDecision::AddBlacklist { patterns } => {
                let path = rules
                    .source
                    .clone()
                    .unwrap_or_else(|| options.project_root.join(DEFAULT_RULES_FILENAME));
                let added = append_blacklist_patterns(&path, &patterns)?;
                return Ok(FlattenOutcome::RulesUpdated { path, added });
            }
            BudgetDecision::Abort => {
                log::info!("Run aborted by budget policy");
                return Ok(FlattenOutcome::Aborted);
            }
        }
    } else {
        plan.candidates
    };

    collab.cancel.check()?;
    let read = read_contents(
        &selected,
        options.max_concurrent_files,
        collab.cancel,
        collab.observer,
    )?;
    for issue in &read.unreadable {
        collab.observer.notify(&ProgressEvent::Warning(format!(
            "Could not read {}: {}",
            issue.relative_path, issue.error
        )));
    }
    if read.contents.is_empty() {
        return Err(AppError::NoContent(selected.len()));
    }

    let limits = PackLimits {
        max_chunk_size: usize::try_from(max_chunk_size).unwrap_or(usize::MAX),
        ..options.pack_limits()
    };
    let packed = pack_entries(&read.contents, limits)?;
    for skipped in &packed.skipped {
        collab.observer.notify(&ProgressEvent::Warning(format!(
            "Skipped {} ({} bytes, {})",
            skipped.relative_path, skipped.entry_size, skipped.reason
        )));
    }
    if packed.chunks.is_empty() {
        return Err(AppError::NothingPacked(read.contents.len()));
    }

    collab.cancel.check()?;
    let total = packed.chunks.len();
    let mut chunk_paths = Vec::with_capacity(total);
    let mut chunk_sizes = Vec::with_capacity(total);
    for (i, chunk) in packed.chunks.iter().enumerate() {
        let rendered = chunk.render();
        let path = collab.sink.write_chunk(i + 1, total, &rendered)?;
        collab.observer.notify(&ProgressEvent::ChunkWritten {
            index: i + 1,
            total,
            path: path.clone(),
        });
        chunk_paths.push(path);
        chunk_sizes.push(rendered.len());
    }

    let packed_files = packed.packed_paths().count();
    log::info!(
        "Flattened {} files into {} chunks ({} skipped, {} truncated, {} binary, {} unreadable)",
        packed_files,
        total,
        packed.skipped.len(),
        packed.truncated.len(),
        read.binary.len(),
        read.unreadable.len()
    );

    Ok(FlattenOutcome::Completed(FlattenReport {
        project_root: options.project_root.clone(),
        candidates: selected.len(),
        files_read: read.contents.len(),
        packed_files,
        max_chunk_size,
        estimate,
        decision: decision_label,
        chunk_paths,
        chunk_sizes,
        skipped: packed.skipped,
        truncated: packed.truncated,
        binary: read.binary,
        unreadable: read.unreadable,
        unreadable_dirs: plan.unreadable_dirs,
        degraded_to_sequential: read.degraded_to_sequential,
    }))
}
