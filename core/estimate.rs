use crate::builtin::get_builtin_lists;
use crate::chunking::entry_header;
use crate::error::Result;
use crate::gather::CandidateFile;
use crate::glob::PatternSet;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SizeEstimate {
    pub estimated_chunk_count: usize,
    pub total_size: u64,
}

/// Simulates greedy packing over entry sizes in input order.
pub fn estimate_sizes<I>(sizes: I, max_chunk_size: u64) -> SizeEstimate
where
    I: IntoIterator<Item = u64>,
{
    let mut estimate = SizeEstimate::default();
    let mut running = 0u64;
    for size in sizes {
        estimate.total_size += size;
        if estimate.estimated_chunk_count == 0 {
            estimate.estimated_chunk_count = 1;
            running = size;
        } else if running > 0 && running + size > max_chunk_size {
            estimate.estimated_chunk_count += 1;
            running = size;
        } else {
            running += size;
        }
    }
    estimate
}

/// Counts chunks over the packed entry size (header plus content) so the estimate agrees with
/// the packer. `total_size` stays the raw content size of the candidates.
pub fn estimate_chunks(files: &[CandidateFile], max_chunk_size: u64) -> SizeEstimate {
    let mut estimate = estimate_sizes(files.iter().map(entry_size), max_chunk_size);
    estimate.total_size = files.iter().map(|f| f.size_bytes).sum();
    log::debug!(
        "Estimated {} chunks for {} files ({} bytes, chunk limit {} bytes)",
        estimate.estimated_chunk_count,
        files.len(),
        estimate.total_size,
        max_chunk_size
    );
    estimate
}

fn entry_size(file: &CandidateFile) -> u64 {
    entry_header(&file.relative_path).len() as u64 + file.size_bytes
}

/// Resolution chosen when the estimate exceeds the chunk threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetDecision {
    Proceed,
    FilterToSmallest,
    ExpandBudget { max_token_limit: u64 },
    AddBlacklist { patterns: Vec<String> },
    Abort,
}

/// What the policy sees when asked to decide.
#[derive(Debug, Clone, Copy)]
pub struct BudgetContext<'a> {
    pub estimate: &'a SizeEstimate,
    pub threshold: usize,
    pub max_token_limit: u64,
    pub candidates: &'a [CandidateFile],
}

pub trait BudgetPolicy {
    fn decide(&self, context: &BudgetContext<'_>) -> BudgetDecision;
}

impl<F> BudgetPolicy for F
where
    F: Fn(&BudgetContext<'_>) -> BudgetDecision,
{
    fn decide(&self, context: &BudgetContext<'_>) -> BudgetDecision {
        self(context)
    }
}

/// A fixed answer, for non-interactive runs.
impl BudgetPolicy for BudgetDecision {
    fn decide(&self, _context: &BudgetContext<'_>) -> BudgetDecision {
        self.clone()
    }
}

pub fn exceeds_threshold(estimate: &SizeEstimate, threshold: usize) -> bool {
    estimate.estimated_chunk_count > threshold
}

pub fn library_patterns() -> Result<PatternSet> {
    PatternSet::compile(&get_builtin_lists().library_blacklist)
}

/// Keeps the smallest non-library files, ascending by size, until the next one would push the
/// total past `budget_bytes`. The survivors are returned in their original order.
pub fn filter_to_smallest(
    files: &[CandidateFile],
    budget_bytes: u64,
    library: &PatternSet,
) -> Vec<CandidateFile> {
    let mut order: Vec<usize> = (0..files.len())
        .filter(|&i| !library.is_match(&files[i].relative_path))
        .collect();
    order.sort_by_key(|&i| files[i].size_bytes);

    let mut kept = HashSet::new();
    let mut total = 0u64;
    for i in order {
        let size = files[i].size_bytes;
        if total + size > budget_bytes {
            break;
        }
        total += size;
        kept.insert(i);
    }

    log::info!(
        "Kept {} of {} files ({} bytes) within the filtered budget of {} bytes",
        kept.len(),
        files.len(),
        total,
        budget_bytes
    );
    files
        .iter()
        .enumerate()
        .filter(|(i, _)| kept.contains(i))
        .map(|(_, f)| f.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{FileContent, OversizePolicy, PackLimits, pack_entries};
    use std::path::PathBuf;

    fn candidate(path: &str, size: u64) -> CandidateFile {
        CandidateFile {
            absolute_path: PathBuf::from(path),
            relative_path: path.to_string(),
            size_bytes: size,
            modified: None,
            importance: 0,
        }
    }

    #[test]
    fn empty_input_needs_no_chunks() {
        assert_eq!(estimate_sizes(Vec::new(), 100), SizeEstimate::default());
    }

    #[test]
    fn greedy_estimate_resets_on_overflow() {
        let estimate = estimate_sizes(vec![60, 60, 30, 100, 1], 100);
        assert_eq!(estimate.estimated_chunk_count, 4);
        assert_eq!(estimate.total_size, 251);
    }

    #[test]
    fn oversized_first_file_occupies_one_chunk() {
        assert_eq!(estimate_sizes(vec![250, 10], 100).estimated_chunk_count, 2);
        assert_eq!(estimate_sizes(vec![0, 0, 0], 100).estimated_chunk_count, 1);
    }

    #[test]
    fn threshold_is_strict() {
        let at = SizeEstimate {
            estimated_chunk_count: 10,
            total_size: 0,
        };
        let over = SizeEstimate {
            estimated_chunk_count: 11,
            total_size: 0,
        };
        assert!(!exceeds_threshold(&at, 10));
        assert!(exceeds_threshold(&over, 10));
    }

    #[test]
    fn chunk_estimate_matches_packer_on_same_order() {
        // Each entry is a 25-byte header plus 40 bytes of content; raw sizes alone would pair them.
        let paths = ["src/a.rs", "src/b.rs", "src/c.rs"];
        let content = "x".repeat(40);
        let candidates: Vec<CandidateFile> = paths.iter().map(|p| candidate(p, 40)).collect();
        let contents: Vec<FileContent> =
            paths.iter().map(|p| FileContent::new(*p, content.clone())).collect();

        let estimate = estimate_chunks(&candidates, 100);
        let limits = PackLimits {
            max_chunk_size: 100,
            max_file_size: 100,
            oversize: OversizePolicy::Skip,
        };
        let packed = pack_entries(&contents, limits).unwrap();

        assert_eq!(packed.chunks.len(), 3);
        assert_eq!(estimate.estimated_chunk_count, packed.chunks.len());
        assert_eq!(estimate.total_size, 120);

        let roomy = estimate_chunks(&candidates, 150);
        let roomy_limits = PackLimits {
            max_chunk_size: 150,
            ..limits
        };
        let packed = pack_entries(&contents, roomy_limits).unwrap();
        assert_eq!(roomy.estimated_chunk_count, packed.chunks.len());
        assert_eq!(roomy.estimated_chunk_count, 2);
    }

    #[test]
    fn smallest_filter_skips_libraries_and_keeps_order() {
        let files = vec![
            candidate("src/big.rs", 700),
            candidate("node_modules/pkg/tiny.js", 1),
            candidate("src/small.rs", 100),
            candidate("src/mid.rs", 300),
            candidate("README.md", 200),
        ];
        let library = library_patterns().unwrap();
        let kept = filter_to_smallest(&files, 650, &library);
        let paths: Vec<&str> = kept.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["src/small.rs", "src/mid.rs", "README.md"]);
    }

    #[test]
    fn fixed_decision_is_a_policy() {
        let estimate = SizeEstimate::default();
        let context = BudgetContext {
            estimate: &estimate,
            threshold: 10,
            max_token_limit: 50_000,
            candidates: &[],
        };
        assert_eq!(BudgetDecision::Abort.decide(&context), BudgetDecision::Abort);
        fn double(ctx: &BudgetContext<'_>) -> BudgetDecision {
            BudgetDecision::ExpandBudget {
                max_token_limit: ctx.max_token_limit * 2,
            }
        }
        assert_eq!(
            double.decide(&context),
            BudgetDecision::ExpandBudget { max_token_limit: 100_000 }
        );
    }
}
