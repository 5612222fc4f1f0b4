use crate::builtin::get_builtin_lists;
use crate::gather::CandidateFile;
use std::time::{Duration, SystemTime};

const KB: u64 = 1024;
const BASE_SCORE: i32 = 50;
const RECENT_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Heuristic importance in `[0, 100]`; higher means keep first when the budget is tight.
pub fn score_file(file: &CandidateFile, now: SystemTime) -> u8 {
    let mut score = BASE_SCORE;

    let size = file.size_bytes;
    if size < 10 * KB {
        score += 20;
    } else if size < 50 * KB {
        score += 10;
    } else if size > 500 * KB {
        score -= 20;
    }

    let path = file.relative_path.to_lowercase();
    if path.contains("src/") || path.contains("lib/") {
        score += 15;
    }
    if path.contains("test/") || path.contains("spec/") {
        score -= 10;
    }
    if path.contains("example/") || path.contains("demo/") {
        score -= 5;
    }

    if let Some(ext) = file.extension() {
        let lists = get_builtin_lists();
        if lists.is_main_code_extension(&ext) {
            score += 10;
        }
        if lists.is_config_extension(&ext) {
            score += 5;
        }
    }

    // An mtime ahead of `now` counts as recent.
    let recent = file
        .modified
        .is_some_and(|m| now.duration_since(m).map_or(true, |age| age <= RECENT_WINDOW));
    if recent {
        score += 10;
    }

    score.clamp(0, 100) as u8
}

pub fn score_candidates(files: &mut [CandidateFile], now: SystemTime) {
    for file in files.iter_mut() {
        file.importance = score_file(file, now);
        log::trace!("Scored {} = {}", file.relative_path, file.importance);
    }
}

/// Stable sort, highest importance first.
pub fn sort_by_importance(files: &mut [CandidateFile]) {
    files.sort_by(|a, b| b.importance.cmp(&a.importance));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidate(path: &str, size: u64, modified: Option<SystemTime>) -> CandidateFile {
        CandidateFile {
            absolute_path: PathBuf::from(path),
            relative_path: path.to_string(),
            size_bytes: size,
            modified,
            importance: 0,
        }
    }

    fn days_ago(now: SystemTime, days: u64) -> Option<SystemTime> {
        now.checked_sub(Duration::from_secs(days * 24 * 60 * 60))
    }

    #[test]
    fn small_recent_source_file_is_capped() {
        let now = SystemTime::now();
        let file = candidate("src/main.rs", 100, days_ago(now, 1));
        assert_eq!(score_file(&file, now), 100);
    }

    #[test]
    fn size_bands_apply_first_match_only() {
        let now = SystemTime::now();
        assert_eq!(score_file(&candidate("notes", 9 * KB, None), now), 70);
        assert_eq!(score_file(&candidate("notes", 20 * KB, None), now), 60);
        assert_eq!(score_file(&candidate("notes", 100 * KB, None), now), 50);
        assert_eq!(score_file(&candidate("notes", 600 * KB, None), now), 30);
    }

    #[test]
    fn path_adjustments_are_additive() {
        let now = SystemTime::now();
        let file = candidate("Lib/Test/demo/fixture", 100 * KB, None);
        assert_eq!(score_file(&file, now), 50 + 15 - 10 - 5);
    }

    #[test]
    fn config_extension_and_stale_mtime() {
        let now = SystemTime::now();
        let file = candidate("config.toml", 100 * KB, days_ago(now, 30));
        assert_eq!(score_file(&file, now), 55);
    }

    #[test]
    fn future_mtime_counts_as_recent() {
        let now = SystemTime::now();
        let tomorrow = now.checked_add(Duration::from_secs(24 * 60 * 60));
        let file = candidate("notes", 100 * KB, tomorrow);
        assert_eq!(score_file(&file, now), 60);
        assert_eq!(score_file(&candidate("notes", 100 * KB, None), now), 50);
    }

    #[test]
    fn large_test_file_never_goes_negative() {
        let now = SystemTime::now();
        let file = candidate("spec/test/example/huge.bin", 10_000 * KB, None);
        assert_eq!(score_file(&file, now), 15);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let now = SystemTime::now();
        let mut files = vec![
            candidate("a.txt", 100 * KB, None),
            candidate("src/b.rs", 100, None),
            candidate("c.txt", 100 * KB, None),
        ];
        score_candidates(&mut files, now);
        sort_by_importance(&mut files);
        let order: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(order, vec!["src/b.rs", "a.txt", "c.txt"]);
    }
}
