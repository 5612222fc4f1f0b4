use crate::builtin::contains_extension;
use crate::error::Result;
use crate::glob::normalize_path;
use crate::progress::CancellationToken;
use crate::rules::{CompiledRules, Verdict};
use log;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateFile {
    #[serde(skip)]
    pub absolute_path: PathBuf,
    pub relative_path: String,
    pub size_bytes: u64,
    #[serde(skip)]
    pub modified: Option<SystemTime>,
    /// Filled in by `scoring::score_candidates`.
    pub importance: u8,
}

impl CandidateFile {
    /// Dotted extension of the file name (`.rs`), if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.relative_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectOutcome {
    pub files: Vec<CandidateFile>,
    /// Directories or entries that could not be read, with the reason.
    pub unreadable: Vec<(String, String)>,
    pub pruned_dirs: usize,
}

/// Walks `project_root` depth-first in filesystem order and returns the files that pass every rule.
pub fn collect_candidates(
    project_root: &Path,
    rules: &CompiledRules,
    include_extensions: &[String],
    cancel: &CancellationToken,
) -> Result<CollectOutcome> {
    log::info!("Walking project directory: {}", project_root.display());
    let mut outcome = CollectOutcome::default();
    let mut pruned_dirs = 0usize;

    let walker = WalkDir::new(project_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let relative = relative_path_of(entry.path(), project_root);
            if rules.should_prune_dir(&relative) {
                log::trace!("Pruning directory: {}", relative);
                pruned_dirs += 1;
                return false;
            }
            true
        });

    for entry_result in walker {
        cancel.check()?;
        let entry: DirEntry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                let location = e
                    .path()
                    .map(|p| relative_path_of(p, project_root))
                    .unwrap_or_else(|| "<unknown>".to_string());
                log::warn!("Skipping unreadable entry {}: {}", location, e);
                outcome.unreadable.push((location, e.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_path_of(entry.path(), project_root);
        match rules.file_verdict(&relative) {
            Verdict::Included => {}
            Verdict::GlobalIgnored(p) => {
                log::trace!("Globally ignored by {}: {}", p.as_str(), relative);
                continue;
            }
            Verdict::GitIgnored => {
                log::trace!("Ignored by .gitignore: {}", relative);
                continue;
            }
            Verdict::NotWhitelisted => {
                log::trace!("Not whitelisted: {}", relative);
                continue;
            }
            Verdict::Blacklisted(p) => {
                log::trace!("Blacklisted by {}: {}", p.as_str(), relative);
                continue;
            }
        }
        if !has_included_extension(&relative, include_extensions) {
            log::trace!("Extension not included: {}", relative);
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => {
                log::trace!("Candidate: {}", relative);
                outcome.files.push(CandidateFile {
                    absolute_path: entry.path().to_path_buf(),
                    relative_path: relative,
                    size_bytes: metadata.len(),
                    modified: metadata.modified().ok(),
                    importance: 0,
                });
            }
            Err(e) => {
                log::warn!("Could not stat {}: {}", relative, e);
                outcome.unreadable.push((relative, e.to_string()));
            }
        }
    }

    outcome.pruned_dirs = pruned_dirs;
    log::info!(
        "Collection complete: {} candidates, {} pruned directories, {} unreadable entries",
        outcome.files.len(),
        outcome.pruned_dirs,
        outcome.unreadable.len()
    );
    Ok(outcome)
}

fn relative_path_of(path: &Path, project_root: &Path) -> String {
    let relative = pathdiff::diff_paths(path, project_root).unwrap_or_else(|| path.to_path_buf());
    normalize_path(&relative)
}

/// An empty extension list admits every file.
fn has_included_extension(relative_path: &str, include_extensions: &[String]) -> bool {
    if include_extensions.is_empty() {
        return true;
    }
    Path::new(relative_path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| contains_extension(include_extensions, &format!(".{}", ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::parse_rule_document;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, bytes: usize) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x".repeat(bytes)).unwrap();
    }

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn collect(root: &Path, doc: &str, extensions: &[&str]) -> Vec<String> {
        let rules = parse_rule_document(doc, root).compile().unwrap();
        let mut paths: Vec<String> =
            collect_candidates(root, &rules, &exts(extensions), &CancellationToken::new())
                .unwrap()
                .files
                .into_iter()
                .map(|f| f.relative_path)
                .collect();
        paths.sort();
        paths
    }

    #[test]
    fn global_ignore_and_blacklist_filter_candidates() {
        let dir = tempdir().unwrap();
        write(dir.path(), "node_modules/x.js", 500);
        write(dir.path(), "src/a.js", 500);
        write(dir.path(), "src/a.min.js", 500);

        let doc = "global:\nnode_modules/**\nblacklist:\n*.min.js\n";
        assert_eq!(collect(dir.path(), doc, &[".js"]), vec!["src/a.js"]);
    }

    #[test]
    fn whitelist_restricts_and_cannot_override_global() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/keep.rs", 10);
        write(dir.path(), "src/secret.rs", 10);
        write(dir.path(), "docs/guide.rs", 10);

        let doc = "global:\n**/secret.rs\nwhitelist:\nsrc/**\n";
        assert_eq!(collect(dir.path(), doc, &[".rs"]), vec!["src/keep.rs"]);
    }

    #[test]
    fn extension_filter_applies_independently_of_whitelist() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/main.rs", 10);
        write(dir.path(), "src/logo.svg", 10);
        write(dir.path(), "README.MD", 10);

        let doc = "whitelist:\nsrc/**\n";
        assert_eq!(collect(dir.path(), doc, &[".rs", ".md"]), vec!["src/main.rs"]);
        assert_eq!(collect(dir.path(), "", &[".rs", ".md"]), vec!["README.MD", "src/main.rs"]);
        assert_eq!(
            collect(dir.path(), "", &[]),
            vec!["README.MD", "src/logo.svg", "src/main.rs"]
        );
    }

    #[test]
    fn pruned_directories_are_counted_and_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "generated/a.rs", 10);
        write(dir.path(), "generated/deep/b.rs", 10);
        write(dir.path(), "lib.rs", 10);

        let rules = parse_rule_document("blacklist:\ngenerated\n", dir.path())
            .compile()
            .unwrap();
        let outcome =
            collect_candidates(dir.path(), &rules, &exts(&[".rs"]), &CancellationToken::new())
                .unwrap();
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].relative_path, "lib.rs");
        assert_eq!(outcome.files[0].size_bytes, 10);
        assert_eq!(outcome.pruned_dirs, 1);
    }

    #[test]
    fn gitignore_negation_and_classes_apply_during_walk() {
        let dir = tempdir().unwrap();
        write(dir.path(), "app.pyc", 10);
        write(dir.path(), "app.py", 10);
        write(dir.path(), "debug.log", 10);
        write(dir.path(), "keep.log", 10);
        write(dir.path(), "scratch/notes.py", 10);
        fs::write(
            dir.path().join(".gitignore"),
            "*.py[co]\n*.log\n!keep.log\nscratch/\n",
        )
        .unwrap();

        let rules = crate::rules::load_rule_set(dir.path(), None, None, true)
            .compile()
            .unwrap();
        let outcome = collect_candidates(
            dir.path(),
            &rules,
            &exts(&[".py", ".pyc", ".log"]),
            &CancellationToken::new(),
        )
        .unwrap();
        let mut paths: Vec<String> = outcome.files.into_iter().map(|f| f.relative_path).collect();
        paths.sort();
        assert_eq!(paths, vec!["app.py", "keep.log"]);
        assert_eq!(outcome.pruned_dirs, 1);
    }

    #[test]
    fn cancelled_collection_returns_error() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.rs", 1);
        let rules = CompiledRules::default();
        let token = CancellationToken::new();
        token.cancel();
        let result = collect_candidates(dir.path(), &rules, &[], &token);
        assert!(matches!(result, Err(crate::error::AppError::Cancelled)));
    }

    #[test]
    fn candidate_extension_is_dotted() {
        let file = CandidateFile {
            absolute_path: PathBuf::from("/r/src/x.tar.gz"),
            relative_path: "src/x.tar.gz".to_string(),
            size_bytes: 0,
            modified: None,
            importance: 0,
        };
        assert_eq!(file.extension().as_deref(), Some(".gz"));
    }
}
