//! The ignore document: `global:`, `whitelist:`, `blacklist:` and `settings:` sections.

use crate::builtin::get_builtin_lists;
use crate::chunking::OversizePolicy;
use crate::error::{AppError, Result};
use crate::glob::{Pattern, PatternSet, is_wildcard_free};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use indexmap::IndexMap;
use log;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_RULES_FILENAME: &str = ".xflatignore";
pub const GITIGNORE_FILENAME: &str = ".gitignore";

pub const DEFAULT_RULE_DOCUMENT: &str = "\
# xflat rule document
#
# Lines starting with '#' are comments. Section headers switch the active list.
# Patterns use '*' (within one directory), '**' (any depth) and '?' (one character).
# A pattern without '/' matches at any depth. A bare directory name is expanded to 'dir/**'.

global:
# Always excluded, even when whitelisted.
.env

whitelist:
# When non-empty, only matching files are flattened.

blacklist:
# Excluded after the whitelist check.
*.min.js
*.lock
package-lock.json

settings:
maxTokenLimit: 50000
maxTokensPerFile: 10000
useGitIgnore: true
maxConcurrentFiles: 4
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Global,
    Whitelist,
    Blacklist,
    Settings,
}

impl Section {
    pub fn from_header(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "global:" => Some(Section::Global),
            "whitelist:" => Some(Section::Whitelist),
            "blacklist:" => Some(Section::Blacklist),
            "settings:" => Some(Section::Settings),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Number(f64),
    Text(String),
}

impl SettingValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => SettingValue::Number(n),
            _ => SettingValue::Text(trimmed.trim_matches(['"', '\'']).to_string()),
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SettingValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u64),
            SettingValue::Number(_) => None,
            SettingValue::Text(s) => s.parse().ok(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Number(n) => Some(*n != 0.0),
            SettingValue::Text(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Some(true),
                "false" | "no" | "off" => Some(false),
                _ => None,
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            SettingValue::Number(_) => None,
        }
    }
}

/// `settings:` entries in document order. Keys are looked up case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSettings {
    values: IndexMap<String, SettingValue>,
}

impl RuleSettings {
    pub fn insert(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_token_limit(&self) -> Option<u64> {
        self.get_u64("maxTokenLimit")
    }

    pub fn max_tokens_per_file(&self) -> Option<u64> {
        self.get_u64("maxTokensPerFile")
    }

    pub fn max_concurrent_files(&self) -> Option<usize> {
        self.get_u64("maxConcurrentFiles")
            .and_then(|n| usize::try_from(n).ok())
    }

    pub fn use_gitignore(&self) -> Option<bool> {
        self.get("useGitIgnore").and_then(SettingValue::as_bool)
    }

    pub fn sort_by_importance(&self) -> Option<bool> {
        self.get("sortByImportance").and_then(SettingValue::as_bool)
    }

    pub fn oversized_files(&self) -> Option<OversizePolicy> {
        let raw = self.get("oversizedFiles")?.as_text()?;
        match raw.parse() {
            Ok(policy) => Some(policy),
            Err(e) => {
                log::warn!("Ignoring setting oversizedFiles: {}", e);
                None
            }
        }
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        let value = self.get(key)?;
        let parsed = value.as_u64();
        if parsed.is_none() {
            log::warn!("Setting {} has a non-numeric value {:?}, ignoring it", key, value);
        }
        parsed
    }
}

/// Parsed (not yet compiled) rule document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub global_ignore: Vec<String>,
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    pub settings: RuleSettings,
    /// Document the rules came from, when one was read.
    pub source: Option<PathBuf>,
    /// Non-fatal problems met while loading.
    pub warnings: Vec<String>,
    /// The project's `.gitignore`, when folded in.
    pub gitignore: Option<GitignoreSource>,
}

/// Root-level `.gitignore` lines, matched with git semantics at compile time.
#[derive(Debug, Clone, PartialEq)]
pub struct GitignoreSource {
    pub root: PathBuf,
    pub lines: Vec<String>,
}

impl GitignoreSource {
    pub fn build(&self) -> Result<Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.root);
        for line in &self.lines {
            builder.add_line(None, line)?;
        }
        Ok(builder.build()?)
    }
}

impl RuleSet {
    fn list_mut(&mut self, section: Section) -> Option<&mut Vec<String>> {
        match section {
            Section::Global => Some(&mut self.global_ignore),
            Section::Whitelist => Some(&mut self.whitelist),
            Section::Blacklist => Some(&mut self.blacklist),
            Section::Settings => None,
        }
    }

    pub fn add_global_ignores<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_unique(&mut self.global_ignore, patterns);
    }

    /// Ignores directories with the given names at any depth.
    pub fn add_ignored_dir_names<S: AsRef<str>>(&mut self, names: &[S]) {
        let patterns = names
            .iter()
            .map(|n| n.as_ref().trim().trim_matches('/').to_string())
            .filter(|n| !n.is_empty())
            .map(|n| format!("**/{}/**", n));
        push_unique(&mut self.global_ignore, patterns);
    }

    /// Reads the project's `.gitignore` so that it applies next to the global ignore list.
    /// Lines git would reject are dropped with a warning.
    pub fn fold_gitignore(&mut self, project_root: &Path) {
        let path = project_root.join(GITIGNORE_FILENAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No {} at {}", GITIGNORE_FILENAME, path.display());
                return;
            }
            Err(e) => {
                log::warn!("Could not read {}: {}", path.display(), e);
                self.warnings
                    .push(format!("Could not read {}: {}", path.display(), e));
                return;
            }
        };

        let mut validator = GitignoreBuilder::new(project_root);
        let mut lines = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            match validator.add_line(None, line) {
                Ok(_) => lines.push(line.to_string()),
                Err(e) => {
                    log::warn!("Skipping {} line {}: {}", GITIGNORE_FILENAME, idx + 1, e);
                    self.warnings
                        .push(format!("Skipping {} line {}: {}", GITIGNORE_FILENAME, idx + 1, e));
                }
            }
        }
        log::debug!("Loaded {} lines from {}", lines.len(), path.display());
        self.gitignore = Some(GitignoreSource {
            root: project_root.to_path_buf(),
            lines,
        });
    }

    pub fn compile(&self) -> Result<CompiledRules> {
        Ok(CompiledRules {
            global_ignore: PatternSet::compile(&self.global_ignore)?,
            whitelist: PatternSet::compile(&self.whitelist)?,
            blacklist: PatternSet::compile(&self.blacklist)?,
            gitignore: self.gitignore.as_ref().map(GitignoreSource::build).transpose()?,
        })
    }
}

fn push_unique<I, S>(target: &mut Vec<String>, patterns: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for p in patterns {
        let p = p.into();
        if !target.contains(&p) {
            target.push(p);
        }
    }
}

/// Parses a rule document. Never fails: unusable lines are logged and skipped.
pub fn parse_rule_document(text: &str, project_root: &Path) -> RuleSet {
    let mut rules = RuleSet::default();
    let mut section: Option<Section> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(next) = Section::from_header(line) {
            log::trace!("Rule document line {}: entering {:?}", idx + 1, next);
            section = Some(next);
            continue;
        }
        match section {
            None => {
                log::debug!(
                    "Rule document line {} is outside any section, ignoring: {}",
                    idx + 1,
                    line
                );
            }
            Some(Section::Settings) => match line.split_once(':') {
                Some((key, value)) if !key.trim().is_empty() => {
                    rules.settings.insert(key.trim(), SettingValue::parse(value));
                }
                _ => {
                    log::warn!("Malformed setting on line {}: {}", idx + 1, line);
                    rules
                        .warnings
                        .push(format!("Malformed setting on line {}: {}", idx + 1, line));
                }
            },
            Some(list_section) => {
                if let Some(list) = rules.list_mut(list_section) {
                    list.push(line.to_string());
                }
            }
        }
    }

    for list in [
        &mut rules.global_ignore,
        &mut rules.whitelist,
        &mut rules.blacklist,
    ] {
        for pattern in list.iter_mut() {
            let expanded = expand_directory_pattern(pattern, project_root);
            if expanded != *pattern {
                log::trace!("Expanded directory pattern {} -> {}", pattern, expanded);
                *pattern = expanded;
            }
        }
    }

    let builtin = get_builtin_lists();
    push_unique(&mut rules.global_ignore, builtin.global_ignore.iter().cloned());
    push_unique(&mut rules.blacklist, builtin.library_blacklist.iter().cloned());

    log::debug!(
        "Parsed rules: {} global, {} whitelist, {} blacklist, {} settings",
        rules.global_ignore.len(),
        rules.whitelist.len(),
        rules.blacklist.len(),
        rules.settings.iter().count()
    );
    rules
}

/// `dir/` and wildcard-free names of existing directories become `dir/**`.
pub fn expand_directory_pattern(pattern: &str, project_root: &Path) -> String {
    if let Some(stripped) = pattern.strip_suffix('/') {
        if !stripped.trim_start_matches('/').is_empty() {
            return format!("{}/**", stripped);
        }
    }
    if is_wildcard_free(pattern) {
        let relative = pattern.trim_start_matches('/');
        if !relative.is_empty() && project_root.join(relative).is_dir() {
            return format!("{}/**", pattern);
        }
    }
    pattern.to_string()
}

/// Loads the rule document, falling back to built-in defaults when it is missing or unreadable.
///
/// `.gitignore` is folded in when `use_gitignore_override` says so, else when the document's
/// `useGitIgnore` setting does, else per `default_use_gitignore`.
pub fn load_rule_set(
    project_root: &Path,
    document_path: Option<&Path>,
    use_gitignore_override: Option<bool>,
    default_use_gitignore: bool,
) -> RuleSet {
    let path = document_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_root.join(DEFAULT_RULES_FILENAME));

    let mut rules = match fs::read_to_string(&path) {
        Ok(text) => {
            log::info!("Loading rule document from: {}", path.display());
            let mut rules = parse_rule_document(&text, project_root);
            rules.source = Some(path.clone());
            rules
        }
        Err(e) => {
            let message = if e.kind() == ErrorKind::NotFound {
                format!(
                    "No rule document at {}; using built-in defaults",
                    path.display()
                )
            } else {
                format!(
                    "Could not read rule document {}: {}; using built-in defaults",
                    path.display(),
                    e
                )
            };
            if e.kind() == ErrorKind::NotFound {
                log::info!("{}", message);
            } else {
                log::warn!("{}", message);
            }
            let mut rules = parse_rule_document("", project_root);
            rules.warnings.push(message);
            rules
        }
    };

    let use_gitignore = use_gitignore_override
        .or_else(|| rules.settings.use_gitignore())
        .unwrap_or(default_use_gitignore);
    if use_gitignore {
        rules.fold_gitignore(project_root);
    }
    rules
}

/// Adds patterns to the document's `blacklist:` section, creating the file or section if
/// needed. Returns the patterns that were actually added.
pub fn append_blacklist_patterns(document_path: &Path, patterns: &[String]) -> Result<Vec<String>> {
    let text = match fs::read_to_string(document_path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(AppError::FileRead {
                path: document_path.to_path_buf(),
                source: e,
            });
        }
    };
    let mut lines: Vec<String> = text.lines().map(String::from).collect();

    let header = lines
        .iter()
        .position(|l| Section::from_header(l) == Some(Section::Blacklist));

    let section_end = header.map(|h| {
        lines[h + 1..]
            .iter()
            .position(|l| Section::from_header(l).is_some())
            .map_or(lines.len(), |offset| h + 1 + offset)
    });

    let existing: Vec<String> = match (header, section_end) {
        (Some(h), Some(end)) => lines[h + 1..end].iter().map(|l| l.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    let mut added: Vec<String> = Vec::new();
    for p in patterns {
        let p = p.trim();
        if !p.is_empty() && !existing.iter().any(|e| e == p) && !added.iter().any(|a| a == p) {
            added.push(p.to_string());
        }
    }
    if added.is_empty() {
        log::debug!("All blacklist patterns already present in {}", document_path.display());
        return Ok(added);
    }

    match (header, section_end) {
        (Some(h), Some(end)) => {
            let mut insert_at = end;
            while insert_at > h + 1 && lines[insert_at - 1].trim().is_empty() {
                insert_at -= 1;
            }
            for (offset, p) in added.iter().enumerate() {
                lines.insert(insert_at + offset, p.clone());
            }
        }
        _ => {
            if lines.last().is_some_and(|l| !l.trim().is_empty()) {
                lines.push(String::new());
            }
            lines.push("blacklist:".to_string());
            lines.extend(added.iter().cloned());
        }
    }

    let mut output = lines.join("\n");
    output.push('\n');
    fs::write(document_path, output).map_err(|e| AppError::FileWrite {
        path: document_path.to_path_buf(),
        source: e,
    })?;
    log::info!(
        "Added {} blacklist pattern(s) to {}",
        added.len(),
        document_path.display()
    );
    Ok(added)
}

/// Outcome of testing a file path against the compiled rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<'a> {
    Included,
    GlobalIgnored(&'a Pattern),
    GitIgnored,
    NotWhitelisted,
    Blacklisted(&'a Pattern),
}

#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    pub global_ignore: PatternSet,
    pub whitelist: PatternSet,
    pub blacklist: PatternSet,
    pub gitignore: Option<Gitignore>,
}

impl CompiledRules {
    pub fn file_verdict(&self, relative_path: &str) -> Verdict<'_> {
        if let Some(p) = self.global_ignore.first_match(relative_path) {
            return Verdict::GlobalIgnored(p);
        }
        if self.is_gitignored(relative_path, false) {
            return Verdict::GitIgnored;
        }
        if !self.whitelist.is_empty() && !self.whitelist.is_match(relative_path) {
            return Verdict::NotWhitelisted;
        }
        if let Some(p) = self.blacklist.first_match(relative_path) {
            return Verdict::Blacklisted(p);
        }
        Verdict::Included
    }

    pub fn is_file_included(&self, relative_path: &str) -> bool {
        self.file_verdict(relative_path) == Verdict::Included
    }

    pub fn should_prune_dir(&self, relative_dir: &str) -> bool {
        self.global_ignore.is_dir_match(relative_dir)
            || self.is_gitignored(relative_dir, true)
            || self.blacklist.is_dir_match(relative_dir)
    }

    /// Git's answer for a project-relative path, negations included.
    pub fn is_gitignored(&self, relative_path: &str, is_dir: bool) -> bool {
        match &self.gitignore {
            Some(gitignore) if !relative_path.is_empty() => gitignore
                .matched_path_or_any_parents(relative_path, is_dir)
                .is_ignore(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn user_patterns(list: &[String]) -> Vec<&str> {
        let builtin = get_builtin_lists();
        list.iter()
            .filter(|p| {
                !builtin.library_blacklist.contains(p) && !builtin.global_ignore.contains(p)
            })
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn parses_sections_comments_and_settings() {
        let doc = "\
# comment
GLOBAL:
node_modules/**

Whitelist:
  src/**
blacklist:
*.min.js
settings:
maxTokenLimit: 64000
useGitIgnore: false
profile: large
";
        let rules = parse_rule_document(doc, Path::new("/nonexistent-root"));
        assert_eq!(user_patterns(&rules.global_ignore), vec!["node_modules/**"]);
        assert_eq!(rules.whitelist, vec!["src/**"]);
        assert_eq!(user_patterns(&rules.blacklist), vec!["*.min.js"]);
        assert_eq!(rules.settings.max_token_limit(), Some(64000));
        assert_eq!(rules.settings.use_gitignore(), Some(false));
        assert_eq!(
            rules.settings.get("profile"),
            Some(&SettingValue::Text("large".to_string()))
        );
        assert_eq!(
            rules.settings.get("MAXTOKENLIMIT"),
            Some(&SettingValue::Number(64000.0))
        );
    }

    #[test]
    fn lines_before_any_section_are_ignored() {
        let rules = parse_rule_document("stray\nblacklist:\n*.log\n", Path::new("/x"));
        assert_eq!(user_patterns(&rules.blacklist), vec!["*.log"]);
        assert_eq!(user_patterns(&rules.global_ignore), Vec::<&str>::new());
    }

    #[test]
    fn malformed_setting_is_recorded_as_warning() {
        let rules = parse_rule_document("settings:\njust-a-word\n", Path::new("/x"));
        assert!(rules.settings.is_empty());
        assert_eq!(rules.warnings.len(), 1);
    }

    #[test]
    fn existing_directory_names_expand_to_recursive_patterns() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("generated/deep")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let doc = "global:\ngenerated\nnotes.txt\nmissing_dir\nlogs/\n*.tmp\n";
        let rules = parse_rule_document(doc, dir.path());
        assert_eq!(
            user_patterns(&rules.global_ignore),
            vec!["generated/**", "notes.txt", "missing_dir", "logs/**", "*.tmp"]
        );

        let compiled = rules.compile().unwrap();
        assert!(compiled.global_ignore.is_match("generated/deep/a.rs"));
        assert!(!compiled.global_ignore.is_match("generated-other/a.rs"));
    }

    #[test]
    fn builtin_library_patterns_always_blacklisted() {
        let rules = parse_rule_document("blacklist:\n", Path::new("/x"));
        let compiled = rules.compile().unwrap();
        assert!(compiled.blacklist.is_match("node_modules/pkg/index.js"));
        assert!(compiled.blacklist.is_match("web/node_modules/pkg/index.js"));
        assert!(compiled.should_prune_dir(".git"));
        assert!(compiled.global_ignore.is_match(".xtools/xflat/output/a.txt"));
    }

    #[test]
    fn global_ignore_beats_whitelist() {
        let rules = parse_rule_document(
            "global:\nsrc/secret.rs\nwhitelist:\nsrc/**\n",
            Path::new("/x"),
        );
        let compiled = rules.compile().unwrap();
        assert!(matches!(
            compiled.file_verdict("src/secret.rs"),
            Verdict::GlobalIgnored(_)
        ));
        assert_eq!(compiled.file_verdict("src/lib.rs"), Verdict::Included);
        assert_eq!(compiled.file_verdict("docs/a.md"), Verdict::NotWhitelisted);
    }

    #[test]
    fn setting_values_coerce_numbers() {
        assert_eq!(SettingValue::parse(" 42 "), SettingValue::Number(42.0));
        assert_eq!(SettingValue::parse("4.5").as_u64(), None);
        assert_eq!(
            SettingValue::parse("\"skip\""),
            SettingValue::Text("skip".to_string())
        );
        assert_eq!(SettingValue::parse("yes").as_bool(), Some(true));
        assert_eq!(SettingValue::parse("0").as_bool(), Some(false));
    }

    #[test]
    fn oversized_setting_parses_policy() {
        let rules = parse_rule_document("settings:\noversizedFiles: truncate\n", Path::new("/x"));
        assert_eq!(rules.settings.oversized_files(), Some(OversizePolicy::Truncate));
    }

    #[test]
    fn load_falls_back_to_defaults_and_reads_gitignore() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\n/private/\n").unwrap();

        let rules = load_rule_set(dir.path(), None, None, true);
        assert!(rules.source.is_none());
        assert_eq!(rules.warnings.len(), 1);
        let compiled = rules.compile().unwrap();
        assert_eq!(compiled.file_verdict("deep/debug.log"), Verdict::GitIgnored);
        assert!(compiled.is_gitignored("private/key.pem", false));
        assert!(compiled.should_prune_dir("private"));
        assert!(!compiled.is_gitignored("sub/private/key.pem", false));

        let without_git = load_rule_set(dir.path(), None, None, false).compile().unwrap();
        assert!(without_git.gitignore.is_none());
        assert_eq!(without_git.file_verdict("deep/debug.log"), Verdict::Included);
    }

    #[test]
    fn gitignore_follows_git_semantics() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(".gitignore"),
            "*.py[co]\n*.log\n!keep.log\ngenerated/\n",
        )
        .unwrap();

        let compiled = load_rule_set(dir.path(), None, None, true).compile().unwrap();
        assert!(compiled.is_gitignored("a.pyc", false));
        assert!(compiled.is_gitignored("pkg/b.pyo", false));
        assert!(!compiled.is_gitignored("c.py", false));
        assert!(compiled.is_gitignored("debug.log", false));
        assert!(!compiled.is_gitignored("keep.log", false));
        assert_eq!(compiled.file_verdict("keep.log"), Verdict::Included);
        assert!(compiled.is_gitignored("generated/out.rs", false));
        assert!(!compiled.is_gitignored("generated", false));
        assert!(compiled.should_prune_dir("generated"));
    }

    #[test]
    fn unparsable_gitignore_line_is_dropped_with_warning() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\nbad[\n").unwrap();

        let rules = load_rule_set(dir.path(), None, None, true);
        let source = rules.gitignore.as_ref().unwrap();
        assert_eq!(source.lines, vec!["*.log".to_string()]);
        assert!(rules.warnings.iter().any(|w| w.contains("line 2")));
        assert!(rules.compile().unwrap().is_gitignored("x.log", false));
    }

    #[test]
    fn document_setting_overrides_gitignore_default() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        fs::write(
            dir.path().join(DEFAULT_RULES_FILENAME),
            "settings:\nuseGitIgnore: false\n",
        )
        .unwrap();
        let rules = load_rule_set(dir.path(), None, None, true);
        assert!(rules.source.is_some());
        assert!(!rules.compile().unwrap().is_gitignored("a.log", false));

        let forced = load_rule_set(dir.path(), None, Some(true), false);
        assert!(forced.compile().unwrap().is_gitignored("a.log", false));
    }

    #[test]
    fn append_blacklist_inserts_into_existing_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_RULES_FILENAME);
        fs::write(&path, "blacklist:\n*.min.js\n\nsettings:\nmaxTokenLimit: 10\n").unwrap();

        let added = append_blacklist_patterns(
            &path,
            &["*.min.js".to_string(), "fixtures/**".to_string()],
        )
        .unwrap();
        assert_eq!(added, vec!["fixtures/**".to_string()]);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "blacklist:\n*.min.js\nfixtures/**\n\nsettings:\nmaxTokenLimit: 10\n"
        );
        let reparsed = parse_rule_document(&text, dir.path());
        assert_eq!(reparsed.settings.max_token_limit(), Some(10));
    }

    #[test]
    fn append_blacklist_creates_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_RULES_FILENAME);
        let added = append_blacklist_patterns(&path, &["big/**".to_string()]).unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "blacklist:\nbig/**\n");
    }

    #[test]
    fn default_document_parses() {
        let rules = parse_rule_document(DEFAULT_RULE_DOCUMENT, Path::new("/x"));
        assert_eq!(rules.settings.max_token_limit(), Some(50000));
        assert_eq!(rules.settings.max_concurrent_files(), Some(4));
        assert!(rules.warnings.is_empty());
    }
}
