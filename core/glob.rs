//! Glob patterns compiled to anchored regular expressions.
//!
//! Supported wildcards are `*` (anything but `/`), `**` (anything, `/` included)
//! and `?` (one character other than `/`). Every other character is literal.
//! A pattern without a `/` matches at any depth, a leading `/` anchors it to the
//! project root.

use crate::error::Result;
use log;
use regex::Regex;
use std::fmt;
use std::path::Path;

#[derive(Clone)]
pub struct Pattern {
    source: String,
    matcher: Option<Regex>,
}

impl Pattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        let body = trimmed.trim_start_matches('/');
        if body.is_empty() {
            log::trace!("Empty glob pattern {:?} will match nothing", pattern);
            return Ok(Self {
                source: trimmed.to_string(),
                matcher: None,
            });
        }
        let regex_src = glob_to_regex(trimmed);
        log::trace!("Compiled glob {:?} as /{}/", trimmed, regex_src);
        Ok(Self {
            source: trimmed.to_string(),
            matcher: Some(Regex::new(&regex_src)?),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Tests a forward-slash relative path against the whole pattern.
    pub fn is_match(&self, relative_path: &str) -> bool {
        self.matcher
            .as_ref()
            .is_some_and(|re| re.is_match(relative_path))
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Translates a glob into an anchored regular expression source string.
pub fn glob_to_regex(pattern: &str) -> String {
    let (body, anchored) = match pattern.strip_prefix('/') {
        Some(rest) => (rest, true),
        None => (pattern, pattern.contains('/')),
    };

    let mut out = String::with_capacity(body.len() * 2 + 12);
    out.push('^');
    if !anchored {
        out.push_str("(?:.*/)?");
    }

    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    // zero or more leading directories
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }
    out.push('$');
    out
}

/// True when the pattern has no `*` or `?`.
pub fn is_wildcard_free(pattern: &str) -> bool {
    !pattern.contains(['*', '?'])
}

/// Relative path as a forward-slash string, the form every matcher expects.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Compiled patterns for one rule role (global ignore, whitelist or blacklist).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut set = Self::new();
        for p in patterns {
            set.push(Pattern::compile(p.as_ref())?);
        }
        Ok(set)
    }

    pub fn push(&mut self, pattern: Pattern) {
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn is_match(&self, relative_path: &str) -> bool {
        self.first_match(relative_path).is_some()
    }

    pub fn first_match(&self, relative_path: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.is_match(relative_path))
    }

    /// Directory test: the path itself or the path with a trailing `/`, so `dir/**` prunes `dir`.
    pub fn is_dir_match(&self, relative_dir: &str) -> bool {
        self.is_match(relative_dir) || self.is_match(&format!("{}/", relative_dir))
    }
}
