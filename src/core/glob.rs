//! `applyTo` glob patterns.
//!
//! Patterns compile once, at load time, into [`glob::Pattern`]s. `{a,b}`
//! alternations expand to one pattern per branch and `\x` escapes become
//! `[x]` classes before compiling. A pattern without `/` is also tried
//! against the last path component, so `*.py` matches `src/app/main.py` the
//! same way `**/*.py` does.
//!
//! File paths match case-sensitively. Scenario and framework tokens do not.

use crate::core::error::ResolverError;
use glob::{MatchOptions, Pattern};
use serde::{Serialize, Serializer};

const PATH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

const TOKEN_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    ..PATH_OPTIONS
};

#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    branches: Vec<Pattern>,
    basename_only: bool,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, ResolverError> {
        let source = pattern.trim().to_string();
        if source.is_empty() {
            return Err(ResolverError::pattern(pattern, "empty pattern"));
        }
        let stripped = strip_dot_prefix(&source);
        let branches = expand_braces(stripped)
            .map_err(|msg| ResolverError::pattern(pattern, msg))?
            .iter()
            .map(|branch| {
                let translated = translate_escapes(branch)
                    .map_err(|msg| ResolverError::pattern(pattern, msg))?;
                Pattern::new(&translated).map_err(|e| ResolverError::pattern(pattern, e.msg))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            basename_only: !stripped.contains('/'),
            source,
            branches,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a file path. Falls back to the basename for slash-free patterns.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = normalize_path(candidate);
        if self.matches_with(&candidate, PATH_OPTIONS) {
            return true;
        }
        if self.basename_only
            && let Some((_, name)) = candidate.rsplit_once('/')
        {
            return self.matches_with(name, PATH_OPTIONS);
        }
        false
    }

    /// Match a scenario or framework name, ignoring case.
    pub fn matches_token(&self, token: &str) -> bool {
        self.matches_with(token.trim(), TOKEN_OPTIONS)
    }

    fn matches_with(&self, candidate: &str, options: MatchOptions) -> bool {
        self.branches
            .iter()
            .any(|p| p.matches_with(candidate, options))
    }
}

/// A comma-separated list of patterns, as written in an `applyTo` field.
#[derive(Debug, Clone)]
pub struct ApplyTo {
    patterns: Vec<GlobPattern>,
}

impl ApplyTo {
    pub fn parse(spec: &str) -> Result<Self, ResolverError> {
        Self::from_patterns(split_patterns(spec))
    }

    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, ResolverError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| GlobPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if patterns.is_empty() {
            return Err(ResolverError::pattern("", "applyTo has no patterns"));
        }
        Ok(Self { patterns })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn matches_token(&self, token: &str) -> bool {
        self.patterns.iter().any(|p| p.matches_token(token))
    }

    pub fn display(&self) -> String {
        self.patterns
            .iter()
            .map(GlobPattern::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Serialize for ApplyTo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display())
    }
}

/// Split on commas that are not inside `{...}` alternations.
pub fn split_patterns(spec: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = spec.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    out.push(current.trim().to_string());
    out.retain(|p| !p.is_empty());
    out
}

/// Normalize a candidate path: `/` separators, no leading `./`.
pub fn normalize_path(path: &str) -> String {
    strip_dot_prefix(&path.replace('\\', "/")).to_string()
}

fn strip_dot_prefix(mut path: &str) -> &str {
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path
}

/// Expand the first top-level `{...}` group, recursively.
fn expand_braces(pattern: &str) -> Result<Vec<String>, &'static str> {
    let Some(open) = find_unescaped(pattern, 0, |c| c == '{') else {
        return Ok(vec![pattern.to_string()]);
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();
    let mut escaped = false;
    for (i, c) in pattern[open..].char_indices().map(|(i, c)| (i + open, c)) {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }
    let close = close.ok_or("unclosed '{'")?;

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    let mut out = Vec::new();
    for pair in bounds.windows(2) {
        let branch = &pattern[pair[0] + 1..pair[1]];
        out.extend(expand_braces(&format!("{}{}{}", prefix, branch, suffix))?);
    }
    Ok(out)
}

fn find_unescaped(s: &str, from: usize, want: impl Fn(char) -> bool) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s[from..].char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if want(c) {
            return Some(i + from);
        }
    }
    None
}

/// `\*` becomes `[*]`; the glob crate has no escape character.
fn translate_escapes(pattern: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let next = chars.next().ok_or("dangling '\\' escape")?;
            out.push_str(&Pattern::escape(&next.to_string()));
        } else {
            out.push(c);
        }
    }
    Ok(out)
}
