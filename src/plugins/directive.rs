//! Directive-line conflict heuristic.
//!
//! Each artifact body is scanned for imperative lines:
//!
//! ```text
//! require: always / use / prefer / must
//! forbid:  never / avoid / do not / don't / must not
//! ```
//!
//! The rest of the line, cut at the first qualifier or punctuation, is the
//! subject. Two artifacts conflict when one requires a subject the other
//! forbids. Code fences are skipped. False positives and misses are both
//! expected.

use crate::core::artifact::InstructionArtifact;
use crate::plugins::conflicts::{Conflict, ConflictDetector};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Polarity {
    Require,
    Forbid,
}

impl Polarity {
    fn verb(&self) -> &'static str {
        match self {
            Self::Require => "requires",
            Self::Forbid => "forbids",
        }
    }

    fn opposite(&self) -> Self {
        match self {
            Self::Require => Self::Forbid,
            Self::Forbid => Self::Require,
        }
    }
}

// Longest first so "must not" is never read as "must".
const LEADS: &[(&str, Polarity)] = &[
    ("must not ", Polarity::Forbid),
    ("do not ", Polarity::Forbid),
    ("don't ", Polarity::Forbid),
    ("never ", Polarity::Forbid),
    ("avoid ", Polarity::Forbid),
    ("always ", Polarity::Require),
    ("prefer ", Polarity::Require),
    ("must ", Polarity::Require),
    ("use ", Polarity::Require),
];

const FILLER: &[&str] = &["use ", "using ", "prefer ", "the ", "a ", "an "];

const QUALIFIERS: &[&str] = &[
    " for ", " when ", " in ", " unless ", " except ", " instead of ", " over ", " if ",
    " because ", " so ", " - ",
];

const MAX_SUBJECT_WORDS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub polarity: Polarity,
    pub subject: String,
}

pub fn parse_directive(line: &str) -> Option<Directive> {
    let text = strip_markup(line);
    let (polarity, rest) = LEADS
        .iter()
        .find_map(|(lead, polarity)| text.strip_prefix(lead).map(|rest| (*polarity, rest)))?;
    let subject = normalize_subject(rest)?;
    Some(Directive { polarity, subject })
}

pub fn directives(body: &str) -> Vec<Directive> {
    let mut in_fence = false;
    let mut found = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || trimmed.starts_with('#') {
            continue;
        }
        if let Some(d) = parse_directive(trimmed) {
            found.push(d);
        }
    }
    found
}

// List bullets, block quotes and ordinals, possibly nested (`> - 1. `).
static LIST_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?:[-*+>]|\d+[.)])\s+)+").unwrap());

fn strip_markup(line: &str) -> String {
    LIST_MARKERS
        .replace(line.trim(), "")
        .chars()
        .filter(|c| !matches!(c, '*' | '`'))
        .collect::<String>()
        .replace('\u{2019}', "'")
        .to_lowercase()
}

fn normalize_subject(rest: &str) -> Option<String> {
    let mut subject = rest
        .split(['.', ',', ';', ':', '(', '!', '?'])
        .next()
        .unwrap_or("")
        .to_string();
    for q in QUALIFIERS {
        if let Some(pos) = subject.find(q) {
            subject.truncate(pos);
        }
    }
    let mut subject = subject.trim();
    loop {
        match FILLER.iter().find_map(|f| subject.strip_prefix(f)) {
            Some(rest) => subject = rest.trim_start(),
            None => break,
        }
    }
    let words: Vec<&str> = subject.split_whitespace().collect();
    if words.is_empty() || words.len() > MAX_SUBJECT_WORDS {
        return None;
    }
    Some(words.join(" "))
}

/// Subject to polarity for one artifact. A subject the artifact both
/// requires and forbids is dropped as ambiguous.
fn stances(artifact: &InstructionArtifact) -> BTreeMap<String, Polarity> {
    let mut map: BTreeMap<String, Option<Polarity>> = BTreeMap::new();
    for d in directives(&artifact.body) {
        map.entry(d.subject)
            .and_modify(|p| {
                if *p != Some(d.polarity) {
                    *p = None;
                }
            })
            .or_insert(Some(d.polarity));
    }
    map.into_iter()
        .filter_map(|(s, p)| p.map(|p| (s, p)))
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DirectiveDetector;

impl ConflictDetector for DirectiveDetector {
    fn name(&self) -> &'static str {
        "directive"
    }

    fn detect(&self, ordered: &[&InstructionArtifact]) -> Vec<Conflict> {
        let by_artifact: Vec<_> = ordered.iter().map(|a| stances(a)).collect();
        let mut conflicts = Vec::new();
        for (i, first) in ordered.iter().enumerate() {
            for (j, second) in ordered.iter().enumerate().skip(i + 1) {
                for (subject, polarity) in &by_artifact[i] {
                    if by_artifact[j].get(subject) == Some(&polarity.opposite()) {
                        conflicts.push(Conflict {
                            first: first.id.clone(),
                            second: second.id.clone(),
                            description: format!(
                                "'{}' {} `{}` but '{}' {} it",
                                first.id,
                                polarity.verb(),
                                subject,
                                second.id,
                                polarity.opposite().verb()
                            ),
                            detector: self.name().to_string(),
                        });
                    }
                }
            }
        }
        conflicts
    }
}
