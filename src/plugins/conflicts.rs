//! Conflict logger.
//!
//! Detection is pluggable and best-effort: a `ConflictDetector` looks at the
//! precedence-ordered artifacts and reports pairs that contradict each
//! other. Conflicts are advisory. Resolution still succeeds, and detected
//! pairs can be appended to `.copilot/conflicts.jsonl` for human review.

use crate::core::artifact::InstructionArtifact;
use crate::core::config::DetectorKind;
use crate::core::context::Context;
use crate::core::error::ResolverError;
use crate::core::time;
use crate::plugins::directive::DirectiveDetector;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Two artifacts that disagree. `first` precedes `second` in the ordered
/// sequence, so `first` wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub first: String,
    pub second: String,
    pub description: String,
    pub detector: String,
}

pub trait ConflictDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// `ordered` is already in precedence order.
    fn detect(&self, ordered: &[&InstructionArtifact]) -> Vec<Conflict>;
}

/// Reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDetector;

impl ConflictDetector for NoopDetector {
    fn name(&self) -> &'static str {
        "none"
    }

    fn detect(&self, _ordered: &[&InstructionArtifact]) -> Vec<Conflict> {
        Vec::new()
    }
}

pub fn detector_for(kind: DetectorKind) -> Box<dyn ConflictDetector> {
    match kind {
        DetectorKind::Directive => Box::new(DirectiveDetector),
        DetectorKind::None => Box::new(NoopDetector),
    }
}

/// One line of the conflict log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEvent {
    pub event_id: String,
    pub ts: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub context: String,
    #[serde(flatten)]
    pub conflict: Conflict,
}

/// Append-only JSONL log of detected conflicts.
#[derive(Debug, Clone)]
pub struct ConflictLog {
    path: PathBuf,
}

impl ConflictLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of events written.
    pub fn append(&self, context: &Context, conflicts: &[Conflict]) -> Result<usize, ResolverError> {
        if conflicts.is_empty() {
            return Ok(0);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(ResolverError::IoError)?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(ResolverError::IoError)?;

        let described = context.describe();
        for conflict in conflicts {
            let event = ConflictEvent {
                event_id: time::new_event_id(),
                ts: time::now_epoch_z(),
                kind: "conflict.detected".to_string(),
                context: described.clone(),
                conflict: conflict.clone(),
            };
            writeln!(f, "{}", serde_json::to_string(&event)?).map_err(ResolverError::IoError)?;
        }
        info!(
            path = %self.path.display(),
            count = conflicts.len(),
            "conflicts logged for review"
        );
        Ok(conflicts.len())
    }

    /// All logged events, oldest first. A missing log is empty.
    pub fn read_all(&self) -> Result<Vec<ConflictEvent>, ResolverError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path).map_err(ResolverError::IoError)?;
        let mut events = Vec::new();
        for (n, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(line).map_err(|e| {
                ResolverError::ValidationError(format!(
                    "{}:{}: {}",
                    self.path.display(),
                    n + 1,
                    e
                ))
            })?;
            events.push(event);
        }
        debug!(path = %self.path.display(), count = events.len(), "read conflict log");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn conflict(first: &str, second: &str) -> Conflict {
        Conflict {
            first: first.to_string(),
            second: second.to_string(),
            description: "disagree".to_string(),
            detector: "test".to_string(),
        }
    }

    #[test]
    fn noop_reports_nothing() {
        let a = InstructionArtifact::from_parts(
            "a",
            crate::core::artifact::ArtifactCategory::Project,
            "**",
            "Always use tabs.",
        )
        .unwrap();
        let b = InstructionArtifact::from_parts(
            "b",
            crate::core::artifact::ArtifactCategory::Language,
            "**",
            "Never use tabs.",
        )
        .unwrap();
        assert!(NoopDetector.detect(&[&a, &b]).is_empty());
        assert_eq!(detector_for(DetectorKind::None).name(), "none");
        assert_eq!(detector_for(DetectorKind::Directive).name(), "directive");
    }

    #[test]
    fn log_appends_and_reads_back() {
        let tmp = tempdir().unwrap();
        let log = ConflictLog::new(tmp.path().join(".copilot/conflicts.jsonl"));
        let ctx = Context::new().with_file("main.py");

        assert_eq!(log.append(&ctx, &[]).unwrap(), 0);
        assert!(!log.path().exists());

        log.append(&ctx, &[conflict("a", "b")]).unwrap();
        log.append(&ctx, &[conflict("c", "d"), conflict("e", "f")])
            .unwrap();

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].conflict.first, "a");
        assert_eq!(events[2].conflict.second, "f");
        assert_eq!(events[0].kind, "conflict.detected");
        assert!(events[0].context.contains("main.py"));
        assert_ne!(events[0].event_id, events[1].event_id);
    }

    #[test]
    fn corrupt_line_is_reported_with_position() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("conflicts.jsonl");
        fs::write(&path, "{not json}\n").unwrap();
        let err = ConflictLog::new(&path).read_all().unwrap_err();
        assert!(err.to_string().contains("conflicts.jsonl:1"));
    }
}
