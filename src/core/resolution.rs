//! One resolution pass: locate, order, detect conflicts.
//!
//! The registry is passed in and only read. Each pass is independent, so
//! many contexts can be resolved in parallel against the same artifact set.

use crate::core::artifact::{ArtifactCategory, ArtifactSet, InstructionArtifact};
use crate::core::context::Context;
use crate::core::locator;
use crate::core::precedence;
use crate::core::registry::Registry;
use crate::core::version::Version;
use crate::plugins::conflicts::{Conflict, ConflictDetector};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub id: String,
    pub category: ArtifactCategory,
    /// Registry version, or the declared one for unregistered artifacts.
    pub version: Option<Version>,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Resolution {
    pub context: Context,
    pub ordered: Vec<ResolvedArtifact>,
    pub conflicts: Vec<Conflict>,
}

impl Resolution {
    pub fn ids(&self) -> Vec<&str> {
        self.ordered.iter().map(|a| a.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// The artifacts themselves, in resolved order.
    pub fn artifacts<'s>(&self, set: &'s ArtifactSet) -> Vec<&'s InstructionArtifact> {
        self.ordered.iter().filter_map(|r| set.get(&r.id)).collect()
    }
}

pub struct Resolver<'r> {
    registry: &'r Registry,
    detector: Box<dyn ConflictDetector>,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry, detector: Box<dyn ConflictDetector>) -> Self {
        Self { registry, detector }
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Matched artifacts in precedence order, without conflict detection.
    pub fn order<'a>(
        &self,
        artifacts: &'a ArtifactSet,
        context: &Context,
    ) -> Vec<&'a InstructionArtifact> {
        let matched = locator::locate(artifacts, context);
        precedence::order(&matched, self.registry)
    }

    pub fn resolve(&self, artifacts: &ArtifactSet, context: &Context) -> Resolution {
        let ordered = self.order(artifacts, context);
        let conflicts = self.detector.detect(&ordered);
        debug!(
            context = %context.describe(),
            resolved = ordered.len(),
            conflicts = conflicts.len(),
            detector = self.detector.name(),
            "resolution pass"
        );
        Resolution {
            context: context.clone(),
            ordered: ordered
                .into_iter()
                .map(|a| ResolvedArtifact {
                    id: a.id.clone(),
                    category: a.category,
                    version: precedence::effective_version(a, self.registry).cloned(),
                    path: a.path.clone(),
                })
                .collect(),
            conflicts,
        }
    }

    /// Resolve independent contexts in parallel. Output follows input order.
    pub fn resolve_many(&self, artifacts: &ArtifactSet, contexts: &[Context]) -> Vec<Resolution> {
        contexts
            .par_iter()
            .map(|ctx| self.resolve(artifacts, ctx))
            .collect()
    }
}
