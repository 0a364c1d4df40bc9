//! Precedence resolver.
//!
//! Orders matched artifacts: project > language > scenario > prompt, then
//! newer registry version first. `sort_by` is stable, so artifacts that
//! tie keep their input order and sorting twice changes nothing.

use crate::core::artifact::InstructionArtifact;
use crate::core::registry::Registry;
use crate::core::version::{Version, newer_first};
use std::cmp::Ordering;

pub fn order<'a>(
    matched: &[&'a InstructionArtifact],
    registry: &Registry,
) -> Vec<&'a InstructionArtifact> {
    let mut ordered = matched.to_vec();
    ordered.sort_by(|a, b| compare(a, b, registry));
    ordered
}

pub fn compare(a: &InstructionArtifact, b: &InstructionArtifact, registry: &Registry) -> Ordering {
    a.category
        .rank()
        .cmp(&b.category.rank())
        .then_with(|| newer_first(effective_version(a, registry), effective_version(b, registry)))
}

/// The registry is authoritative; a declared frontmatter version only
/// counts for artifacts the registry has never seen.
pub fn effective_version<'r>(
    artifact: &'r InstructionArtifact,
    registry: &'r Registry,
) -> Option<&'r Version> {
    registry
        .version_of(&artifact.id)
        .or(artifact.declared_version.as_ref())
}
