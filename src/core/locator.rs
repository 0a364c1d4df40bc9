//! Artifact locator: which artifacts apply to a context.
//!
//! Pure over the artifact set. Output keeps artifact-set order, so the same
//! set and context always give the same list. An empty result is normal.

use crate::core::artifact::{ArtifactSet, InstructionArtifact};
use crate::core::context::Context;
use tracing::debug;

pub fn locate<'a>(artifacts: &'a ArtifactSet, context: &Context) -> Vec<&'a InstructionArtifact> {
    if context.is_empty() {
        return Vec::new();
    }
    let matched: Vec<_> = artifacts
        .iter()
        .filter(|a| applies(a, context))
        .collect();
    debug!(
        context = %context.describe(),
        matched = matched.len(),
        total = artifacts.len(),
        "located artifacts"
    );
    matched
}

/// Files match as paths; scenarios and frameworks match as tokens, ignoring case.
pub fn applies(artifact: &InstructionArtifact, context: &Context) -> bool {
    let apply = &artifact.apply_to;
    context.files.iter().any(|f| apply.matches(f))
        || context.tokens().any(|t| apply.matches_token(t))
}
