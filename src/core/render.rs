//! Render a resolution into a single Markdown prompt.

use crate::core::artifact::{ArtifactSet, InstructionArtifact};
use crate::core::error::ResolverError;
use crate::core::resolution::Resolution;
use serde::Serialize;
use tiktoken_rs::{CoreBPE, cl100k_base};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct RenderedPrompt {
    pub text: String,
    pub included: Vec<String>,
    /// Ids left out because the budget ran out.
    pub skipped: Vec<String>,
    pub tokens: usize,
    pub budget: Option<usize>,
}

pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    pub fn cl100k() -> Result<Self, ResolverError> {
        let bpe = cl100k_base().map_err(|e| ResolverError::TokenizerError(e.to_string()))?;
        Ok(Self { bpe })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

fn header(resolution: &Resolution) -> String {
    format!(
        "# Copilot instructions\n\n> Context: {}\n\n",
        resolution.context.describe()
    )
}

fn section(artifact: &InstructionArtifact) -> String {
    format!(
        "## {} ({})\n\n{}\n\n",
        artifact.id,
        artifact.category,
        artifact.body.trim()
    )
}

/// Concatenate artifacts in resolved order. Without a budget everything is
/// included and no tokenizer is loaded.
pub fn render(
    resolution: &Resolution,
    artifacts: &ArtifactSet,
    budget: Option<usize>,
) -> Result<RenderedPrompt, ResolverError> {
    let ordered = resolution.artifacts(artifacts);
    let Some(limit) = budget else {
        let mut text = header(resolution);
        for artifact in &ordered {
            text.push_str(&section(artifact));
        }
        return Ok(RenderedPrompt {
            included: ordered.iter().map(|a| a.id.clone()).collect(),
            skipped: Vec::new(),
            tokens: 0,
            budget: None,
            text: text.trim_end().to_string(),
        });
    };

    let counter = TokenCounter::cl100k()?;
    render_with(resolution, &ordered, limit, &counter)
}

pub fn render_with(
    resolution: &Resolution,
    ordered: &[&InstructionArtifact],
    limit: usize,
    counter: &TokenCounter,
) -> Result<RenderedPrompt, ResolverError> {
    let mut rendered = RenderedPrompt {
        text: String::new(),
        included: Vec::new(),
        skipped: Vec::new(),
        tokens: 0,
        budget: Some(limit),
    };
    if limit == 0 {
        rendered.skipped = ordered.iter().map(|a| a.id.clone()).collect();
        return Ok(rendered);
    }

    let head = header(resolution);
    let head_tokens = counter.count(&head);
    if head_tokens > limit {
        rendered.skipped = ordered.iter().map(|a| a.id.clone()).collect();
        return Ok(rendered);
    }
    rendered.text.push_str(&head);
    rendered.tokens = head_tokens;

    // A section that does not fit is skipped; later, smaller ones may still fit.
    for artifact in ordered {
        let part = section(artifact);
        let cost = counter.count(&part);
        if rendered.tokens + cost <= limit {
            rendered.text.push_str(&part);
            rendered.tokens += cost;
            rendered.included.push(artifact.id.clone());
        } else {
            rendered.skipped.push(artifact.id.clone());
        }
    }
    rendered.text = rendered.text.trim_end().to_string();

    if !rendered.skipped.is_empty() {
        warn!(
            budget = limit,
            skipped = ?rendered.skipped,
            "token budget exceeded, artifacts left out"
        );
    }
    debug!(tokens = rendered.tokens, included = rendered.included.len(), "rendered prompt");
    Ok(rendered)
}
