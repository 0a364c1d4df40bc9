use crate::core::artifact::{ArtifactSet, checksum};
use crate::core::error::ResolverError;
use serde::{Deserialize, Serialize};

/// An artifact body or one heading section of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocFragment {
    pub id: String,
    pub r#ref: String,
    pub title: String,
    pub content: String,
    pub hash: String,
}

/// Resolve `id` or `id#section` against the loaded artifacts.
pub fn get_fragment(artifacts: &ArtifactSet, reference: &str) -> Result<DocFragment, ResolverError> {
    let (id, anchor) = match reference.split_once('#') {
        Some((id, anchor)) if !anchor.trim().is_empty() => (id, Some(anchor.trim())),
        Some((id, _)) => (id, None),
        None => (reference, None),
    };
    let artifact = artifacts
        .get(id)
        .ok_or_else(|| ResolverError::NotFound(format!("artifact '{}'", id)))?;

    let (content, title) = match anchor {
        Some(a) => extract_section(&artifact.body, a).ok_or_else(|| {
            ResolverError::NotFound(format!("section '{}' in artifact '{}'", a, id))
        })?,
        None => (artifact.body.clone(), artifact.title()),
    };

    Ok(DocFragment {
        id: id.to_string(),
        r#ref: match anchor {
            Some(a) => format!("{}#{}", id, a),
            None => id.to_string(),
        },
        title,
        hash: checksum(content.as_bytes()),
        content,
    })
}

pub fn slugify(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' | '_' => Some('-'),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

/// Section under the heading matching `anchor` by slug or case-insensitive
/// title, up to the next heading of the same or higher level. Headings
/// inside code fences do not count.
pub fn extract_section(content: &str, anchor: &str) -> Option<(String, String)> {
    let slug = slugify(anchor);
    let mut section_lines = Vec::new();
    let mut in_section = false;
    let mut in_fence = false;
    let mut section_title = String::new();
    let mut section_level = 0;

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence && line.starts_with('#') {
            let level = line.chars().take_while(|&c| c == '#').count();
            let title = line.trim_start_matches('#').trim();

            if in_section {
                if level <= section_level {
                    break;
                }
            } else if slugify(title) == slug || title.eq_ignore_ascii_case(anchor) {
                in_section = true;
                section_title = title.to_string();
                section_level = level;
            }
        }

        if in_section {
            section_lines.push(line);
        }
    }

    in_section.then(|| (section_lines.join("\n").trim_end().to_string(), section_title))
}
