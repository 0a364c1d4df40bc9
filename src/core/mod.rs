//! Core types and the resolution pipeline.
//!
//! Artifacts, contexts and the registry are plain data. `locator`,
//! `precedence` and `resolution` are pure functions over them. Filesystem
//! access lives in `workspace`, `import`, `scaffold` and the config and
//! registry loaders, plus marker probing in `context::detect`.

pub mod artifact;
pub mod assets;
pub mod config;
pub mod context;
pub mod docs;
pub mod error;
pub mod glob;
pub mod import;
pub mod locator;
pub mod output;
pub mod precedence;
pub mod registry;
pub mod render;
pub mod resolution;
pub mod scaffold;
pub mod time;
pub mod version;
pub mod workspace;
