//! Pipeline definition types.
//!
//! This module contains serializable, file-friendly types for declaring rules.
//! These types are designed for:
//! - Hand-written TOML pipeline files
//! - JSON produced by other tooling
//! - Building pipelines programmatically in tests
//!
//! To plan or execute a pipeline, definitions must be registered into a
//! [`crate::graph::RuleGraph`], which validates them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

mod rule;
mod slots;

pub use rule::{InputSource, ParamValue, RuleDefinition, RuleReference};
pub use slots::Slots;

use crate::error::{PipelineError, PipelineResult};

/// Serializable pipeline definition.
///
/// Rules are kept in declaration order; the order breaks ties between
/// independent rules when planning, and the first rule's first output is
/// the default target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDefinition {
    /// Directory relative paths and commands are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    /// Declared rules.
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// Supported on-disk formats for pipeline definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DefinitionFormat {
    /// TOML document with a `[[rules]]` array.
    Toml,
    /// JSON document with a `rules` array.
    Json,
}

impl DefinitionFormat {
    /// Detects the format from a file extension.
    pub fn from_path(path: &Path) -> PipelineResult<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .ok_or_else(|| PipelineError::UnsupportedFormat(path.to_path_buf()))
    }
}

impl PipelineDefinition {
    /// Parses a definition from a string in the given format.
    pub fn parse(source: &str, format: DefinitionFormat) -> PipelineResult<Self> {
        match format {
            DefinitionFormat::Toml => Ok(toml::from_str(source)?),
            DefinitionFormat::Json => Ok(serde_json::from_str(source)?),
        }
    }

    /// Reads and parses a definition file, picking the format from its extension.
    ///
    /// A relative `workdir` inside the file is interpreted relative to the
    /// file's own directory; a missing one defaults to that directory.
    pub fn from_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let format = DefinitionFormat::from_path(path)?;
        let source = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut definition = Self::parse(&source, format)?;
        let base = definition_dir(path);
        definition.workdir = Some(match definition.workdir.take() {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => base.join(dir),
            None => base.to_path_buf(),
        });
        Ok(definition)
    }

    /// Appends a rule declaration.
    pub fn with_rule(mut self, rule: RuleDefinition) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Returns the directory containing a definition file.
///
/// A bare file name lives in the current directory.
fn definition_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}
