//! Rule declaration types.

use std::path::PathBuf;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use super::Slots;

/// Serializable declaration of a single rule.
///
/// A rule turns its input files into its output files by running the
/// `shell` command template with placeholders substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    /// Unique rule name.
    pub name: String,
    /// Input slots, each bound to a path or to another rule's output.
    #[serde(default, skip_serializing_if = "Slots::is_empty")]
    pub input: Slots<InputSource>,
    /// Output slots, each bound to the path the command must produce.
    #[serde(default, skip_serializing_if = "Slots::is_empty")]
    pub output: Slots<PathBuf>,
    /// Literal parameter values.
    #[serde(default, skip_serializing_if = "Slots::is_empty")]
    pub params: Slots<ParamValue>,
    /// Command template with `{section.slot}` placeholders.
    pub shell: String,
    /// File receiving the command's captured stdout and stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<PathBuf>,
}

impl RuleDefinition {
    /// Creates a rule with a name and a command template and no slots.
    pub fn new(name: impl Into<String>, shell: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: Slots::new(),
            output: Slots::new(),
            params: Slots::new(),
            shell: shell.into(),
            log: None,
        }
    }

    /// Adds an input slot.
    pub fn with_input(mut self, slot: impl Into<String>, source: impl Into<InputSource>) -> Self {
        self.input.insert(slot, source.into());
        self
    }

    /// Adds an output slot.
    pub fn with_output(mut self, slot: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.output.insert(slot, path.into());
        self
    }

    /// Adds a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name, value.into());
        self
    }

    /// Sets the log file.
    pub fn with_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log = Some(path.into());
        self
    }
}

/// Where an input slot gets its file from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputSource {
    /// A file path, either pre-existing or produced by some rule.
    Path(PathBuf),
    /// An output slot of another rule.
    Reference(RuleReference),
}

impl From<PathBuf> for InputSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<String> for InputSource {
    fn from(path: String) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<&str> for InputSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<RuleReference> for InputSource {
    fn from(reference: RuleReference) -> Self {
        Self::Reference(reference)
    }
}

/// Reference to an output slot of another rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display)]
#[display("{rule}.output.{output}")]
#[serde(deny_unknown_fields)]
pub struct RuleReference {
    /// Name of the producing rule.
    pub rule: String,
    /// Output slot of the producing rule.
    pub output: String,
}

impl RuleReference {
    /// Creates a reference to `rule`'s `output` slot.
    pub fn new(rule: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            output: output.into(),
        }
    }
}

/// A parameter value.
///
/// Parameters are passed to commands as text; numbers and booleans in the
/// source document are accepted and rendered with their usual formatting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, From, Into)]
#[serde(from = "RawParam", into = "String")]
pub struct ParamValue(String);

impl ParamValue {
    /// Returns the value as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawParam {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl From<RawParam> for ParamValue {
    fn from(raw: RawParam) -> Self {
        match raw {
            RawParam::Text(text) => Self(text),
            RawParam::Integer(value) => Self(value.to_string()),
            RawParam::Float(value) => Self(value.to_string()),
            RawParam::Bool(value) => Self(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_source_accepts_path_or_reference() {
        let path: InputSource = serde_json::from_str(r#""data/raw.fif""#).unwrap();
        assert_eq!(path, InputSource::Path("data/raw.fif".into()));

        let reference: InputSource =
            serde_json::from_str(r#"{"rule": "read", "output": "pickle"}"#).unwrap();
        assert_eq!(
            reference,
            InputSource::Reference(RuleReference::new("read", "pickle"))
        );
    }

    #[test]
    fn test_params_accept_scalars() {
        let params: Slots<ParamValue> =
            serde_json::from_str(r#"{"n": 3, "ratio": 0.5, "flag": true, "name": "x"}"#).unwrap();
        let rendered: Vec<_> = params.values().map(ParamValue::as_str).collect();
        assert_eq!(rendered, ["3", "0.5", "true", "x"]);
    }

    #[test]
    fn test_builder_methods_fill_slots() {
        let rule = RuleDefinition::new("a", "cat {input.src} > {output.dst}")
            .with_input("src", "in.txt")
            .with_output("dst", "out.txt")
            .with_param("level", "2")
            .with_log("logs/a.log");

        assert_eq!(rule.input.len(), 1);
        assert_eq!(rule.output.get("dst"), Some(&PathBuf::from("out.txt")));
        assert_eq!(rule.params.get("level").map(ParamValue::as_str), Some("2"));
        assert_eq!(rule.log, Some(PathBuf::from("logs/a.log")));
    }

    #[test]
    fn test_formatted_input_paths_convert() {
        let rule =
            RuleDefinition::new("a", "cat {input.src}").with_input("src", format!("sub-{:02}.fif", 1));
        assert_eq!(
            rule.input.get("src"),
            Some(&InputSource::Path(PathBuf::from("sub-01.fif")))
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<RuleDefinition, _> =
            serde_json::from_str(r#"{"name": "a", "shell": "true", "outputs": {}}"#);
        assert!(result.is_err());
    }
}
