//! Command templates and placeholder substitution.
//!
//! A command template is plain text with placeholders of the form
//! `{section.slot}` where `section` is one of `input`, `output` or
//! `params`. A bare `{section}` expands to every value of that section,
//! space separated. `{{` and `}}` produce literal braces.
//!
//! Placeholders are resolved by direct lookup in a [`Bindings`] map keyed
//! by `(Section, slot)`; nothing in a template is ever evaluated.

mod bindings;
mod parser;

use std::fmt;

pub use bindings::Bindings;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub use self::parser::TemplateError;

/// Section of a rule a placeholder points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Input file paths.
    Input,
    /// Output file paths.
    Output,
    /// Literal parameter values.
    Params,
}

/// A placeholder embedded in a command template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder {
    /// Section the placeholder reads from.
    pub section: Section,
    /// Slot name; `None` expands the whole section.
    pub slot: Option<String>,
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Some(slot) => write!(f, "{{{}.{}}}", self.section, slot),
            None => write!(f, "{{{}}}", self.section),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// A parsed command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl CommandTemplate {
    /// Parses a template, rejecting unbalanced braces and unknown sections.
    pub fn parse(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        let segments = parser::parse(&source)?;
        Ok(Self { source, segments })
    }

    /// Returns the template text as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Iterates over the placeholders in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(placeholder) => Some(placeholder),
            Segment::Literal(_) => None,
        })
    }

    /// Substitutes every placeholder from the bindings.
    ///
    /// Returns the first placeholder that has no binding as the error.
    pub fn render(&self, bindings: &Bindings) -> Result<String, Placeholder> {
        let mut rendered = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Placeholder(placeholder) => match &placeholder.slot {
                    Some(slot) => {
                        let value = bindings
                            .get(placeholder.section, slot)
                            .ok_or_else(|| placeholder.clone())?;
                        rendered.push_str(value);
                    }
                    None => rendered.push_str(&bindings.joined(placeholder.section)),
                },
            }
        }
        Ok(rendered)
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
