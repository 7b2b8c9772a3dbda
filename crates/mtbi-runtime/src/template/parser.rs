//! Template tokenizer.

use thiserror::Error;

use super::{Placeholder, Section, Segment};

/// A syntax error in a command template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {position}")]
pub struct TemplateError {
    /// Byte offset of the offending character.
    pub position: usize,
    /// Error message.
    pub message: String,
}

impl TemplateError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

pub(super) fn parse(source: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = source.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        match ch {
            '{' if chars.next_if(|&(_, next)| next == '{').is_some() => literal.push('{'),
            '}' if chars.next_if(|&(_, next)| next == '}').is_some() => literal.push('}'),
            '}' => return Err(TemplateError::new(position, "unmatched `}`")),
            '{' => {
                let start = position + 1;
                let end = loop {
                    match chars.next() {
                        Some((end, '}')) => break end,
                        Some((nested, '{')) => {
                            return Err(TemplateError::new(nested, "nested `{` in placeholder"));
                        }
                        Some(_) => continue,
                        None => return Err(TemplateError::new(position, "unclosed placeholder")),
                    }
                };

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let placeholder = parse_placeholder(&source[start..end], start)?;
                segments.push(Segment::Placeholder(placeholder));
            }
            _ => literal.push(ch),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn parse_placeholder(body: &str, position: usize) -> Result<Placeholder, TemplateError> {
    let (section, slot) = match body.split_once('.') {
        Some((section, slot)) => (section, Some(slot)),
        None => (body, None),
    };

    let section: Section = section.parse().map_err(|_| {
        TemplateError::new(
            position,
            format!("unknown placeholder section `{section}` (expected input, output or params)"),
        )
    })?;

    if let Some(slot) = slot
        && !is_slot_name(slot)
    {
        return Err(TemplateError::new(
            position,
            format!("invalid slot name `{slot}`"),
        ));
    }

    Ok(Placeholder {
        section,
        slot: slot.map(str::to_owned),
    })
}

fn is_slot_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_single_literal() {
        let segments = parse("echo hello").unwrap();
        assert_eq!(segments, vec![Segment::Literal("echo hello".into())]);
    }

    #[test]
    fn test_unclosed_placeholder() {
        let err = parse("echo {input.a").unwrap_err();
        assert_eq!(err.position, 5);
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn test_unmatched_closing_brace() {
        let err = parse("echo }").unwrap_err();
        assert_eq!(err.position, 5);
    }

    #[test]
    fn test_unknown_section() {
        let err = parse("echo {wildcards.subject}").unwrap_err();
        assert!(err.message.contains("wildcards"));
    }

    #[test]
    fn test_shell_variable_must_be_escaped() {
        assert!(parse("echo ${HOME}").is_err());
        assert!(parse("echo ${{HOME}}").is_ok());
    }

    #[test]
    fn test_invalid_slot_name() {
        assert!(parse("{input.}").is_err());
        assert!(parse("{input.a.b}").is_err());
        assert!(parse("{input.raw-fif_1}").is_ok());
    }
}
