//! Naming templates: `{variable}` substitution plus `strftime` directives.
//!
//! A template such as `%Y/%m/{media_type}/{file}` is parsed once, when the
//! configuration is loaded, into literal and variable segments. Unknown
//! variables, unbalanced braces and malformed date directives are reported
//! at that point, never halfway through a batch.
//!
//! Date directives only ever apply to the literal segments, so a `%` inside a
//! substituted file name is copied as-is.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors raised while parsing a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{name}` that is not one of [`Variable::ALL`].
    #[error("unknown template variable {{{name}}}{}", suggestion_suffix(.suggestion))]
    UnknownVariable {
        name: String,
        suggestion: Option<&'static str>,
    },

    /// A `{` without its `}` or a lone `}`.
    #[error("unbalanced brace at position {position} in {template:?}")]
    UnbalancedBrace { template: String, position: usize },

    /// A `%` directive chrono cannot format.
    #[error("invalid date directive in {template:?}")]
    InvalidDateFormat { template: String },

    /// Nothing to render.
    #[error("template is empty")]
    Empty,
}

fn suggestion_suffix(suggestion: &Option<&'static str>) -> String {
    suggestion
        .map(|s| format!(" (did you mean {{{s}}}?)"))
        .unwrap_or_default()
}

/// Values a template can substitute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// File name, prefixed by a kept parent marker directory if any
    File,
    /// Extension without the dot
    FileExtension,
    /// File name without the extension
    FileName,
    /// `image`, `video`, ...
    MediaType,
    /// `jpeg`, `mp4`, ...
    MediaFormat,
    /// Parent directory relative to the source root, `.` at the root
    RelativePath,
}

impl Variable {
    pub const ALL: [Variable; 6] = [
        Variable::File,
        Variable::FileExtension,
        Variable::FileName,
        Variable::MediaType,
        Variable::MediaFormat,
        Variable::RelativePath,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::FileExtension => "file_extension",
            Self::FileName => "file_name",
            Self::MediaType => "media_type",
            Self::MediaFormat => "media_format",
            Self::RelativePath => "relative_path",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }

    /// Closest known variable name, if any is reasonably close.
    #[must_use]
    pub fn suggest(name: &str) -> Option<&'static str> {
        Self::ALL
            .into_iter()
            .map(|v| (v.name(), strsim::jaro_winkler(name, v.name())))
            .filter(|(_, score)| *score > 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Substitution values for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateValues {
    pub file: String,
    pub file_extension: String,
    pub file_name: String,
    pub media_type: String,
    pub media_format: String,
    pub relative_path: String,
}

impl TemplateValues {
    fn get(&self, variable: Variable) -> &str {
        match variable {
            Variable::File => &self.file,
            Variable::FileExtension => &self.file_extension,
            Variable::FileName => &self.file_name,
            Variable::MediaType => &self.media_type,
            Variable::MediaFormat => &self.media_format,
            Variable::RelativePath => &self.relative_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(Variable),
}

/// A parsed, validated naming template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
    requires_date: bool,
}

impl Template {
    /// Parse and validate `source`.
    ///
    /// `{{` and `}}` stand for literal braces.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] for unknown variables, unbalanced braces,
    /// malformed date directives or an empty template.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        if source.trim().is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        if n == '{' {
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace {
                            template: source.to_string(),
                            position: pos,
                        });
                    }
                    let variable =
                        Variable::from_name(&name).ok_or_else(|| TemplateError::UnknownVariable {
                            suggestion: Variable::suggest(&name),
                            name,
                        })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(variable));
                }
                '}' => {
                    return Err(TemplateError::UnbalancedBrace {
                        template: source.to_string(),
                        position: pos,
                    });
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let mut requires_date = false;
        for segment in &segments {
            if let Segment::Literal(text) = segment {
                for item in StrftimeItems::new(text) {
                    match item {
                        Item::Error => {
                            return Err(TemplateError::InvalidDateFormat {
                                template: source.to_string(),
                            })
                        }
                        Item::Numeric(..) | Item::Fixed(_) => requires_date = true,
                        _ => {}
                    }
                }
            }
        }

        Ok(Self {
            source: source.to_string(),
            segments,
            requires_date,
        })
    }

    /// The template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether rendering needs a date.
    #[must_use]
    pub fn requires_date(&self) -> bool {
        self.requires_date
    }

    /// Variables referenced, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(v) => Some(*v),
            Segment::Literal(_) => None,
        })
    }

    /// Render with `values`, formatting date directives with `date`.
    ///
    /// Without a date, escapes such as `%%` are still resolved; a template
    /// that needs a date keeps its directives as written.
    #[must_use]
    pub fn render(&self, values: &TemplateValues, date: Option<&NaiveDateTime>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match (segment, date) {
                (Segment::Variable(v), _) => out.push_str(values.get(*v)),
                (Segment::Literal(text), Some(date)) => {
                    let mut formatted = String::new();
                    if write!(formatted, "{}", date.format_with_items(StrftimeItems::new(text)))
                        .is_ok()
                    {
                        out.push_str(&formatted);
                    } else {
                        out.push_str(text);
                    }
                }
                (Segment::Literal(text), None) if self.requires_date => out.push_str(text),
                (Segment::Literal(text), None) => push_unescaped(&mut out, text),
            }
        }
        out
    }
}

/// Append the literal text of a date-free strftime string.
fn push_unescaped(out: &mut String, text: &str) {
    for item in StrftimeItems::new(text) {
        match item {
            Item::Literal(s) | Item::Space(s) => out.push_str(s),
            _ => {}
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::parse(&source).map_err(serde::de::Error::custom)
    }
}
