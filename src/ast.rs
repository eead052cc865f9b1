use std::fmt;

/// Template token produced by the template parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Positional argument reference: #1, #2, etc.
    Positional(usize),
    /// Literal template text between markers
    Literal(&'a str),
}

/// One scanned `\newcommand` declaration.
///
/// `arity` counts every positional slot, the optional one included. When
/// `optional_default` is set, `#1` is filled from the bracket argument (or
/// the default) and the remaining `arity - 1` slots from brace groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    pub template: String,
    pub arity: usize,
    pub optional_default: Option<String>,
}

impl MacroDefinition {
    pub fn new(name: impl Into<String>, template: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            arity,
            optional_default: None,
        }
    }

    pub fn with_optional(mut self, default: impl Into<String>) -> Self {
        self.optional_default = Some(default.into());
        self
    }

    /// Number of brace groups an invocation must supply
    pub fn required_groups(&self) -> usize {
        required_groups(self.arity, self.optional_default.is_some())
    }
}

pub(crate) fn required_groups(arity: usize, has_optional: bool) -> usize {
    arity.saturating_sub(usize::from(has_optional))
}

/// A recovered scan or expansion failure, positioned in the scanned source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line
    pub line: usize,
    /// 0-based column, in characters
    pub column: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    /// Build a diagnostic for a byte offset into `text`.
    pub(crate) fn at_offset(text: &str, offset: usize, message: impl Into<String>) -> Self {
        let before = &text[..offset];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let line = before.matches('\n').count() + 1;
        let column = before[line_start..].chars().count();
        Self::new(line, column, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// A located macro call site with its extracted arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    /// Byte offset of the escape character
    pub start: usize,
    /// Length of the name plus all consumed argument syntax
    pub len: usize,
    /// Arguments in positional order, optional first when declared
    pub args: Vec<&'a str>,
}

impl Invocation<'_> {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}
