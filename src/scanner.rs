//! `\newcommand` declaration scanning.
//!
//! The scanner walks a document once, left to right, and collects every
//! well-formed declaration of the form
//!
//! ```text
//! \newcommand{\name}[arity][default]{template}
//! ```
//!
//! where both brackets are optional and the default bracket is only
//! recognized after an arity bracket. A malformed declaration yields a
//! [`Diagnostic`] and the scan resumes at the character that broke it.

use std::collections::HashMap;

use crate::ast::{Diagnostic, MacroDefinition};

/// Declaration keyword recognized by the scanner
pub const DECLARATION: &str = "\\newcommand";

/// Largest argument count a declaration may give, as in TeX
pub const MAX_ARITY: usize = 9;

/// Definitions and recovered failures from one scan
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanOutput {
    /// Definitions keyed by name; later declarations overwrite earlier ones
    pub definitions: HashMap<String, MacroDefinition>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scan `text` for macro declarations.
pub fn scan_definitions(text: &str) -> ScanOutput {
    let mut output = ScanOutput::default();
    let mut cursor = ScanCursor::new(text);

    while cursor.peek().is_some() {
        if !cursor.rest().starts_with(DECLARATION) {
            cursor.bump();
            continue;
        }
        cursor.eat_str(DECLARATION);
        // `\newcommandx` is a different control word
        if cursor.peek().is_some_and(is_name_char) {
            continue;
        }

        match parse_declaration(&mut cursor) {
            Ok(definition) => {
                output
                    .definitions
                    .insert(definition.name.clone(), definition);
            }
            Err(diagnostic) => {
                tracing::debug!(
                    line = diagnostic.line,
                    column = diagnostic.column,
                    message = %diagnostic.message,
                    "Skipping malformed declaration"
                );
                output.diagnostics.push(diagnostic);
            }
        }
    }

    tracing::debug!(
        definitions = output.definitions.len(),
        diagnostics = output.diagnostics.len(),
        "Definition scan completed"
    );
    output
}

/// Parse one declaration with the cursor placed just after the keyword.
fn parse_declaration(cursor: &mut ScanCursor<'_>) -> Result<MacroDefinition, Diagnostic> {
    // Starred form behaves the same for our purposes
    cursor.eat('*');

    if !cursor.eat('{') {
        return Err(cursor.error(format!("expected `{{` after {DECLARATION}")));
    }
    if !cursor.eat('\\') {
        return Err(cursor.error("expected `\\` before macro name"));
    }
    let name = cursor.take_while(is_name_char);
    if name.is_empty() {
        return Err(cursor.error("expected macro name"));
    }
    if !cursor.eat('}') {
        return Err(cursor.error("expected `}` after macro name"));
    }

    let mut arity = 0;
    let mut optional_default = None;
    if cursor.peek() == Some('[') {
        let (line, column) = cursor.position();
        let raw = cursor.bracketed()?;
        arity = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|&n| n <= MAX_ARITY)
            .ok_or_else(|| {
                Diagnostic::new(line, column, format!("invalid argument count `{raw}`"))
            })?;

        if cursor.peek() == Some('[') {
            optional_default = Some(cursor.bracketed()?.to_owned());
        }
    }
    if optional_default.is_some() && arity == 0 {
        return Err(cursor.error("optional argument declared for a macro without arguments"));
    }

    if !cursor.eat('{') {
        return Err(cursor.error("expected `{` to open macro body"));
    }
    let template = cursor.balanced_body()?;

    Ok(MacroDefinition {
        name: name.to_owned(),
        template: template.to_owned(),
        arity,
        optional_default,
    })
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '@'
}

/// Position in the scanned text, advanced one character at a time so the
/// current line and column never need a rescan from the start.
struct ScanCursor<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
    line_start: usize,
}

impl<'a> ScanCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.line_start = self.offset;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        if !self.rest().starts_with(expected) {
            return false;
        }
        for _ in expected.chars() {
            self.bump();
        }
        true
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.offset;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.text[start..self.offset]
    }

    /// Consume `[...]` and return its content. Brackets inside braces do not
    /// close it.
    fn bracketed(&mut self) -> Result<&'a str, Diagnostic> {
        self.bump();
        let start = self.offset;
        let mut depth = 0usize;
        loop {
            match self.bump() {
                Some(']') if depth == 0 => return Ok(&self.text[start..self.offset - 1]),
                Some('{') => depth += 1,
                Some('}') => depth = depth.saturating_sub(1),
                Some(_) => {}
                None => return Err(self.error("unterminated `[` in declaration")),
            }
        }
    }

    /// Consume a body whose opening brace was already eaten and return it
    /// without the closing brace.
    fn balanced_body(&mut self) -> Result<&'a str, Diagnostic> {
        let start = self.offset;
        let mut depth = 1usize;
        loop {
            match self.bump() {
                Some('{') => depth += 1,
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(&self.text[start..self.offset - 1]);
                    }
                }
                Some(_) => {}
                None => return Err(self.error("unterminated macro body")),
            }
        }
    }

    fn position(&self) -> (usize, usize) {
        let column = self.text[self.line_start..self.offset].chars().count();
        (self.line, column)
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        let (line, column) = self.position();
        Diagnostic::new(line, column, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn single(text: &str) -> MacroDefinition {
        let output = scan_definitions(text);
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        assert_eq!(output.definitions.len(), 1);
        output.definitions.into_values().next().unwrap()
    }

    #[test]
    fn test_scan_arity_and_template() {
        let def = single("\\newcommand{\\foo}[2]{#1 and #2}");
        assert_eq!(def, MacroDefinition::new("foo", "#1 and #2", 2));
    }

    #[test]
    fn test_scan_optional_argument() {
        let def = single("\\newcommand{\\foo}[2][def]{#1-#2}");
        assert_eq!(def.arity, 2);
        assert_eq!(def.optional_default.as_deref(), Some("def"));
        assert_eq!(def.template, "#1-#2");
    }

    #[test]
    fn test_scan_without_arity() {
        let def = single("Intro \\newcommand{\\R}{\\mathbb{R}} text");
        assert_eq!(def, MacroDefinition::new("R", "\\mathbb{R}", 0));
    }

    #[test]
    fn test_scan_keeps_interior_braces() {
        let def = single("\\newcommand{\\b}[1]{\\textbf{{#1}}}");
        assert_eq!(def.template, "\\textbf{{#1}}");
    }

    #[test]
    fn test_scan_empty_optional_default() {
        let def = single("\\newcommand{\\foo}[1][]{<#1>}");
        assert_eq!(def.optional_default.as_deref(), Some(""));
    }

    #[test]
    fn test_scan_starred_form() {
        let def = single("\\newcommand*{\\foo}{bar}");
        assert_eq!(def.name, "foo");
    }

    #[test]
    fn test_malformed_declaration_does_not_halt_scan() {
        let text = "\\newcommand{\\good}{ok}\n\\newcommand\\bad{x}";
        let output = scan_definitions(text);
        assert_eq!(output.definitions.len(), 1);
        assert!(output.definitions.contains_key("good"));
        assert_eq!(
            output.diagnostics,
            vec![Diagnostic::new(2, 11, "expected `{` after \\newcommand")]
        );
    }

    #[test]
    fn test_recovery_finds_later_declaration() {
        let text = "\\newcommand{foo}{x} \\newcommand{\\bar}{y}";
        let output = scan_definitions(text);
        assert_eq!(output.definitions.len(), 1);
        assert_eq!(output.definitions["bar"].template, "y");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].message, "expected `\\` before macro name");
        assert_eq!(output.diagnostics[0].column, 12);
    }

    #[test]
    fn test_recovery_at_nested_keyword() {
        let output = scan_definitions("\\newcommand\\newcommand{\\a}{b}");
        assert_eq!(output.definitions["a"].template, "b");
        assert_eq!(output.diagnostics.len(), 1);
    }

    #[test]
    fn test_last_declaration_wins() {
        let output = scan_definitions("\\newcommand{\\x}{one}\n\\newcommand{\\x}[1]{two #1}");
        assert_eq!(output.definitions.len(), 1);
        assert_eq!(output.definitions["x"], MacroDefinition::new("x", "two #1", 1));
    }

    #[test]
    fn test_checkpoint_messages() {
        let cases = [
            ("\\newcommand{\\}{x}", "expected macro name"),
            ("\\newcommand{\\foo1}{x}", "expected `}` after macro name"),
            ("\\newcommand{\\foo}[1]x", "expected `{` to open macro body"),
            ("\\newcommand{\\foo}[def]{x}", "invalid argument count `def`"),
            ("\\newcommand{\\foo}[1", "unterminated `[` in declaration"),
            ("\\newcommand{\\foo}{x{y}", "unterminated macro body"),
            (
                "\\newcommand{\\foo}[0][d]{x}",
                "optional argument declared for a macro without arguments",
            ),
        ];
        for (text, message) in cases {
            let output = scan_definitions(text);
            assert!(output.definitions.is_empty(), "{text}");
            assert_eq!(output.diagnostics.len(), 1, "{text}");
            assert_eq!(output.diagnostics[0].message, message, "{text}");
        }
    }

    #[test]
    fn test_diagnostic_positions_across_lines() {
        let text = "line one\n  ünï \\newcommand{\\x}[two]{y}\n\\newcommand{\\z}[1]z";
        let output = scan_definitions(text);
        assert_eq!(
            output.diagnostics,
            vec![
                Diagnostic::new(2, 21, "invalid argument count `two`"),
                Diagnostic::new(3, 18, "expected `{` to open macro body"),
            ]
        );
    }

    #[test]
    fn test_arity_above_limit_rejected() {
        let text = "\\newcommand{\\foo}[18446744073709551615]{#1}\n\\newcommand{\\bar}[10]{#1}";
        let output = scan_definitions(text);
        assert!(output.definitions.is_empty());
        assert_eq!(
            output.diagnostics,
            vec![
                Diagnostic::new(1, 17, "invalid argument count `18446744073709551615`"),
                Diagnostic::new(2, 17, "invalid argument count `10`"),
            ]
        );

        let def = single("\\newcommand{\\nine}[9]{#9}");
        assert_eq!(def.arity, MAX_ARITY);
    }

    #[test]
    fn test_longer_keyword_is_not_a_declaration() {
        let output = scan_definitions("\\newcommandx{\\a}{b} \\newcommand{\\c}{d}");
        assert!(output.diagnostics.is_empty());
        assert_eq!(output.definitions.len(), 1);
        assert_eq!(output.definitions["c"].template, "d");
    }

    #[test]
    fn test_text_without_declarations() {
        let output = scan_definitions("\\foo{bar} and \\renewcommand{\\x}{y}");
        assert!(output.definitions.is_empty());
        assert!(output.diagnostics.is_empty());
    }
}
