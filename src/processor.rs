use std::collections::HashMap;

use regex::Regex;

use crate::ast::*;
use crate::error::Error;
use crate::parser::TemplateParser;
use crate::scanner::{DECLARATION, ScanOutput, is_name_char, scan_definitions};

/// Outcome of expanding invocations in a text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub text: String,
    /// Invocations successfully substituted
    pub replaced: usize,
    /// Invocations left in place because their arguments could not be read
    pub diagnostics: Vec<Diagnostic>,
}

impl Expansion {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            ..Self::default()
        }
    }
}

/// Expand every invocation of `\name` in `text`.
///
/// Declaration sites (`\newcommand{\name}`) are never treated as
/// invocations. A malformed invocation is left untouched and reported in
/// [`Expansion::diagnostics`]; the others are still expanded.
pub fn expand(
    text: &str,
    name: &str,
    template: &str,
    arity: usize,
    optional_default: Option<&str>,
) -> Expansion {
    match Expander::new(name, template, arity, optional_default) {
        Ok(expander) => expander.expand(text),
        Err(e) => {
            tracing::warn!(name, error = %e, "Cannot expand macro");
            Expansion::unchanged(text)
        }
    }
}

/// [`expand`] driven by a scanned definition
pub fn expand_definition(text: &str, definition: &MacroDefinition) -> Expansion {
    expand(
        text,
        &definition.name,
        &definition.template,
        definition.arity,
        definition.optional_default.as_deref(),
    )
}

/// Expands the invocations of a single macro
#[derive(Debug)]
pub struct Expander<'a> {
    name: &'a str,
    tokens: Vec<Token<'a>>,
    arity: usize,
    optional_default: Option<&'a str>,
    pattern: Regex,
}

impl<'a> Expander<'a> {
    pub fn new(
        name: &'a str,
        template: &'a str,
        arity: usize,
        optional_default: Option<&'a str>,
    ) -> Result<Self, Error> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }

        // A match that includes the declaration prefix is the declaration site
        let pattern = Regex::new(&format!(
            r"({}\*?\{{)?\\{}",
            regex::escape(DECLARATION),
            regex::escape(name)
        ))?;

        let tokens = TemplateParser::parse_template(template).unwrap_or_else(|e| {
            tracing::warn!(name, error = %e, "Template did not parse, using it verbatim");
            vec![Token::Literal(template)]
        });

        Ok(Self {
            name,
            tokens,
            arity,
            optional_default,
            pattern,
        })
    }

    /// Expand all invocations in `text`, last one first
    pub fn expand(&self, text: &str) -> Expansion {
        let sites = self.find_sites(text);
        let mut result = text.to_owned();
        let mut replaced = 0;
        let mut diagnostics = Vec::new();

        // Splicing from the back keeps the offsets of earlier sites valid
        for &start in sites.iter().rev() {
            match self.extract(&result, start) {
                Ok(invocation) => {
                    let replacement = self.substitute(&invocation.args);
                    let range = invocation.start..invocation.end();
                    result.replace_range(range, &replacement);
                    replaced += 1;
                }
                Err(diagnostic) => {
                    tracing::debug!(
                        name = self.name,
                        line = diagnostic.line,
                        column = diagnostic.column,
                        message = %diagnostic.message,
                        "Leaving malformed invocation unexpanded"
                    );
                    diagnostics.push(diagnostic);
                }
            }
        }

        // Report in textual order
        diagnostics.reverse();

        tracing::debug!(
            name = self.name,
            sites = sites.len(),
            replaced,
            "Expanded macro invocations"
        );
        Expansion {
            text: result,
            replaced,
            diagnostics,
        }
    }

    /// Byte offsets of the escape character of every invocation site
    fn find_sites(&self, text: &str) -> Vec<usize> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let m = caps.get(0)?;
                if caps.get(1).is_some() {
                    return None;
                }
                // `\name` followed by a letter is a longer control word
                if text[m.end()..].chars().next().is_some_and(is_name_char) {
                    return None;
                }
                Some(m.start())
            })
            .collect()
    }

    /// Read the arguments of the invocation starting at `start`
    fn extract<'t>(&self, text: &'t str, start: usize) -> Result<Invocation<'t>, Diagnostic>
    where
        'a: 't,
    {
        let mut pos = start + 1 + self.name.len();
        let mut args = Vec::new();

        if self.arity > 0 {
            let required = required_groups(self.arity, self.optional_default.is_some());
            if required > 0 && !text[pos..].starts_with(['{', '[']) {
                return Err(Diagnostic::at_offset(
                    text,
                    pos,
                    format!("expected `{{` or `[` after \\{}", self.name),
                ));
            }

            if let Some(default) = self.optional_default {
                if text[pos..].starts_with('[') {
                    let (arg, next) = bracket_group(text, pos).ok_or_else(|| {
                        Diagnostic::at_offset(
                            text,
                            start,
                            format!("unterminated optional argument of \\{}", self.name),
                        )
                    })?;
                    args.push(arg);
                    pos = next;
                } else {
                    args.push(default);
                }
            }

            for _ in 0..required {
                let index = args.len() + 1;
                if !text[pos..].starts_with('{') {
                    return Err(Diagnostic::at_offset(
                        text,
                        pos,
                        format!("expected `{{` for argument {index} of \\{}", self.name),
                    ));
                }
                let (arg, next) = brace_group(text, pos).ok_or_else(|| {
                    Diagnostic::at_offset(
                        text,
                        start,
                        format!("unterminated argument {index} of \\{}", self.name),
                    )
                })?;
                args.push(arg);
                pos = next;
            }
        }

        Ok(Invocation {
            start,
            len: pos - start,
            args,
        })
    }

    /// Fill the template with `args`; markers without an argument stay as written
    fn substitute(&self, args: &[&str]) -> String {
        let mut result = String::new();
        for token in &self.tokens {
            match *token {
                Token::Literal(s) => result.push_str(s),
                Token::Positional(n) => match n.checked_sub(1).and_then(|i| args.get(i)) {
                    Some(arg) => result.push_str(arg),
                    None => {
                        result.push('#');
                        result.push_str(&n.to_string());
                    }
                },
            }
        }
        result
    }
}

/// Content of the `{...}` group opening at `open`, and the offset after it
fn brace_group(text: &str, open: usize) -> Option<(&str, usize)> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + i;
                    return Some((&text[open + 1..close], close + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Content of the `[...]` group opening at `open`. A `]` inside braces does
/// not close it.
fn bracket_group(text: &str, open: usize) -> Option<(&str, usize)> {
    let mut depth = 0usize;
    for (i, c) in text[open + 1..].char_indices() {
        match c {
            ']' if depth == 0 => {
                let close = open + 1 + i;
                return Some((&text[open + 1..close], close + 1));
            }
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Registry of macro definitions, keyed by name
#[derive(Debug, Default, Clone)]
pub struct MacroRegistry(HashMap<String, MacroDefinition>);

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `source` for declarations and merge them in. Definitions already
    /// present are replaced by later ones of the same name.
    pub fn load(&mut self, source: &str) -> Vec<Diagnostic> {
        let ScanOutput {
            definitions,
            diagnostics,
        } = scan_definitions(source);
        self.0.extend(definitions);
        diagnostics
    }

    /// Register a macro definition
    pub fn define(&mut self, definition: MacroDefinition) {
        self.0.insert(definition.name.clone(), definition);
    }

    /// Get a macro definition by name
    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.0.get(name)
    }

    /// Check if a macro is defined
    pub fn is_defined(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Defined names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Expand the named macros one after another, in the order given.
    ///
    /// Each macro is applied to the output of the previous one, so its
    /// diagnostics are positioned in that intermediate text.
    pub fn expand_with<'n>(&self, text: &str, names: impl IntoIterator<Item = &'n str>) -> Expansion {
        let mut expansion = Expansion::unchanged(text);
        for name in names {
            let Some(definition) = self.get(name) else {
                tracing::warn!(name, "Skipping undefined macro");
                continue;
            };
            let step = expand_definition(&expansion.text, definition);
            expansion.text = step.text;
            expansion.replaced += step.replaced;
            expansion.diagnostics.extend(step.diagnostics);
        }
        expansion
    }

    /// Expand every registered macro, in name order
    pub fn expand_all(&self, text: &str) -> Expansion {
        self.expand_with(text, self.names())
    }
}
