//! LaTeX command cleanup and `\newcommand` macro expansion.
//!
//! - [`clean()`] strips or unwraps a command such as `\revision{...}`,
//!   repeating until nested occurrences are gone.
//! - [`scan_definitions`] collects `\newcommand` declarations from a document.
//! - [`expand()`] substitutes invocations of one macro with its template.
//!
//! All operations work on whole in-memory strings and never fail on
//! malformed markup: problems come back as [`Diagnostic`] values or counts.

pub mod ast;
pub mod clean;
pub mod config;
pub mod error;
pub mod parser;
pub mod processor;
pub mod scanner;

pub use ast::{Diagnostic, Invocation, MacroDefinition, Token};
pub use clean::{Cleaned, MAX_PASSES, clean, clean_with_limit, command_prefix, wrap};
pub use config::{ConfigError, Settings};
pub use error::Error;
pub use processor::{Expander, Expansion, MacroRegistry, expand, expand_definition};
pub use scanner::{DECLARATION, MAX_ARITY, ScanOutput, scan_definitions};
