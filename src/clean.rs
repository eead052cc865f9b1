//! Command stripping.
//!
//! Removes every `\command{...}` occurrence from a text, either keeping the
//! argument (unwrap) or dropping it (remove). A single pass only resolves the
//! outermost occurrence of a nested chain, so passes repeat until the text
//! stops changing.

/// Upper bound on stripping passes before giving up on a fixed point
pub const MAX_PASSES: usize = 100;

/// Result of stripping a command from a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cleaned {
    pub text: String,
    /// Occurrences matched and closed, summed over all passes
    pub count: usize,
    /// False when the pass limit was hit before the text stopped changing
    pub converged: bool,
}

/// Build the match prefix for a bare command name: `revision` -> `\revision{`.
pub fn command_prefix(name: &str) -> String {
    format!("\\{name}{{")
}

/// Wrap `text` in the named command: `\name{text}`.
pub fn wrap(text: &str, name: &str) -> String {
    format!("\\{name}{{{text}}}")
}

/// Strip `prefix` occurrences from `text` until a fixed point is reached.
///
/// `prefix` must include the opening brace (see [`command_prefix`]). With
/// `discard_argument` the argument text is dropped along with the command,
/// otherwise it is kept in place.
///
/// An occurrence whose braces never close swallows the rest of the text.
pub fn clean(text: &str, prefix: &str, discard_argument: bool) -> Cleaned {
    clean_with_limit(text, prefix, discard_argument, MAX_PASSES)
}

/// [`clean`] with an explicit pass limit.
pub fn clean_with_limit(
    text: &str,
    prefix: &str,
    discard_argument: bool,
    max_passes: usize,
) -> Cleaned {
    if prefix.is_empty() {
        return Cleaned {
            text: text.to_owned(),
            count: 0,
            converged: true,
        };
    }

    let mut current = text.to_owned();
    let mut count = 0;
    let mut passes = 0;
    // A pass leaves text without the prefix unchanged and always changes
    // text that contains it, so the fixed point is reached exactly when the
    // prefix is gone.
    while current.contains(prefix) {
        if passes == max_passes {
            tracing::warn!(
                prefix,
                max_passes,
                count,
                "Command stripping stopped at pass limit"
            );
            return Cleaned {
                text: current,
                count,
                converged: false,
            };
        }
        let (next, found) = clean_pass(&current, prefix, discard_argument);
        passes += 1;
        count += found;
        current = next;
    }

    tracing::debug!(prefix, passes, count, "Command stripping reached fixed point");
    Cleaned {
        text: current,
        count,
        converged: true,
    }
}

/// One left-to-right pass. Returns the new text and the number of
/// occurrences closed in this pass.
fn clean_pass(text: &str, prefix: &str, discard_argument: bool) -> (String, usize) {
    let mut cleaned = String::with_capacity(text.len());
    let mut pending = String::new();
    let mut recording = false;
    let mut depth = 0usize;
    let mut found = 0;

    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if !recording && rest.starts_with(prefix) {
            recording = true;
            depth += 1;
            rest = &rest[prefix.len()..];
            continue;
        }
        rest = &rest[c.len_utf8()..];

        match c {
            '{' if recording => {
                pending.push(c);
                depth += 1;
            }
            '}' if recording => {
                if depth == 1 {
                    recording = false;
                    if !discard_argument {
                        cleaned.push_str(&pending);
                    }
                    pending.clear();
                    found += 1;
                } else {
                    pending.push(c);
                }
                depth -= 1;
            }
            _ if recording => pending.push(c),
            _ => cleaned.push(c),
        }
    }

    // Anything still pending belongs to an unterminated occurrence and is dropped
    (cleaned, found)
}
