/// Errors raised while preparing a macro expansion
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("macro name is empty")]
    EmptyName,

    #[error("invalid invocation pattern: {0}")]
    Pattern(#[from] regex::Error),
}
