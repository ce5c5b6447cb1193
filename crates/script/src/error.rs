/// Errors raised while parsing or evaluating a script.
///
/// The `Display` text is what ends up in the interpreter result and in the
/// `errorInfo` variable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("invalid command name \"{0}\"")]
    UnknownCommand(String),

    #[error("can't read \"{0}\": no such variable")]
    NoSuchVariable(String),

    #[error("wrong # args: should be \"{0}\"")]
    WrongArgs(String),

    /// Malformed script text.
    #[error("{0}")]
    Syntax(String),

    /// A command ran and reported failure; the message is shown verbatim.
    #[error("{0}")]
    Failed(String),

    /// A command failed and has already delivered its message to the user.
    #[error("{0}")]
    Reported(String),

    #[error("too many nested evaluations (infinite loop?)")]
    RecursionLimit,
}

impl ScriptError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Reported(_))
    }
}

pub type ScriptResult<T = String> = Result<T, ScriptError>;
