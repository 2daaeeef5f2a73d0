//! Errors generated by the flow graph compiler.
use std::fmt;

/// Convenience alias to represent success or failure of a compiler action.
pub type FlowResult<T> = Result<T, Error>;

/// An error generated by the compiler.
pub struct Error {
    kind: Box<ErrorKind>,
    /// Optional post-script printed after the main message.
    post_msg: Option<Box<String>>,
}

/// The specific kind of error that occurred.
enum ErrorKind {
    /// The input file is malformed or not a flow file at all.
    InvalidFile(String),
    /// The in-memory graph violates a structural requirement.
    MalformedStructure(String),
    /// A name is referenced but never defined.
    Undefined(String),
    /// Failed to write the output.
    WriteError(String),
    /// Errors that do not fit into any other category.
    Misc(String),
}

impl Error {
    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::InvalidFile(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn malformed_structure<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::MalformedStructure(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn undefined<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::Undefined(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::WriteError(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::Misc(msg.to_string())),
            post_msg: None,
        }
    }

    /// Attach a post-script to the error message.
    pub fn with_post_msg(mut self, msg: Option<String>) -> Self {
        self.post_msg = msg.map(Box::new);
        self
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidFile(msg)
            | ErrorKind::MalformedStructure(msg)
            | ErrorKind::Undefined(msg)
            | ErrorKind::WriteError(msg)
            | ErrorKind::Misc(msg) => msg.fmt(f),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(post) = &self.post_msg {
            write!(f, "\n{}", post)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::write_error(format!("IO error: {}", e))
    }
}

impl From<fmt::Error> for Error {
    fn from(e: fmt::Error) -> Self {
        Error::write_error(format!("formatting error: {}", e))
    }
}
