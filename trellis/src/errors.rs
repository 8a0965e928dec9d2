//! Definition of errors.

use std::error::Error;
use std::fmt;

pub type Result<T, E = HmmError> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum HmmError {
    MalformedTable(MalformedTableError),
    UndefinedState(UndefinedStateError),
    InvalidModel(InvalidModelError),
    InvalidArgument(InvalidArgumentError),
    DecodeError(bincode::error::DecodeError),
    EncodeError(bincode::error::EncodeError),
    IOError(std::io::Error),
}

impl HmmError {
    pub(crate) fn malformed_table<S>(line: usize, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::MalformedTable(MalformedTableError {
            line,
            msg: msg.into(),
        })
    }

    pub(crate) fn undefined_state<S, M>(state: S, msg: M) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        Self::UndefinedState(UndefinedStateError {
            state: state.into(),
            msg: msg.into(),
        })
    }

    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel(InvalidModelError { msg: msg.into() })
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }
}

impl fmt::Display for HmmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MalformedTable(e) => e.fmt(f),
            Self::UndefinedState(e) => e.fmt(f),
            Self::InvalidModel(e) => e.fmt(f),
            Self::InvalidArgument(e) => e.fmt(f),
            Self::DecodeError(e) => e.fmt(f),
            Self::EncodeError(e) => e.fmt(f),
            Self::IOError(e) => e.fmt(f),
        }
    }
}

impl Error for HmmError {}

/// Error used when a line of a probability table cannot be parsed.
#[derive(Debug)]
pub struct MalformedTableError {
    /// Line number (1-origin) of the offending line.
    pub(crate) line: usize,

    /// Error message.
    pub(crate) msg: String,
}

impl MalformedTableError {
    /// Line number (1-origin) of the offending line.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl fmt::Display for MalformedTableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MalformedTableError: line {}: {}", self.line, self.msg)
    }
}

impl Error for MalformedTableError {}

/// Error used when sampling reaches a state without a usable distribution.
#[derive(Debug)]
pub struct UndefinedStateError {
    /// Label of the state.
    pub(crate) state: String,

    /// Error message.
    pub(crate) msg: String,
}

impl UndefinedStateError {
    /// Label of the state.
    pub fn state(&self) -> &str {
        &self.state
    }
}

impl fmt::Display for UndefinedStateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UndefinedStateError: {}: {}", self.state, self.msg)
    }
}

impl Error for UndefinedStateError {}

/// Error used when the model is invalid.
#[derive(Debug)]
pub struct InvalidModelError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidModelError: {}", self.msg)
    }
}

impl Error for InvalidModelError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

impl From<bincode::error::DecodeError> for HmmError {
    fn from(error: bincode::error::DecodeError) -> Self {
        Self::DecodeError(error)
    }
}

impl From<bincode::error::EncodeError> for HmmError {
    fn from(error: bincode::error::EncodeError) -> Self {
        Self::EncodeError(error)
    }
}

impl From<std::io::Error> for HmmError {
    fn from(error: std::io::Error) -> Self {
        Self::IOError(error)
    }
}
