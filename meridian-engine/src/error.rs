//! Engine error type.

use std::error;
use std::fmt::{self, Display};
use std::result;

use crate::fen::ParseFenError;

/// Engine generic result type.
pub type Result<T> = result::Result<T, Error>;

/// A list specifying general errors for the engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Uci received an unknown command.
    UciUnknownCommand,
    /// Uci received no command string.
    UciNoCommand,
    /// Uci position command malformed.
    UciPositionMalformed,
    /// Uci position command given illegal move.
    UciPositionIllegalMove,
    /// Fen error kinds.
    Fen,

    /// Time Management Mode cannot be created, missing fields.
    ModeNotSatisfied,

    /// The engine can only play games with a finite static number of moves.
    /// That limit has been exceeded.
    MoveHistoryExceeded,

    /// Engine's transposition table is being referenced from another thread.
    EngineTranspositionTableInUse,
    /// Engine is currently searching, so another search cannot be started.
    EngineAlreadySearching,

    /// An illegal move was provided, and could not be applied to some base position.
    GameIllegalMove,

    /// An opening book file could not be read or parsed.
    BookUnreadable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UciUnknownCommand => "uci unknown command",
            ErrorKind::UciNoCommand => "uci no command",
            ErrorKind::UciPositionMalformed => "uci position malformed",
            ErrorKind::UciPositionIllegalMove => "uci position illegal move",
            ErrorKind::Fen => "fen",

            ErrorKind::ModeNotSatisfied => "mode not satisfied",

            ErrorKind::MoveHistoryExceeded => "move history exceeded",

            ErrorKind::EngineTranspositionTableInUse => "engine transposition table in use",
            ErrorKind::EngineAlreadySearching => "engine already searching",

            ErrorKind::GameIllegalMove => "position history illegal move",

            ErrorKind::BookUnreadable => "opening book unreadable",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The primary and general error type for the engine.
#[derive(Debug)]
pub enum Error {
    Simple(ErrorKind),
    Message(ErrorKind, String),
    Custom(ErrorKind, Box<dyn error::Error + Send + Sync>),
}

impl Error {
    pub fn new<E>(error_kind: ErrorKind, inner_error: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::Custom(error_kind, inner_error.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Simple(kind) | Error::Message(kind, _) | Error::Custom(kind, _) => *kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Simple(error_kind) => {
                write!(f, "{error_kind}")
            }
            Error::Message(error_kind, string) => {
                write!(f, "{error_kind}: {string}")
            }
            Error::Custom(error_kind, ref box_error) => {
                write!(f, "{error_kind}, error: {}", *box_error)
            }
        }
    }
}

impl error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(error_kind: ErrorKind) -> Self {
        Self::Simple(error_kind)
    }
}

impl From<ParseFenError> for Error {
    fn from(error: ParseFenError) -> Self {
        Self::Custom(ErrorKind::Fen, error.into())
    }
}

impl<S: ToString> From<(ErrorKind, S)> for Error {
    fn from((error_kind, stringable): (ErrorKind, S)) -> Self {
        Self::Message(error_kind, stringable.to_string())
    }
}
