//! Error kinds and the carried error value.

use std::borrow::Cow;
use std::fmt;

/// Every failure the engine can raise, with a fixed numeric identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    /// An impossible dictionary entry tag was observed.
    InvalidDictEntryType = 1,
    /// An allocator refused a request.
    OutOfMemory = 2,
    /// `pop` on an empty data stack.
    DataStackUnderflow = 3,
    /// An invariant breach not otherwise classified.
    InternalError = 4,
    /// A token was looked up and not found.
    UndefinedWord = 5,
    /// A token where an identifier was required.
    NotAWord = 6,
}

impl Exception {
    /// The kind word used in diagnostics.
    pub fn description(self) -> &'static str {
        match self {
            Exception::InvalidDictEntryType => {
                "internal error invalid dictionary element type"
            }
            Exception::OutOfMemory => "out of memory",
            Exception::DataStackUnderflow => "dataStackUnderflow",
            Exception::InternalError => "internalError",
            Exception::UndefinedWord => "undefined word",
            Exception::NotAWord => "not a word",
        }
    }
}

impl From<Exception> for isize {
    fn from(e: Exception) -> Self {
        e as isize
    }
}

/// An error as it travels back to the public entry points: the kind plus a
/// short message supplied at the raise site (for an undefined word, the
/// offending token itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: Exception,
    message: Cow<'static, str>,
}

impl Error {
    pub fn new<M: Into<Cow<'static, str>>>(kind: Exception, message: M) -> Error {
        Error {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> Exception {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {}", self.kind.description(), self.message)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_fixed() {
        assert_eq!(isize::from(Exception::InvalidDictEntryType), 1);
        assert_eq!(isize::from(Exception::OutOfMemory), 2);
        assert_eq!(isize::from(Exception::DataStackUnderflow), 3);
        assert_eq!(isize::from(Exception::InternalError), 4);
        assert_eq!(isize::from(Exception::UndefinedWord), 5);
        assert_eq!(isize::from(Exception::NotAWord), 6);
    }

    #[test]
    fn display_matches_diagnostic_format() {
        let e = Error::new(Exception::UndefinedWord, "notaword".to_string());
        assert_eq!(format!("{}", e), "undefined word, notaword");
    }
}
