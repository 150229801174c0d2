use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::binary::CodecError;
use crate::database::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorCode {
    ReadFile,
    IncludeNotFound,
    UnexpectedToken,
    UnexpectedEof,
    BadKeyword,
    UnknownEntityType,
    UnknownHelper,
    UnknownValueType,
    UnknownBase,
    InvalidTags,
    InvalidIoType,
    TooManyAttributes,
    InvalidSpawnFlag,
    ListOnNonListType,
    MissingList,
    InvalidMapSize,
}

/// Fatal syntax error, located in the file that produced it.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub code: ParseErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Error)]
pub enum FgdError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}
