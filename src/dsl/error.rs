//! Error types for the track language compiler.

use std::fmt;

/// A span of source text, used to point diagnostics at the offending input.
///
/// `offset` and `length` are in bytes; `line` and `column` are 1-based and
/// count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceRange {
    pub offset: usize,
    pub length: usize,
    pub line: usize,
    pub column: usize,
}

impl SourceRange {
    pub fn new(offset: usize, length: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            length,
            line,
            column,
        }
    }

    /// The smallest range covering both `self` and `other`.
    ///
    /// Line and column are taken from whichever range starts first.
    pub fn to(self, other: SourceRange) -> SourceRange {
        let (first, last) = if self.offset <= other.offset {
            (self, other)
        } else {
            (other, self)
        };
        let end = (last.offset + last.length).max(first.offset + first.length);
        SourceRange {
            offset: first.offset,
            length: end - first.offset,
            line: first.line,
            column: first.column,
        }
    }
}

/// A user-facing diagnostic produced while compiling track source.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
    pub range: Option<SourceRange>,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LexError,
    ParseError,
    CheckError,
}

impl CompileError {
    pub fn lex(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            message: message.into(),
            range: Some(range),
            kind: ErrorKind::LexError,
        }
    }

    pub fn parse(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            message: message.into(),
            range: Some(range),
            kind: ErrorKind::ParseError,
        }
    }

    pub fn check(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            message: message.into(),
            range: Some(range),
            kind: ErrorKind::CheckError,
        }
    }

    pub fn line(&self) -> usize {
        self.range.map_or(0, |r| r.line)
    }

    pub fn column(&self) -> usize {
        self.range.map_or(0, |r| r.column)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range {
            Some(range) => write!(
                f,
                "[{}:{}] {:?}: {}",
                range.line, range.column, self.kind, self.message
            ),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for CompileError {}

/// Raised by the value model when a value does not have the requested type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub message: String,
}

impl TypeError {
    pub fn cannot_cast(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self {
            message: format!("Cannot cast value of type {from} to type {to}"),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TypeError {}

/// A broken invariant inside the generator.
///
/// The generator only runs on programs the checker accepted, so one of these
/// means the two disagree. It is never a user mistake and is kept apart from
/// [`CompileError`].
#[derive(Debug, Clone, PartialEq)]
pub struct InternalError {
    pub message: String,
    pub range: Option<SourceRange>,
}

impl InternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            range: None,
        }
    }

    pub fn at(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            message: message.into(),
            range: Some(range),
        }
    }
}

impl From<TypeError> for InternalError {
    fn from(err: TypeError) -> Self {
        Self::new(err.message)
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range {
            Some(range) => write!(
                f,
                "internal compiler error at {}:{}: {}",
                range.line, range.column, self.message
            ),
            None => write!(f, "internal compiler error: {}", self.message),
        }
    }
}

impl std::error::Error for InternalError {}

/// Why a compile produced no Program IR.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileFailure {
    /// One or more user-facing diagnostics, in source order.
    Diagnostics(Vec<CompileError>),
    Internal(InternalError),
}

impl CompileFailure {
    /// The diagnostics, or an empty slice for an internal failure.
    pub fn diagnostics(&self) -> &[CompileError] {
        match self {
            CompileFailure::Diagnostics(errors) => errors,
            CompileFailure::Internal(_) => &[],
        }
    }
}

impl From<CompileError> for CompileFailure {
    fn from(err: CompileError) -> Self {
        CompileFailure::Diagnostics(vec![err])
    }
}

impl From<InternalError> for CompileFailure {
    fn from(err: InternalError) -> Self {
        CompileFailure::Internal(err)
    }
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileFailure::Diagnostics(errors) => {
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{err}")?;
                }
                Ok(())
            }
            CompileFailure::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CompileFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_union_covers_both() {
        let a = SourceRange::new(4, 3, 1, 5);
        let b = SourceRange::new(10, 2, 1, 11);
        let joined = a.to(b);
        assert_eq!(joined, SourceRange::new(4, 8, 1, 5));
        assert_eq!(b.to(a), joined);
    }

    #[test]
    fn display_includes_position() {
        let err = CompileError::check("undefined identifier 'kick'", SourceRange::new(0, 4, 2, 7));
        assert_eq!(err.to_string(), "[2:7] CheckError: undefined identifier 'kick'");
    }

    #[test]
    fn type_error_message() {
        let err = TypeError::cannot_cast("number", "string");
        assert_eq!(err.message, "Cannot cast value of type number to type string");
    }

    #[test]
    fn internal_error_is_not_a_diagnostic() {
        let failure = CompileFailure::from(InternalError::new("missing binding"));
        assert!(failure.diagnostics().is_empty());
        assert!(failure.to_string().starts_with("internal compiler error"));
    }
}
