use std::fmt;

use thiserror::Error;

use crate::codegen::error::StackError;

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Where a translation failure happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Assembly / type / method path, outermost first
    pub context: String,
    /// Byte offset of the source instruction being processed
    pub offset: Option<u32>,
    /// Source opcode name
    pub opcode: Option<&'static str>,
    /// Source line from the debug line map, if any
    pub line: Option<u32>,
}

impl Location {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            offset: None,
            opcode: None,
            line: None,
        }
    }

    pub fn at(mut self, offset: u32, opcode: &'static str, line: Option<u32>) -> Self {
        self.offset = Some(offset);
        self.opcode = Some(opcode);
        self.line = line;
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.context)?;
        if let Some(line) = self.line {
            write!(f, ", line {}", line)?;
        }
        if let Some(opcode) = self.opcode {
            write!(f, ", opcode {}", opcode)?;
        }
        if let Some(offset) = self.offset {
            write!(f, ", offset IL_{:04x}", offset)?;
        }
        Ok(())
    }
}

/// Error types for the translator
#[derive(Error, Debug)]
pub enum Error {
    /// An opcode or operand shape with no defined translation
    #[error("Unsupported construct: {message}")]
    Unsupported { message: String },

    /// Method too large for the target offset space, or an empty body
    #[error("Size or format limit: {message}")]
    Limit { message: String },

    /// Operand types structurally incompatible with the operation
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },

    /// Internal invariant violation
    #[error("Internal translator error: {message}")]
    Internal { message: String },

    #[error("{source} (at {location})")]
    Located {
        location: Location,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported { message: message.into() }
    }

    pub fn limit(message: impl Into<String>) -> Self {
        Self::Limit { message: message.into() }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Attach a location. Already-located errors pass through unchanged;
    /// internal faults are reported with the generic message.
    pub fn located(self, location: Location) -> Self {
        match self {
            Error::Located { .. } => self,
            Error::Internal { message } => {
                log::debug!("internal fault reclassified at {}: {}", location, message);
                Error::Located {
                    location,
                    source: Box::new(Error::Internal {
                        message: "unexpected opcode or operand".to_string(),
                    }),
                }
            }
            other => Error::Located {
                location,
                source: Box::new(other),
            },
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Error::Located { location, .. } => Some(location),
            _ => None,
        }
    }

    /// The underlying error with any location wrapper removed
    pub fn kind(&self) -> &Error {
        match self {
            Error::Located { source, .. } => source.kind(),
            other => other,
        }
    }

    pub fn is_limit(&self) -> bool {
        matches!(self.kind(), Error::Limit { .. })
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self.kind(), Error::TypeMismatch { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind(), Error::Unsupported { .. })
    }
}

impl From<StackError> for Error {
    fn from(err: StackError) -> Self {
        match err {
            StackError::FrameMismatch { .. } => Self::TypeMismatch { message: err.to_string() },
            other => Self::Internal {
                message: format!("type state error: {}", other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn located_errors_are_not_rewrapped() {
        let err = Error::unsupported("calli").located(Location::new("A::M").at(4, "calli", Some(12)));
        let again = err.located(Location::new("other").at(8, "nop", None));
        let loc = again.location().unwrap();
        assert_eq!(loc.context, "A::M");
        assert_eq!(loc.offset, Some(4));
        assert_eq!(loc.line, Some(12));
        assert!(again.is_unsupported());
    }

    #[test]
    fn internal_faults_get_generic_message() {
        let err = Error::internal("stack underflow").located(Location::new("A::M").at(0, "add", None));
        assert_eq!(err.kind().to_string(), "Internal translator error: unexpected opcode or operand");
    }

    #[test]
    fn location_display_names_offset_and_opcode() {
        let loc = Location::new("asm / A / M").at(0x1a, "ldind.i4", Some(7));
        assert_eq!(loc.to_string(), "asm / A / M, line 7, opcode ldind.i4, offset IL_001a");
    }
}
