//! Error taxonomy shared by the schema compiler and the runtime codecs.
//!
//! Compile-time errors (`SchemaSyntaxError`, tag collisions reported as
//! `InvalidFieldState`) abort schema compilation. Runtime decode errors
//! (`UnknownConstructor`, `TruncatedBuffer`) come from untrusted input and are
//! returned to the caller, never raised as panics.

/// Errors produced while compiling a schema or reading/writing TL buffers.
#[derive(Debug, thiserror::Error)]
pub enum TlError {
    /// Malformed schema text. Positions are 1-based.
    #[error("schema syntax error at {line}:{column}: {message}")]
    SchemaSyntaxError {
        line: usize,
        column: usize,
        message: String,
    },
    /// A leading constructor tag matched no known combinator.
    #[error("unknown constructor 0x{tag:08x}")]
    UnknownConstructor { tag: u32 },
    /// A field offset or length prefix points past the end of the buffer.
    #[error("truncated buffer: need {needed} bytes at offset {offset}, have {available}")]
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// Wire input that is structurally invalid: a reserved length marker, or
    /// objects nested deeper than the reader allows.
    #[error("malformed input at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },
    /// Builder given a value that contradicts the flag bits, or a schema whose
    /// combinators cannot coexist (tag or name collision).
    #[error("invalid field state: {0}")]
    InvalidFieldState(String),
    /// A field refers to a type the schema does not define.
    #[error("unknown type: {0}")]
    UnknownType(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TlError>;

impl TlError {
    pub(crate) fn truncated(buf_len: usize, offset: usize, needed: usize) -> Self {
        TlError::TruncatedBuffer {
            offset,
            needed,
            available: buf_len.saturating_sub(offset),
        }
    }

    pub(crate) fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        TlError::SchemaSyntaxError {
            line,
            column,
            message: message.into(),
        }
    }

    /// True for errors caused by untrusted wire input (as opposed to a broken
    /// schema or a misused builder). Callers map these to protocol errors.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            TlError::UnknownConstructor { .. }
                | TlError::TruncatedBuffer { .. }
                | TlError::Malformed { .. }
        )
    }
}
