//! The error kind shared across every crate in the workspace (§4.3, §7).
//!
//! Each crate defines its own `snafu`-derived `Error` enum scoped to its own
//! layer (grounded on `dicom-parser::stateful::decode::Error` and
//! `dicom-object::meta::Error` in the teacher crate), and implements
//! [`HasKind`] so that callers working across crate boundaries can still
//! dispatch on the five kinds the spec defines without caring which crate
//! raised the error.

use std::fmt;

/// The five ways a call into this library can fail.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum ErrorKind {
    /// An allocation failed, typically because a length field taken from
    /// untrusted input was implausibly large.
    OutOfMemory,
    /// The caller supplied an out-of-range argument, an operation was
    /// attempted with the wrong VR, or a mutation was attempted on a
    /// locked container.
    Invalid,
    /// The byte stream violates the format: a bad VR string, non-zero
    /// reserved bytes, a missing Item tag, a numeric length that isn't a
    /// multiple of the VR's size, or Basic Offset Table corruption.
    Parse,
    /// The underlying reader/seeker failed, or EOF was reached while more
    /// data was required.
    Io,
    /// `read_frame_position` found no frame at the requested coordinate.
    MissingFrame,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::Invalid => "invalid argument or operation",
            ErrorKind::Parse => "malformed DICOM stream",
            ErrorKind::Io => "I/O error",
            ErrorKind::MissingFrame => "no frame at the requested position",
        };
        f.write_str(s)
    }
}

/// Implemented by every crate-local `Error` type so that the kind can be
/// recovered without downcasting.
pub trait HasKind {
    /// The kind this error value falls under.
    fn kind(&self) -> ErrorKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_render_distinct_summaries() {
        let kinds = [
            ErrorKind::OutOfMemory,
            ErrorKind::Invalid,
            ErrorKind::Parse,
            ErrorKind::Io,
            ErrorKind::MissingFrame,
        ];
        let rendered: Vec<String> = kinds.iter().map(ToString::to_string).collect();
        let mut unique = rendered.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), rendered.len());
    }
}
