//! Element value length, with the `0xFFFF_FFFF` undefined-length sentinel
//! (grounded on `dicom-core::header::Length` of the teacher crate).

use std::cmp::Ordering;
use std::fmt;

const UNDEFINED_LEN: u32 = 0xFFFF_FFFF;

/// A data element's value length in bytes, or the undefined-length
/// sentinel (legal only for SQ and binary pixel-data elements, §3/§4.5).
///
/// Two undefined lengths never compare equal, and no ordering holds
/// when either side is undefined: callers must check
/// [`is_undefined`](Length::is_undefined) before relying on a comparison.
#[derive(Clone, Copy)]
pub struct Length(pub u32);

impl Length {
    /// The undefined-length sentinel, `0xFFFF_FFFF`.
    pub const UNDEFINED: Self = Length(UNDEFINED_LEN);

    /// A defined length of zero bytes.
    pub const ZERO: Self = Length(0);

    /// Wrap a raw 32-bit length, which may be the undefined sentinel.
    pub const fn new(len: u32) -> Self {
        Length(len)
    }

    /// Build a defined length.
    ///
    /// # Panics
    /// Panics if `len` is the undefined-length sentinel.
    pub fn defined(len: u32) -> Self {
        assert_ne!(len, UNDEFINED_LEN, "0xFFFF_FFFF is reserved for undefined length");
        Length(len)
    }

    /// Whether this length is the undefined sentinel.
    #[inline]
    pub fn is_undefined(self) -> bool {
        self.0 == UNDEFINED_LEN
    }

    /// The length as a `u32`, regardless of whether it is defined.
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for Length {
    fn from(v: u32) -> Self {
        Length(v)
    }
}

impl fmt::Debug for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() {
            f.write_str("Length(UNDEFINED)")
        } else {
            write!(f, "Length({})", self.0)
        }
    }
}

impl PartialEq for Length {
    fn eq(&self, rhs: &Length) -> bool {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => false,
            (l1, l2) => l1 == l2,
        }
    }
}

impl PartialOrd for Length {
    fn partial_cmp(&self, rhs: &Length) -> Option<Ordering> {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => None,
            (l1, l2) => Some(l1.cmp(&l2)),
        }
    }
}

impl std::ops::Add for Length {
    type Output = Self;

    fn add(self, rhs: Length) -> Self::Output {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => Length::UNDEFINED,
            (l1, l2) => Length(l1 + l2),
        }
    }
}

impl std::ops::Sub for Length {
    type Output = Self;

    fn sub(self, rhs: Length) -> Self::Output {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => Length::UNDEFINED,
            (l1, l2) => Length(l1 - l2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_never_equals_itself() {
        assert_ne!(Length::UNDEFINED, Length::UNDEFINED);
    }

    #[test]
    fn arithmetic_propagates_undefined() {
        assert!((Length::defined(64) + Length::UNDEFINED).is_undefined());
        assert!((Length::UNDEFINED + Length::from(8)).is_undefined());
    }

    #[test]
    fn ordering_is_none_when_either_side_undefined() {
        assert!(Length::defined(16) < Length::defined(64));
        assert!(!(Length::UNDEFINED < Length::defined(64)));
        assert!(!(Length::UNDEFINED > Length::defined(64)));
        assert!(!(Length::UNDEFINED < Length::UNDEFINED));
    }
}
