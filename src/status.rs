//! Domain outcome codes.
//!
//! A [`Status`] says *what happened* inside the business logic. It has
//! nothing to do with HTTP: `2001` might mean "todo not found" and render a
//! 404, a redirect or a friendly HTML page depending on the callback the
//! application registers for it.
//!
//! Two shapes exist and they never compare equal to each other:
//!
//! ```rust
//! use verdict::Status;
//!
//! let single = Status::from(2001);
//! let combined = Status::from([1007, 2001]);
//!
//! assert_eq!(single.to_string(), "2001");
//! assert_eq!(combined.to_string(), "[1007, 2001]");
//! assert_ne!(Status::from(2001), Status::from([2001]));
//! ```
//!
//! Equality and hashing are structural, so two independently built
//! `Status::from([1007, 2001])` values are the same registry key.

use std::fmt;

/// A domain outcome: a scalar code or an ordered sequence of outcomes.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    Code(u32),
    Sequence(Vec<Status>),
}

impl Status {
    /// Returns the scalar code, if this is not a sequence.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Code(code) => Some(*code),
            Self::Sequence(_) => None,
        }
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        Self::Code(code)
    }
}

impl<T: Into<Status>> From<Vec<T>> for Status {
    fn from(statuses: Vec<T>) -> Self {
        Self::Sequence(statuses.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Status>, const N: usize> From<[T; N]> for Status {
    fn from(statuses: [T; N]) -> Self {
        Self::Sequence(statuses.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Sequence(statuses) => {
                f.write_str("[")?;
                for (i, status) in statuses.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{status}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn sequences_compare_structurally() {
        let mut seen = HashSet::new();
        seen.insert(Status::from(vec![1007, 2001]));

        assert!(seen.contains(&Status::from([1007, 2001])));
        assert!(!seen.contains(&Status::from([2001, 1007])));
        assert!(!seen.contains(&Status::from([1007])));
    }

    #[test]
    fn scalar_and_single_sequence_differ() {
        assert_ne!(Status::from(1007), Status::from([1007]));
        assert_eq!(Status::from(1007).code(), Some(1007));
        assert_eq!(Status::from([1007]).code(), None);
    }

    #[test]
    fn nested_sequences_display() {
        let nested = Status::Sequence(vec![Status::Code(1), Status::from([2, 3])]);
        assert_eq!(nested.to_string(), "[1, [2, 3]]");
        assert_eq!(Status::Sequence(Vec::new()).to_string(), "[]");
    }
}
