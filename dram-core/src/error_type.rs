//! The four possible outcomes of a decode: no error, corrected, detected
//! uncorrectable, or silent corruption.

use serde::{Deserialize, Serialize};

/// Outcome of a single ECC decode. Ordered worst-wins, except DUE always
/// dominates regardless of numeric order (see [`worse2`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    /// No error.
    Ne,
    /// Corrected error.
    Ce,
    /// Detected but uncorrectable error.
    Due,
    /// Silent data corruption.
    Sdc,
}

impl ErrorType {
    pub const ALL: [ErrorType; 4] = [ErrorType::Ne, ErrorType::Ce, ErrorType::Due, ErrorType::Sdc];

    pub fn name(self) -> &'static str {
        match self {
            ErrorType::Ne => "NE",
            ErrorType::Ce => "CE",
            ErrorType::Due => "DUE",
            ErrorType::Sdc => "SDC",
        }
    }
}

/// Combine two outcomes from independent codec-word decodes within the same
/// cacheline. DUE dominates everything; otherwise the worse (higher) of the
/// two wins. Note this is deliberately NOT the derived `Ord::max` — SDC and
/// DUE are not in "badness" order relative to each other except that DUE
/// always wins, matching `worse2ErrorType` in the original implementation.
pub fn worse2(a: ErrorType, b: ErrorType) -> ErrorType {
    if a == ErrorType::Due || b == ErrorType::Due {
        return ErrorType::Due;
    }
    if a > b {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worse2_is_symmetric() {
        for &a in ErrorType::ALL.iter() {
            for &b in ErrorType::ALL.iter() {
                assert_eq!(worse2(a, b), worse2(b, a));
            }
        }
    }

    #[test]
    fn due_always_dominates() {
        for &x in ErrorType::ALL.iter() {
            assert_eq!(worse2(ErrorType::Due, x), ErrorType::Due);
        }
    }

    #[test]
    fn otherwise_max_wins() {
        assert_eq!(worse2(ErrorType::Ne, ErrorType::Ce), ErrorType::Ce);
        assert_eq!(worse2(ErrorType::Ce, ErrorType::Sdc), ErrorType::Sdc);
        assert_eq!(worse2(ErrorType::Ne, ErrorType::Ne), ErrorType::Ne);
    }
}
