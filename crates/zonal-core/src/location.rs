use std::fmt;

use serde::{Deserialize, Serialize};

/// Source position of an instrumented branch, conversion or region.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File the decision appears in.
    pub file: String,
    /// One-based line number.
    pub line: u32,
}

impl SourceLocation {
    /// Creates a location from a file name and line.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Expands to the [`SourceLocation`] of the macro invocation.
#[macro_export]
macro_rules! here {
    () => {
        $crate::SourceLocation::new(file!(), line!())
    };
}
