//! Layout versions of serialized traces and diagnosis logs.

use serde::{Deserialize, Serialize};

/// Version stamped on every serialized trace and diagnosis payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Incremented for layout changes readers cannot skip over.
    pub major: u32,
    /// Incremented for additive fields.
    pub minor: u32,
}

impl SchemaVersion {
    /// Creates a schema version descriptor.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether a reader at `self` can decode a payload written at `written`.
    pub fn reads(&self, written: &SchemaVersion) -> bool {
        self.major == written.major && self.minor >= written.minor
    }
}

/// Current layout of synchronization trace payloads.
pub const TRACE_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0);

/// Current layout of diagnosis records.
pub const DIAGNOSIS_SCHEMA: SchemaVersion = SchemaVersion::new(1, 1);
