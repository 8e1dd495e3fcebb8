use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zonal_core::{ErrorInfo, SchemaVersion, SourceLocation, ZonalError, TRACE_SCHEMA};

/// One recorded top-level decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Source location of the decision.
    pub location: SourceLocation,
    /// Outcome that was followed.
    pub outcome: i128,
}

/// Sequence of decisions a later run can follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTrace {
    /// Layout version.
    pub schema_version: SchemaVersion,
    /// Decisions in execution order.
    pub entries: Vec<TraceEntry>,
    #[serde(skip)]
    cursor: usize,
}

impl Default for SyncTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTrace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self {
            schema_version: TRACE_SCHEMA,
            entries: Vec::new(),
            cursor: 0,
        }
    }

    /// Appends a decision.
    pub fn record(&mut self, location: SourceLocation, outcome: i128) {
        self.entries.push(TraceEntry { location, outcome });
    }

    /// Number of entries not yet followed.
    pub fn remaining(&self) -> usize {
        self.entries.len().saturating_sub(self.cursor)
    }

    /// Rewinds the follow cursor.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Consumes the next entry, which must be recorded at `location`.
    pub fn follow(&mut self, location: &SourceLocation) -> Result<i128, ZonalError> {
        let Some(entry) = self.entries.get(self.cursor) else {
            return Err(ZonalError::Desync(
                ErrorInfo::new("trace-exhausted", "no recorded decision left to follow")
                    .at(location)
                    .with_context("entries", self.entries.len()),
            ));
        };
        if &entry.location != location {
            return Err(ZonalError::Desync(
                ErrorInfo::new("trace-location", "recorded decision was taken elsewhere")
                    .at(location)
                    .with_context("recorded", &entry.location)
                    .with_context("index", self.cursor),
            ));
        }
        self.cursor += 1;
        Ok(entry.outcome)
    }

    /// Serializes the trace to pretty JSON.
    pub fn to_json(&self) -> Result<String, ZonalError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| ZonalError::Serde(ErrorInfo::new("serialize-json", err.to_string())))
    }

    /// Restores a trace from JSON.
    pub fn from_json(json: &str) -> Result<Self, ZonalError> {
        let trace: SyncTrace = serde_json::from_str(json)
            .map_err(|err| ZonalError::Serde(ErrorInfo::new("deserialize-json", err.to_string())))?;
        trace.check_schema()
    }

    /// Serializes the trace with `bincode`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ZonalError> {
        bincode::serialize(self)
            .map_err(|err| ZonalError::Serde(ErrorInfo::new("serialize-bytes", err.to_string())))
    }

    /// Restores a trace from its `bincode` form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ZonalError> {
        let trace: SyncTrace = bincode::deserialize(bytes)
            .map_err(|err| ZonalError::Serde(ErrorInfo::new("deserialize-bytes", err.to_string())))?;
        trace.check_schema()
    }

    /// SHA-256 digest of the recorded decisions.
    pub fn canonical_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.schema_version.major.to_le_bytes());
        hasher.update(self.schema_version.minor.to_le_bytes());
        hasher.update((self.entries.len() as u64).to_le_bytes());
        for entry in &self.entries {
            let file = entry.location.file.as_bytes();
            hasher.update((file.len() as u64).to_le_bytes());
            hasher.update(file);
            hasher.update(entry.location.line.to_le_bytes());
            hasher.update(entry.outcome.to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    fn check_schema(self) -> Result<Self, ZonalError> {
        if TRACE_SCHEMA.reads(&self.schema_version) {
            Ok(self)
        } else {
            Err(ZonalError::Serde(
                ErrorInfo::new("trace-schema", "unsupported trace schema")
                    .with_context("major", self.schema_version.major)
                    .with_context("minor", self.schema_version.minor),
            ))
        }
    }
}
