use serde::{Deserialize, Serialize};
use zonal_affine::SymbolKind;
use zonal_core::{DomainMode, ErrorInfo, Interval, SchemaVersion, SourceLocation, ZonalError, DIAGNOSIS_SCHEMA};

use crate::controller::{PathStats, UnstableSite};

/// Share of a value's error attributed to one noise symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginContribution {
    /// Location the symbol was created at.
    pub location: Option<SourceLocation>,
    /// Kind of the symbol.
    pub kind: SymbolKind,
    /// Magnitude of its coefficient in the error equation.
    pub magnitude: f64,
}

/// One persisted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    /// Caller-supplied tag.
    pub prefix: String,
    /// Domains the value tracked.
    pub mode: DomainMode,
    /// Real range, when tracked.
    pub real: Option<Interval>,
    /// Implementation range, when tracked.
    pub implementation: Option<Interval>,
    /// Range of the difference between both domains, when both are tracked.
    pub error: Option<Interval>,
    /// Midpoint of the implementation range.
    pub scalar: f64,
    /// Concrete implementation scalar.
    pub concrete: f64,
    /// Per-origin error contributions, largest first.
    #[serde(default)]
    pub origins: Vec<OriginContribution>,
    /// Written by a light persist.
    #[serde(default)]
    pub light: bool,
}

/// In-memory stream of diagnosis records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisLog {
    /// Layout version.
    pub schema_version: SchemaVersion,
    /// Records in persist order.
    pub records: Vec<DiagnosisRecord>,
    /// Unstable decisions followed without exploration.
    #[serde(default)]
    pub unstable_sites: Vec<UnstableSite>,
    /// Decision counters at the time of the last snapshot.
    #[serde(default)]
    pub stats: PathStats,
}

impl Default for DiagnosisLog {
    fn default() -> Self {
        Self {
            schema_version: DIAGNOSIS_SCHEMA,
            records: Vec::new(),
            unstable_sites: Vec::new(),
            stats: PathStats::default(),
        }
    }
}

impl DiagnosisLog {
    /// Appends a record.
    pub fn push(&mut self, record: DiagnosisRecord) {
        self.records.push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was persisted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Last record written under `prefix`.
    pub fn last(&self, prefix: &str) -> Option<&DiagnosisRecord> {
        self.records.iter().rev().find(|r| r.prefix == prefix)
    }

    /// Scalar of the last record written under `prefix`.
    pub fn read_scalar(&self, prefix: &str) -> Option<f64> {
        self.last(prefix).map(|r| r.scalar)
    }

    /// Serializes the log to pretty JSON.
    pub fn to_json(&self) -> Result<String, ZonalError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| ZonalError::Serde(ErrorInfo::new("serialize-json", err.to_string())))
    }

    /// Restores a log from JSON.
    pub fn from_json(json: &str) -> Result<Self, ZonalError> {
        let log: DiagnosisLog = serde_json::from_str(json)
            .map_err(|err| ZonalError::Serde(ErrorInfo::new("deserialize-json", err.to_string())))?;
        log.check_schema()
    }

    /// Serializes the log with `bincode`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ZonalError> {
        bincode::serialize(self)
            .map_err(|err| ZonalError::Serde(ErrorInfo::new("serialize-bytes", err.to_string())))
    }

    /// Restores a log from its `bincode` form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ZonalError> {
        let log: DiagnosisLog = bincode::deserialize(bytes)
            .map_err(|err| ZonalError::Serde(ErrorInfo::new("deserialize-bytes", err.to_string())))?;
        log.check_schema()
    }

    fn check_schema(self) -> Result<Self, ZonalError> {
        if DIAGNOSIS_SCHEMA.reads(&self.schema_version) {
            Ok(self)
        } else {
            Err(ZonalError::Serde(
                ErrorInfo::new("diagnosis-schema", "unsupported diagnosis schema")
                    .with_context("major", self.schema_version.major)
                    .with_context("minor", self.schema_version.minor),
            ))
        }
    }
}
