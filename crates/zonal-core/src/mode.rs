//! Domains a value or a pass tracks.

use serde::{Deserialize, Serialize};

/// Which of the two computations are currently tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DomainMode {
    /// Real and implementation computations advance together.
    #[default]
    RealAndImplementation,
    /// Only the idealized real computation is tracked.
    OnlyReal,
    /// Only the floating-point implementation is tracked.
    OnlyImplementation,
}

impl DomainMode {
    /// Whether the real half is meaningful in this mode.
    pub fn tracks_real(self) -> bool {
        !matches!(self, DomainMode::OnlyImplementation)
    }

    /// Whether the implementation half is meaningful in this mode.
    pub fn tracks_implementation(self) -> bool {
        !matches!(self, DomainMode::OnlyReal)
    }

    /// Smallest mode covering both operands.
    pub fn union(self, other: DomainMode) -> DomainMode {
        if self == other {
            self
        } else {
            DomainMode::RealAndImplementation
        }
    }

    /// Builds the mode tracking the requested halves, if any.
    pub fn from_halves(real: bool, implementation: bool) -> Option<DomainMode> {
        match (real, implementation) {
            (true, true) => Some(DomainMode::RealAndImplementation),
            (true, false) => Some(DomainMode::OnlyReal),
            (false, true) => Some(DomainMode::OnlyImplementation),
            (false, false) => None,
        }
    }

    /// Whether every half tracked by `other` is tracked by `self`.
    pub fn covers(self, other: DomainMode) -> bool {
        (self.tracks_real() || !other.tracks_real())
            && (self.tracks_implementation() || !other.tracks_implementation())
    }
}
