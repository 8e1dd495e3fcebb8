use serde::{Deserialize, Serialize};

/// Three-valued outcome of a predicate over a range of executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tristate {
    /// Holds for every execution.
    True,
    /// Fails for every execution.
    False,
    /// Holds for some executions only.
    Top,
}

impl Tristate {
    /// Decided tristate of a boolean.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Tristate::True
        } else {
            Tristate::False
        }
    }

    /// Whether the outcome is the same for every execution.
    pub fn is_decided(self) -> bool {
        !matches!(self, Tristate::Top)
    }

    /// Logical negation.
    pub fn not(self) -> Self {
        match self {
            Tristate::True => Tristate::False,
            Tristate::False => Tristate::True,
            Tristate::Top => Tristate::Top,
        }
    }

    /// Integer outcome range, `1` standing for true.
    pub fn outcome_range(self) -> (i128, i128) {
        match self {
            Tristate::True => (1, 1),
            Tristate::False => (0, 0),
            Tristate::Top => (0, 1),
        }
    }
}

/// Result of comparing two values in every tracked domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Verdict over the real domain, when tracked.
    pub real: Option<Tristate>,
    /// Verdict over the implementation domain, when tracked.
    pub implementation: Option<Tristate>,
    /// Outcome of the concrete implementation scalars.
    pub concrete: bool,
    /// Outcome at the centre of the real domain.
    pub representative: bool,
    /// Upper bound on the error of the compared difference.
    pub error_magnitude: f64,
}

impl Comparison {
    /// `True`/`False` only when every tracked domain agrees.
    pub fn verdict(&self) -> Tristate {
        match (self.real, self.implementation) {
            (Some(r), Some(i)) if r == i => r,
            (Some(_), Some(_)) => Tristate::Top,
            (Some(r), None) => r,
            (None, Some(i)) => i,
            (None, None) => Tristate::Top,
        }
    }

    /// Comparison of the negated predicate.
    pub fn not(&self) -> Self {
        Self {
            real: self.real.map(Tristate::not),
            implementation: self.implementation.map(Tristate::not),
            concrete: !self.concrete,
            representative: !self.representative,
            error_magnitude: self.error_magnitude,
        }
    }

    /// Decision request handed to the controller.
    pub fn request(&self) -> BranchRequest {
        BranchRequest {
            real: self.real.map(Tristate::outcome_range),
            implementation: self.implementation.map(Tristate::outcome_range),
            concrete: Some(i128::from(self.concrete)),
            representative: Some(i128::from(self.representative)),
            error_magnitude: self.error_magnitude,
        }
    }
}

/// Integer outcomes a decision can take in each tracked domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchRequest {
    /// Inclusive outcome range of the real domain.
    pub real: Option<(i128, i128)>,
    /// Inclusive outcome range of the implementation domain.
    pub implementation: Option<(i128, i128)>,
    /// Outcome of the concrete implementation scalar.
    pub concrete: Option<i128>,
    /// Outcome at the centre of the real domain.
    pub representative: Option<i128>,
    /// Upper bound on the error separating both domains.
    pub error_magnitude: f64,
}

/// How a decision was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionKind {
    /// Every tracked domain agrees on one outcome.
    Stable,
    /// Explored pass where both domains take the same outcome.
    Synchronized,
    /// Explored pass following the real outcome only.
    RealOnly,
    /// Explored pass following the implementation outcome only.
    ImplementationOnly,
    /// Unstable decision settled by following one domain without exploring.
    Followed,
    /// Divergence below the configured threshold.
    Tolerated,
}

/// Outcome selected for the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchResolution {
    /// Outcome the instrumented program continues with.
    pub value: i128,
    /// Outcome of the real domain, when it follows this pass.
    pub real: Option<i128>,
    /// Outcome of the implementation domain, when it follows this pass.
    pub implementation: Option<i128>,
    /// How the outcome was chosen.
    pub kind: ResolutionKind,
}

impl BranchResolution {
    /// Outcome shared by both domains.
    pub fn stable(value: i128) -> Self {
        Self {
            value,
            real: Some(value),
            implementation: Some(value),
            kind: ResolutionKind::Stable,
        }
    }

    /// Boolean view of the outcome.
    pub fn as_bool(&self) -> bool {
        self.value != 0
    }
}
