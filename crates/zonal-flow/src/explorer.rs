use serde::{Deserialize, Serialize};
use zonal_core::{DomainMode, ErrorInfo, SourceLocation, ZonalError};

/// Kind of exploration region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    /// Conditional code with diverging branches.
    Branch,
    /// Loop body whose iteration count may diverge.
    Loop,
}

/// One decision met during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPoint {
    /// Source location of the decision.
    pub location: SourceLocation,
    /// Number of outcomes the decision has.
    pub count: u128,
    /// Outcome followed by the current pass.
    pub chosen: u128,
}

/// Depth-first enumerator of the decision sequences of a region.
///
/// Each pass replays the recorded prefix of decisions and opens a new
/// decision point, at outcome zero, past it. After the pass, the deepest
/// decision with outcomes left is advanced and everything below it dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathExplorer {
    origin: SourceLocation,
    kind: RegionKind,
    entry_mode: DomainMode,
    entry_concrete: bool,
    decisions: Vec<DecisionPoint>,
    cursor: usize,
    passes: usize,
}

impl PathExplorer {
    /// Creates an explorer for a region entered in `entry_mode`.
    pub fn new(
        origin: SourceLocation,
        kind: RegionKind,
        entry_mode: DomainMode,
        entry_concrete: bool,
    ) -> Self {
        Self {
            origin,
            kind,
            entry_mode,
            entry_concrete,
            decisions: Vec::new(),
            cursor: 0,
            passes: 0,
        }
    }

    /// Location of the region.
    pub fn origin(&self) -> &SourceLocation {
        &self.origin
    }

    /// Kind of the region.
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Domain mode every pass starts in.
    pub fn entry_mode(&self) -> DomainMode {
        self.entry_mode
    }

    /// Whether the region was entered on the concrete execution path.
    pub fn entry_concrete(&self) -> bool {
        self.entry_concrete
    }

    /// Passes completed so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Decisions of the current pass.
    pub fn decisions(&self) -> &[DecisionPoint] {
        &self.decisions
    }

    /// Outcome the current pass follows at `location`.
    pub fn choose(&mut self, location: &SourceLocation, count: u128) -> Result<u128, ZonalError> {
        if let Some(point) = self.decisions.get(self.cursor) {
            if &point.location != location || point.count != count {
                return Err(ZonalError::Desync(
                    ErrorInfo::new("replay-mismatch", "decision differs from the replayed prefix")
                        .at(location)
                        .with_context("expected", &point.location)
                        .with_context("expected_count", point.count)
                        .with_context("count", count)
                        .with_context("region", &self.origin),
                ));
            }
            self.cursor += 1;
            return Ok(point.chosen);
        }
        self.decisions.push(DecisionPoint {
            location: location.clone(),
            count,
            chosen: 0,
        });
        self.cursor += 1;
        Ok(0)
    }

    /// Moves to the next decision sequence; `false` once all were explored.
    pub fn advance(&mut self) -> bool {
        self.passes += 1;
        self.decisions.truncate(self.cursor);
        self.cursor = 0;
        while let Some(last) = self.decisions.last_mut() {
            if last.chosen + 1 < last.count {
                last.chosen += 1;
                return true;
            }
            self.decisions.pop();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_the_product_of_counts() {
        let a = SourceLocation::new("a.c", 1);
        let b = SourceLocation::new("a.c", 2);
        let mut explorer =
            PathExplorer::new(a.clone(), RegionKind::Branch, DomainMode::default(), true);
        let mut seen = Vec::new();
        loop {
            let first = explorer.choose(&a, 2).expect("first");
            let second = explorer.choose(&b, 3).expect("second");
            seen.push((first, second));
            if !explorer.advance() {
                break;
            }
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], (0, 0));
        assert_eq!(seen[5], (1, 2));
        assert_eq!(explorer.passes(), 6);
    }
}
