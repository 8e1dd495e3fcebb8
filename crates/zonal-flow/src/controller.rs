//! Execution path controller.
//!
//! Owns the current domain mode, the stack of path explorers and the
//! unstable-branch bookkeeping. Decisions that the real and implementation
//! computations could settle differently are either followed along one
//! domain (outside exploration regions) or enumerated by the innermost
//! explorer, one outcome per pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zonal_core::{DomainMode, ErrorInfo, Settings, SourceLocation, ZonalError};

use crate::conversion::{conversion_branch, conversion_number, OutcomeKind};
use crate::decision::{BranchRequest, BranchResolution, ResolutionKind};
use crate::explorer::{PathExplorer, RegionKind};
use crate::trace::SyncTrace;

/// Observable state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathState {
    /// Both domains are tracked and synchronized.
    CompareFlow,
    /// Only the implementation is tracked, with no merge pending.
    OnlyFloat,
    /// Only the real computation is tracked, with no merge pending.
    OnlyReal,
    /// Only the implementation is tracked until the enclosing region merges.
    OnlyFloatWithFutureMerge,
    /// Only the real computation is tracked until the enclosing region merges.
    OnlyRealWithFutureMerge,
    /// An invariant was violated; every further decision fails.
    BadState,
}

/// Counters over every decision seen by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStats {
    /// Calls that reached the branch splitter.
    pub split_calls: u64,
    /// Unstable decisions followed along one domain without exploration.
    pub unstable: u64,
    /// Divergences tolerated below the threshold.
    pub tolerated: u64,
    /// Branches abandoned because no continuation was feasible.
    pub empty_branches: u64,
    /// Decisions taken from a followed trace.
    pub followed_from_trace: u64,
}

/// Per-location decision counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCounter {
    /// Decisions every tracked domain agreed on.
    pub stable: u64,
    /// Decisions enumerated by an explorer.
    pub explored: u64,
    /// Unstable decisions followed without exploration.
    pub unstable: u64,
}

/// Unstable decision that was followed without exploring its alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstableSite {
    /// Location of the decision.
    pub location: SourceLocation,
    /// Real outcome range.
    pub real: Option<(i128, i128)>,
    /// Implementation outcome range.
    pub implementation: Option<(i128, i128)>,
    /// Outcome that was followed.
    pub followed: i128,
    /// Origins of the enclosing regions, innermost last.
    pub backtrace: Vec<SourceLocation>,
}

/// Mode switches, explorers and unstable-branch bookkeeping of one session.
#[derive(Debug, Clone)]
pub struct ExecutionPath {
    base_mode: DomainMode,
    mode: DomainMode,
    explorers: Vec<PathExplorer>,
    concrete_path: bool,
    recording: Option<SyncTrace>,
    following: Option<SyncTrace>,
    fault: Option<ErrorInfo>,
    stats: PathStats,
    unstable_sites: Vec<UnstableSite>,
    counters: BTreeMap<SourceLocation, BranchCounter>,
}

impl ExecutionPath {
    /// Creates a controller tracking `mode` outside every region.
    pub fn new(mode: DomainMode) -> Self {
        Self {
            base_mode: mode,
            mode,
            explorers: Vec::new(),
            concrete_path: true,
            recording: None,
            following: None,
            fault: None,
            stats: PathStats::default(),
            unstable_sites: Vec::new(),
            counters: BTreeMap::new(),
        }
    }

    /// Current state derived from the mode, explorers and faults.
    pub fn state(&self) -> PathState {
        if self.fault.is_some() {
            return PathState::BadState;
        }
        let pending = !self.explorers.is_empty();
        match (self.mode, pending) {
            (DomainMode::RealAndImplementation, _) => PathState::CompareFlow,
            (DomainMode::OnlyImplementation, false) => PathState::OnlyFloat,
            (DomainMode::OnlyReal, false) => PathState::OnlyReal,
            (DomainMode::OnlyImplementation, true) => PathState::OnlyFloatWithFutureMerge,
            (DomainMode::OnlyReal, true) => PathState::OnlyRealWithFutureMerge,
        }
    }

    /// Domains tracked by the current pass.
    pub fn mode(&self) -> DomainMode {
        self.mode
    }

    /// Domains tracked outside every region.
    pub fn base_mode(&self) -> DomainMode {
        self.base_mode
    }

    /// Whether the current pass follows the concrete implementation execution.
    pub fn on_concrete_path(&self) -> bool {
        self.concrete_path
    }

    /// Number of open regions.
    pub fn depth(&self) -> usize {
        self.explorers.len()
    }

    /// Innermost explorer.
    pub fn explorer(&self) -> Option<&PathExplorer> {
        self.explorers.last()
    }

    /// Decision counters.
    pub fn stats(&self) -> &PathStats {
        &self.stats
    }

    /// Unstable decisions followed without exploration.
    pub fn unstable_sites(&self) -> &[UnstableSite] {
        &self.unstable_sites
    }

    /// Per-location decision counters.
    pub fn counters(&self) -> &BTreeMap<SourceLocation, BranchCounter> {
        &self.counters
    }

    /// Starts recording top-level unstable decisions.
    pub fn start_recording(&mut self) {
        self.recording = Some(SyncTrace::new());
    }

    /// Stops recording and returns the trace.
    pub fn take_recording(&mut self) -> Option<SyncTrace> {
        self.recording.take()
    }

    /// Follows the decisions of a previously recorded trace.
    pub fn follow_trace(&mut self, mut trace: SyncTrace) {
        trace.rewind();
        self.following = Some(trace);
    }

    /// Stops following a trace and returns it.
    pub fn stop_following(&mut self) -> Option<SyncTrace> {
        self.following.take()
    }

    fn fail(&mut self, info: ErrorInfo) -> ZonalError {
        self.fault = Some(info.clone());
        ZonalError::Invariant(info)
    }

    fn check_state(&self, operation: &str) -> Result<(), ZonalError> {
        match &self.fault {
            Some(info) => Err(ZonalError::Invariant(
                info.clone().with_context("operation", operation),
            )),
            None => Ok(()),
        }
    }

    fn counter(&mut self, location: &SourceLocation) -> &mut BranchCounter {
        self.counters.entry(location.clone()).or_default()
    }

    /// Settles a decision for the current pass.
    pub fn resolve(
        &mut self,
        settings: &Settings,
        location: &SourceLocation,
        request: &BranchRequest,
    ) -> Result<BranchResolution, ZonalError> {
        self.check_state("resolve")?;
        let real = if self.mode.tracks_real() {
            request.real
        } else {
            None
        };
        let implementation = if self.mode.tracks_implementation() {
            request.implementation
        } else {
            None
        };
        let stable = match (real, implementation) {
            (Some((a, b)), Some((c, d))) if a == b && c == d && a == c => Some(a),
            (Some((a, b)), None) if a == b => Some(a),
            (None, Some((c, d))) if c == d => Some(c),
            (None, None) => {
                return Err(self.fail(
                    ErrorInfo::new("empty-request", "decision carries no tracked outcome")
                        .at(location)
                        .with_context("mode", format!("{:?}", self.mode)),
                ))
            }
            _ => None,
        };
        if let Some(value) = stable {
            self.counter(location).stable += 1;
            return Ok(match self.mode {
                DomainMode::RealAndImplementation => BranchResolution::stable(value),
                DomainMode::OnlyReal => BranchResolution {
                    value,
                    real: Some(value),
                    implementation: None,
                    kind: ResolutionKind::Stable,
                },
                DomainMode::OnlyImplementation => BranchResolution {
                    value,
                    real: None,
                    implementation: Some(value),
                    kind: ResolutionKind::Stable,
                },
            });
        }

        if settings.support_threshold && self.mode == DomainMode::RealAndImplementation {
            if let Some((c, d)) = implementation {
                if c == d && request.error_magnitude < settings.threshold {
                    self.stats.tolerated += 1;
                    if settings.support_verbose {
                        debug!(%location, outcome = c, error = request.error_magnitude, "divergence tolerated");
                    }
                    return Ok(BranchResolution {
                        value: c,
                        real: Some(c),
                        implementation: Some(c),
                        kind: ResolutionKind::Tolerated,
                    });
                }
            }
        }

        let narrowed = BranchRequest {
            real,
            implementation,
            ..*request
        };
        if let Some(resolution) = self.split_branches(settings, location, &narrowed)? {
            return Ok(resolution);
        }
        // Single-domain state without a pending merge: follow that domain.
        let value = match self.mode {
            DomainMode::OnlyReal => request.representative.or(real.map(|r| r.0)),
            _ => request.concrete.or(implementation.map(|i| i.0)),
        };
        let Some(value) = value else {
            return Err(self.fail(
                ErrorInfo::new("no-outcome", "undecided outcome without a concrete witness")
                    .at(location),
            ));
        };
        self.counter(location).unstable += 1;
        Ok(BranchResolution {
            value,
            real: real.map(|_| value),
            implementation: implementation.map(|_| value),
            kind: ResolutionKind::Followed,
        })
    }

    /// Handles a decision some tracked domain leaves open.
    ///
    /// Returns `None` in the single-domain states without pending merge. Outside
    /// every explorer, or inside a loop region when unstable loops are not
    /// explored, the implementation outcome is followed and the site recorded.
    /// Otherwise the innermost explorer selects the outcome pair of this pass.
    pub fn split_branches(
        &mut self,
        settings: &Settings,
        location: &SourceLocation,
        request: &BranchRequest,
    ) -> Result<Option<BranchResolution>, ZonalError> {
        match self.state() {
            PathState::BadState => {
                self.check_state("split_branches")?;
            }
            PathState::OnlyFloat | PathState::OnlyReal => return Ok(None),
            _ => {}
        }
        self.stats.split_calls += 1;

        let explorable = match self.explorers.last() {
            None => false,
            Some(explorer) => {
                explorer.kind() == RegionKind::Branch || settings.support_unstable_in_loop
            }
        };
        if !explorable {
            return self.follow_unstable(settings, location, request).map(Some);
        }

        let (first_real, last_real) = request.real.unwrap_or((1, 0));
        let (first_impl, last_impl) = request.implementation.unwrap_or((1, 0));
        let count = conversion_number(first_real, last_real, first_impl, last_impl);
        if count == 0 {
            return Err(self.fail(
                ErrorInfo::new("empty-request", "decision has no outcome to explore").at(location),
            ));
        }
        if count > settings.path_limit as u128 {
            return Err(ZonalError::Config(
                ErrorInfo::new("path-limit", "decision has more outcomes than the path limit")
                    .at(location)
                    .with_context("outcomes", count)
                    .with_context("limit", settings.path_limit)
                    .with_hint("raise path_limit or narrow the input ranges"),
            ));
        }
        let index = match self.explorers.last_mut() {
            Some(explorer) => explorer.choose(location, count)?,
            None => {
                return Err(self.fail(ErrorInfo::new("no-explorer", "explorer vanished").at(location)))
            }
        };
        let Some(outcome) = conversion_branch(first_real, last_real, first_impl, last_impl, index)
        else {
            return Err(self.fail(
                ErrorInfo::new("branch-index", "explorer chose an outcome past the last branch")
                    .at(location)
                    .with_context("index", index)
                    .with_context("count", count),
            ));
        };
        let Some(value) = outcome.followed() else {
            return Err(self.fail(
                ErrorInfo::new("branch-outcome", "enumerated outcome has no followed value")
                    .at(location),
            ));
        };

        let kind = match outcome.kind {
            OutcomeKind::Synchronized => ResolutionKind::Synchronized,
            OutcomeKind::RealOnly => {
                self.mode = DomainMode::OnlyReal;
                self.concrete_path = false;
                ResolutionKind::RealOnly
            }
            OutcomeKind::ImplementationOnly => {
                self.mode = DomainMode::OnlyImplementation;
                ResolutionKind::ImplementationOnly
            }
        };
        if kind != ResolutionKind::RealOnly && outcome.implementation != request.concrete {
            self.concrete_path = false;
        }
        self.counter(location).explored += 1;
        if settings.support_verbose {
            debug!(
                %location,
                branch = index,
                branches = count,
                real = ?outcome.real,
                implementation = ?outcome.implementation,
                ?kind,
                "split"
            );
        }
        Ok(Some(BranchResolution {
            value,
            real: match kind {
                ResolutionKind::ImplementationOnly => None,
                _ => outcome.real,
            },
            implementation: match kind {
                ResolutionKind::RealOnly => None,
                _ => outcome.implementation,
            },
            kind,
        }))
    }

    fn follow_unstable(
        &mut self,
        settings: &Settings,
        location: &SourceLocation,
        request: &BranchRequest,
    ) -> Result<BranchResolution, ZonalError> {
        let witness = request
            .concrete
            .or(request.implementation.map(|i| i.0))
            .or(request.representative)
            .or(request.real.map(|r| r.0));
        let Some(mut value) = witness else {
            return Err(self.fail(
                ErrorInfo::new("no-outcome", "undecided outcome without a concrete witness")
                    .at(location),
            ));
        };
        if self.explorers.is_empty() {
            if let Some(trace) = self.following.as_mut() {
                value = trace.follow(location)?;
                if !reachable(request, value) {
                    return Err(ZonalError::Desync(
                        ErrorInfo::new("trace-outcome", "recorded outcome is out of reach of the live decision")
                            .at(location)
                            .with_context("recorded", value)
                            .with_context("real", format!("{:?}", request.real))
                            .with_context("implementation", format!("{:?}", request.implementation)),
                    ));
                }
                self.stats.followed_from_trace += 1;
            }
            if let Some(trace) = self.recording.as_mut() {
                trace.record(location.clone(), value);
            }
        }
        let backtrace = if settings.support_backtrace {
            self.explorers.iter().map(|e| e.origin().clone()).collect()
        } else {
            Vec::new()
        };
        warn!(
            %location,
            real = ?request.real,
            implementation = ?request.implementation,
            followed = value,
            "unstable branch followed along the implementation"
        );
        self.stats.unstable += 1;
        self.counter(location).unstable += 1;
        self.unstable_sites.push(UnstableSite {
            location: location.clone(),
            real: request.real,
            implementation: request.implementation,
            followed: value,
            backtrace,
        });
        Ok(BranchResolution {
            value,
            real: request.real.map(|_| value),
            implementation: request.implementation.map(|_| value),
            kind: ResolutionKind::Followed,
        })
    }

    /// Error aborting the current branch because it has no feasible continuation.
    pub fn throw_empty_branch(&mut self, location: &SourceLocation, is_unstable: bool) -> ZonalError {
        self.stats.empty_branches += 1;
        ZonalError::EmptyBranch(
            ErrorInfo::new("empty-branch", "no feasible continuation")
                .at(location)
                .with_context("unstable", is_unstable)
                .with_context("depth", self.explorers.len()),
        )
    }

    /// Opens an exploration region.
    pub fn enter_region(&mut self, origin: SourceLocation, kind: RegionKind) -> Result<(), ZonalError> {
        self.check_state("enter_region")?;
        self.explorers
            .push(PathExplorer::new(origin, kind, self.mode, self.concrete_path));
        Ok(())
    }

    /// Resets the mode before a pass of the innermost region.
    pub fn begin_pass(&mut self) -> Result<(), ZonalError> {
        match self.explorers.last() {
            Some(explorer) => {
                self.mode = explorer.entry_mode();
                self.concrete_path = explorer.entry_concrete();
                Ok(())
            }
            None => Err(self.fail(ErrorInfo::new("no-region", "pass started outside any region"))),
        }
    }

    /// Closes a pass; `true` when the innermost region needs another one.
    pub fn end_pass(&mut self, settings: &Settings) -> Result<bool, ZonalError> {
        let Some(explorer) = self.explorers.last_mut() else {
            return Err(self.fail(ErrorInfo::new("no-region", "pass ended outside any region")));
        };
        let more = explorer.advance();
        if more && explorer.passes() >= settings.path_limit {
            return Err(ZonalError::Config(
                ErrorInfo::new("path-limit", "region needs more passes than the path limit")
                    .at(explorer.origin())
                    .with_context("passes", explorer.passes())
                    .with_context("limit", settings.path_limit),
            ));
        }
        Ok(more)
    }

    /// Closes the innermost region and restores its entry mode.
    pub fn leave_region(&mut self) -> Result<PathExplorer, ZonalError> {
        match self.explorers.pop() {
            Some(explorer) => {
                self.mode = explorer.entry_mode();
                self.concrete_path = explorer.entry_concrete();
                Ok(explorer)
            }
            None => Err(self.fail(ErrorInfo::new("no-region", "no region to leave"))),
        }
    }

    /// Switches the domains tracked outside every region.
    pub fn set_base_mode(&mut self, mode: DomainMode) -> Result<(), ZonalError> {
        if !self.explorers.is_empty() {
            return Err(self.fail(ErrorInfo::new(
                "mode-in-region",
                "base mode changed inside an exploration region",
            )));
        }
        self.base_mode = mode;
        self.mode = mode;
        Ok(())
    }
}

/// Whether `value` is an outcome one of the tracked domains can take.
fn reachable(request: &BranchRequest, value: i128) -> bool {
    [request.real, request.implementation]
        .into_iter()
        .flatten()
        .any(|(lo, hi)| lo <= value && value <= hi)
}
