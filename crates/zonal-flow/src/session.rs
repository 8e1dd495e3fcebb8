//! Analysis session: the explicit context threaded through every operation.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};
use zonal_affine::{LinearEquation, SymbolId, SymbolTable};
use zonal_core::{DomainMode, ErrorInfo, FloatFormat, Settings, SourceLocation, ZonalError};

use crate::controller::{ExecutionPath, PathState};
use crate::decision::{BranchRequest, BranchResolution, Comparison};
use crate::diagnosis::DiagnosisLog;
use crate::explorer::RegionKind;
use crate::memory::{Contribution, MergeMemory, MergeValue, SaveMemory};
use crate::trace::SyncTrace;

/// Summary of one exploration region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowReport {
    /// Passes executed.
    pub passes: usize,
    /// Feasible passes merged.
    pub contributions: usize,
    /// Passes excluded as infeasible.
    pub infeasible_passes: usize,
    /// Whether every pass contributed.
    pub complete: bool,
}

/// Settings, symbols, controller and diagnosis stream of one analysis run.
#[derive(Debug, Clone)]
pub struct Session {
    settings: Settings,
    saved_settings: Vec<Settings>,
    symbols: SymbolTable,
    path: ExecutionPath,
    diagnosis: DiagnosisLog,
}

impl Session {
    /// Starts a session; settings are validated once here.
    pub fn new(settings: Settings) -> Result<Self, ZonalError> {
        settings.validate()?;
        Ok(Self {
            symbols: SymbolTable::new(settings.track_error_origin),
            path: ExecutionPath::new(settings.analysis_mode),
            diagnosis: DiagnosisLog::default(),
            saved_settings: Vec::new(),
            settings,
        })
    }

    /// Active settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Domains tracked by the current pass.
    pub fn mode(&self) -> DomainMode {
        self.path.mode()
    }

    /// Controller state.
    pub fn state(&self) -> PathState {
        self.path.state()
    }

    /// Implementation floating-point format.
    pub fn format(&self) -> FloatFormat {
        self.settings.float_format
    }

    /// Noise symbol registry.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Mutable noise symbol registry.
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Execution path controller.
    pub fn path(&self) -> &ExecutionPath {
        &self.path
    }

    /// Diagnosis stream.
    pub fn diagnosis(&self) -> &DiagnosisLog {
        &self.diagnosis
    }

    /// Mutable diagnosis stream.
    pub fn diagnosis_mut(&mut self) -> &mut DiagnosisLog {
        &mut self.diagnosis
    }

    /// Copies the controller's unstable sites and counters into the diagnosis stream.
    pub fn snapshot_diagnosis(&mut self) -> &DiagnosisLog {
        self.diagnosis.unstable_sites = self.path.unstable_sites().to_vec();
        self.diagnosis.stats = self.path.stats().clone();
        &self.diagnosis
    }

    /// Pushes the current settings and installs `settings`.
    ///
    /// The domain mode and origin tracking stay those of the session start.
    pub fn save_settings(&mut self, settings: Settings) -> Result<(), ZonalError> {
        settings.validate()?;
        let previous = std::mem::replace(&mut self.settings, settings);
        self.saved_settings.push(previous);
        Ok(())
    }

    /// Restores the settings pushed by the matching [`Session::save_settings`].
    pub fn restore_settings(&mut self) -> Result<(), ZonalError> {
        match self.saved_settings.pop() {
            Some(previous) => {
                self.settings = previous;
                Ok(())
            }
            None => Err(ZonalError::Invariant(ErrorInfo::new(
                "settings-stack",
                "restore without a matching save",
            ))),
        }
    }

    /// Records `location` as the origin of subsequently created symbols.
    pub fn locate(&mut self, location: &SourceLocation) {
        if self.settings.track_error_origin {
            self.symbols.set_site(Some(location.clone()));
        }
    }

    /// Applies the configured symbol limit to `equation`.
    pub fn simplify(&mut self, equation: LinearEquation) -> LinearEquation {
        match (self.settings.noise_symbol_limit, self.settings.simplification_trigger()) {
            (Some(limit), Some(trigger)) if equation.len() > trigger => {
                if self.settings.support_verbose {
                    debug!(symbols = equation.len(), limit, "simplifying equation");
                }
                equation.bounded_simplify(limit, &mut self.symbols)
            }
            _ => equation,
        }
    }

    /// Settles an integer decision for the current pass.
    pub fn resolve(
        &mut self,
        location: &SourceLocation,
        request: &BranchRequest,
    ) -> Result<BranchResolution, ZonalError> {
        self.path.resolve(&self.settings, location, request)
    }

    /// Settles a boolean decision for the current pass.
    pub fn branch(&mut self, comparison: &Comparison, location: &SourceLocation) -> Result<bool, ZonalError> {
        self.resolve(location, &comparison.request())
            .map(|resolution| resolution.as_bool())
    }

    /// Error aborting the current branch.
    pub fn throw_empty_branch(&mut self, location: &SourceLocation, is_unstable: bool) -> ZonalError {
        self.path.throw_empty_branch(location, is_unstable)
    }

    /// Starts recording top-level unstable decisions.
    pub fn start_recording(&mut self) {
        self.path.start_recording();
    }

    /// Stops recording and returns the trace.
    pub fn take_recording(&mut self) -> Option<SyncTrace> {
        self.path.take_recording()
    }

    /// Follows the decisions of a previous run.
    pub fn follow_trace(&mut self, trace: SyncTrace) {
        self.path.follow_trace(trace);
    }

    /// Retires every symbol none of `live` references; returns how many were
    /// newly retired.
    ///
    /// Values outside `live` must not be used afterwards.
    pub fn retire_unreferenced<T: MergeValue>(&mut self, live: &[T]) -> usize {
        let retired = self.symbols.retire_unreferenced(&referenced(live));
        debug!(retired, live = self.symbols.live_count(), "symbols retired");
        retired
    }

    /// Runs a loop body region until every unstable iteration path was explored.
    pub fn continuous_flow<T, F>(
        &mut self,
        location: &SourceLocation,
        vars: &mut [T],
        body: F,
    ) -> Result<FlowReport, ZonalError>
    where
        T: MergeValue,
        F: FnMut(&mut Session, &mut [T]) -> Result<(), ZonalError>,
    {
        self.run_region(RegionKind::Loop, location, vars, body)
    }

    /// Runs a conditional region until every unstable branch was explored.
    pub fn branch_flow<T, F>(
        &mut self,
        location: &SourceLocation,
        vars: &mut [T],
        body: F,
    ) -> Result<FlowReport, ZonalError>
    where
        T: MergeValue,
        F: FnMut(&mut Session, &mut [T]) -> Result<(), ZonalError>,
    {
        self.run_region(RegionKind::Branch, location, vars, body)
    }

    fn run_region<T, F>(
        &mut self,
        kind: RegionKind,
        location: &SourceLocation,
        vars: &mut [T],
        mut body: F,
    ) -> Result<FlowReport, ZonalError>
    where
        T: MergeValue,
        F: FnMut(&mut Session, &mut [T]) -> Result<(), ZonalError>,
    {
        let saved = SaveMemory::capture(vars);
        let mut merge = MergeMemory::<T>::for_all(vars.len());
        self.path.enter_region(location.clone(), kind)?;
        let cursor = self.symbols.cursor();
        self.symbols.merge_table_mut().enter_region(cursor);

        let mut report = FlowReport::default();
        loop {
            if let Err(err) = self.path.begin_pass() {
                self.abandon_region(&saved, vars);
                return Err(err);
            }
            self.symbols.begin_pass();
            report.passes += 1;

            match body(self, vars) {
                Ok(()) => {
                    let contribution = Contribution {
                        mode: self.path.mode(),
                        concrete: self.path.on_concrete_path(),
                    };
                    if merge.absorb(vars, &contribution, &mut self.symbols) {
                        if self.settings.support_verbose {
                            debug!(%location, pass = report.passes, mode = ?contribution.mode, "pass merged");
                        }
                    } else {
                        warn!(%location, pass = report.passes, "infeasible pass excluded from merge");
                    }
                }
                Err(err) if err.is_branch_local() => {
                    merge.mark_incomplete();
                    warn!(%location, pass = report.passes, error = %err, "pass abandoned");
                }
                Err(err) => {
                    self.abandon_region(&saved, vars);
                    return Err(err);
                }
            }
            saved.restore(vars);

            match self.path.end_pass(&self.settings) {
                Ok(true) => continue,
                Ok(false) => break,
                Err(err) => {
                    self.abandon_region(&saved, vars);
                    return Err(err);
                }
            }
        }

        self.symbols.merge_table_mut().leave_region();
        self.path.leave_region()?;
        report.contributions = merge.contributions();
        report.infeasible_passes = merge.excluded();
        report.complete = merge.is_complete();
        if report.contributions == 0 {
            return Err(self.path.throw_empty_branch(location, true));
        }
        let required = self.path.mode();
        if let Err(err) = merge.write_back(vars, required, &mut self.symbols, location) {
            saved.restore(vars);
            return Err(err);
        }
        // Symbols of the region's passes survive only through the merged variables.
        let live = referenced(vars);
        let retired = self.symbols.retire_from(cursor, &live);
        if self.settings.support_verbose {
            info!(
                %location,
                ?kind,
                passes = report.passes,
                contributions = report.contributions,
                complete = report.complete,
                retired,
                "region merged"
            );
        }
        Ok(report)
    }

    fn abandon_region<T: Clone>(&mut self, saved: &SaveMemory<T>, vars: &mut [T]) {
        saved.restore(vars);
        self.symbols.merge_table_mut().leave_region();
        // The explorer may already be gone after a controller fault.
        let _ = self.path.leave_region();
    }
}

fn referenced<T: MergeValue>(values: &[T]) -> BTreeSet<SymbolId> {
    values.iter().flat_map(MergeValue::referenced_symbols).collect()
}
