//! Analysis settings and their YAML form.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, ZonalError};
use crate::format::FloatFormat;
use crate::mode::DomainMode;

/// Analysis-wide switches, read once when a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Compute `abs`, `min`, `max` as value operations instead of branches.
    #[serde(default = "default_true")]
    pub support_atomic: bool,
    /// Explore unstable decisions met inside loop regions.
    #[serde(default = "default_true")]
    pub support_unstable_in_loop: bool,
    /// Attach the enclosing region origins to unstable sites.
    #[serde(default)]
    pub support_backtrace: bool,
    /// Emit debug events for every split, pass and merge.
    #[serde(default)]
    pub support_verbose: bool,
    /// Tolerate divergences whose error magnitude stays below `threshold`.
    #[serde(default)]
    pub support_threshold: bool,
    /// Error magnitude below which a divergence is tolerated.
    #[serde(default)]
    pub threshold: f64,
    /// Record the source location each noise symbol was created at.
    #[serde(default)]
    pub track_error_origin: bool,
    /// Maximum number of noise symbols kept per equation.
    #[serde(default)]
    pub noise_symbol_limit: Option<usize>,
    /// Growth, in percent of the limit, tolerated before simplifying.
    #[serde(default = "default_trigger_percent")]
    pub simplification_trigger_percent: u32,
    /// Domains tracked outside exploration regions.
    #[serde(default)]
    pub analysis_mode: DomainMode,
    /// Floating-point format of the analysed program.
    #[serde(default)]
    pub float_format: FloatFormat,
    /// Maximum outcomes per decision and passes per region.
    #[serde(default = "default_path_limit")]
    pub path_limit: usize,
}

fn default_true() -> bool {
    true
}

fn default_trigger_percent() -> u32 {
    100
}

fn default_path_limit() -> usize {
    1 << 16
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            support_atomic: true,
            support_unstable_in_loop: true,
            support_backtrace: false,
            support_verbose: false,
            support_threshold: false,
            threshold: 0.0,
            track_error_origin: false,
            noise_symbol_limit: None,
            simplification_trigger_percent: default_trigger_percent(),
            analysis_mode: DomainMode::default(),
            float_format: FloatFormat::default(),
            path_limit: default_path_limit(),
        }
    }
}

impl Settings {
    /// Parses settings from YAML, applying defaults for absent keys.
    pub fn from_yaml_str(source: &str) -> Result<Self, ZonalError> {
        let settings: Settings = serde_yaml::from_str(source)
            .map_err(|err| ZonalError::Serde(ErrorInfo::new("settings-yaml", err.to_string())))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Renders the settings as YAML.
    pub fn to_yaml_string(&self) -> Result<String, ZonalError> {
        serde_yaml::to_string(self)
            .map_err(|err| ZonalError::Serde(ErrorInfo::new("settings-yaml", err.to_string())))
    }

    /// Checks the preconditions every session relies on.
    pub fn validate(&self) -> Result<(), ZonalError> {
        if let Some(limit) = self.noise_symbol_limit {
            if limit == 0 {
                return Err(config_error(
                    "symbol-limit-zero",
                    "noise symbol limit must keep at least one symbol",
                ));
            }
        }
        if !(100..=1000).contains(&self.simplification_trigger_percent) {
            return Err(ZonalError::Config(
                ErrorInfo::new(
                    "trigger-percent-range",
                    "simplification trigger must lie in 100..=1000 percent",
                )
                .with_context("percent", self.simplification_trigger_percent),
            ));
        }
        if !(self.threshold >= 0.0) || self.threshold.is_infinite() {
            return Err(ZonalError::Config(
                ErrorInfo::new("threshold-range", "threshold must be finite and non-negative")
                    .with_context("threshold", self.threshold),
            ));
        }
        if self.path_limit == 0 {
            return Err(ZonalError::Config(ErrorInfo::new(
                "path-limit-zero",
                "path limit must allow at least one pass",
            )));
        }
        Ok(())
    }

    /// Sets `support_atomic`.
    pub fn support_atomic(mut self, enabled: bool) -> Self {
        self.support_atomic = enabled;
        self
    }

    /// Sets `support_unstable_in_loop`.
    pub fn support_unstable_in_loop(mut self, enabled: bool) -> Self {
        self.support_unstable_in_loop = enabled;
        self
    }

    /// Sets `support_backtrace`.
    pub fn support_backtrace(mut self, enabled: bool) -> Self {
        self.support_backtrace = enabled;
        self
    }

    /// Sets `support_verbose`.
    pub fn support_verbose(mut self, enabled: bool) -> Self {
        self.support_verbose = enabled;
        self
    }

    /// Enables divergence tolerance below `threshold`.
    pub fn support_threshold(mut self, threshold: f64) -> Self {
        self.support_threshold = true;
        self.threshold = threshold;
        self
    }

    /// Sets `track_error_origin`.
    pub fn track_error_origin(mut self, enabled: bool) -> Self {
        self.track_error_origin = enabled;
        self
    }

    /// Caps the number of noise symbols per equation.
    pub fn limit_noise_symbols_number(mut self, limit: usize) -> Self {
        self.noise_symbol_limit = Some(limit);
        self
    }

    /// Sets the growth tolerated over the symbol limit before simplifying.
    pub fn simplification_trigger_percent(mut self, percent: u32) -> Self {
        self.simplification_trigger_percent = percent;
        self
    }

    /// Sets the domains tracked outside exploration regions.
    pub fn analysis_mode(mut self, mode: DomainMode) -> Self {
        self.analysis_mode = mode;
        self
    }

    /// Sets the implementation floating-point format.
    pub fn float_format(mut self, format: FloatFormat) -> Self {
        self.float_format = format;
        self
    }

    /// Sets the exploration limit.
    pub fn path_limit(mut self, limit: usize) -> Self {
        self.path_limit = limit;
        self
    }

    /// Symbol count above which an equation gets simplified.
    pub fn simplification_trigger(&self) -> Option<usize> {
        self.noise_symbol_limit.map(|limit| {
            let scaled = limit.saturating_mul(self.simplification_trigger_percent as usize) / 100;
            scaled.max(limit)
        })
    }
}

fn config_error(code: &str, message: &str) -> ZonalError {
    ZonalError::Config(ErrorInfo::new(code, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_fills_absent_keys_with_defaults() {
        let settings = Settings::from_yaml_str("support_verbose: true\npath_limit: 12\n")
            .expect("settings parse");
        assert!(settings.support_verbose);
        assert!(settings.support_atomic);
        assert_eq!(settings.path_limit, 12);
        assert_eq!(settings.analysis_mode, DomainMode::RealAndImplementation);
    }

    #[test]
    fn trigger_out_of_range_is_rejected() {
        let err = Settings::default()
            .simplification_trigger_percent(50)
            .validate()
            .expect_err("trigger below limit");
        match err {
            ZonalError::Config(info) => {
                assert_eq!(info.code, "trigger-percent-range");
                assert_eq!(info.context.get("percent").map(String::as_str), Some("50"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn trigger_scales_the_limit() {
        let settings = Settings::default()
            .limit_noise_symbols_number(40)
            .simplification_trigger_percent(150);
        assert_eq!(settings.simplification_trigger(), Some(60));
        assert_eq!(Settings::default().simplification_trigger(), None);
    }
}
