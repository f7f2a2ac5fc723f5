// src/safety.rs - Range guard between the sensors and the controller
use thiserror::Error;

use crate::config::{SafetyConfig, SetpointConfig};
use crate::diagnostics::{DiagnosticSink, Diagnostics, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RangeViolation {
    #[error("temperature reading is NaN")]
    TemperatureNaN,
    #[error("setpoint is NaN")]
    SetpointNaN,
    #[error("temperature {0:.2} C outside safe range")]
    TemperatureOutOfRange(f32),
    #[error("setpoint {0:.2} C outside allowed range")]
    SetpointOutOfRange(f32),
}

impl RangeViolation {
    /// Diagnostic label reported for this violation.
    pub fn label(&self) -> &'static str {
        match self {
            RangeViolation::TemperatureNaN => "TEMPERATURE NaN",
            RangeViolation::SetpointNaN => "SETPOINT NaN",
            RangeViolation::TemperatureOutOfRange(_) => "TEMP OUT OF SAFE RANGE",
            RangeViolation::SetpointOutOfRange(_) => "SETPOINT OUT OF ALLOWED RANGE",
        }
    }

    /// The offending value.
    pub fn value(&self) -> f32 {
        match self {
            RangeViolation::TemperatureNaN | RangeViolation::SetpointNaN => f32::NAN,
            RangeViolation::TemperatureOutOfRange(v) | RangeViolation::SetpointOutOfRange(v) => *v,
        }
    }
}

/// Stateless validation of a temperature/setpoint pair. All bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeGuard {
    min_safe: f32,
    max_safe: f32,
    set_min: f32,
    set_max: f32,
}

impl RangeGuard {
    pub fn new(safety: &SafetyConfig, setpoint: &SetpointConfig) -> Self {
        Self {
            min_safe: safety.min_safe,
            max_safe: safety.max_safe,
            set_min: setpoint.pot_min as f32,
            set_max: setpoint.pot_max as f32,
        }
    }

    /// First failing check, in order: temperature NaN, setpoint NaN,
    /// temperature range, setpoint range.
    pub fn check(&self, temp_c: f32, set_c: f32) -> Result<(), RangeViolation> {
        if temp_c.is_nan() {
            return Err(RangeViolation::TemperatureNaN);
        }
        if set_c.is_nan() {
            return Err(RangeViolation::SetpointNaN);
        }
        if temp_c < self.min_safe || temp_c > self.max_safe {
            return Err(RangeViolation::TemperatureOutOfRange(temp_c));
        }
        if set_c < self.set_min || set_c > self.set_max {
            return Err(RangeViolation::SetpointOutOfRange(set_c));
        }
        Ok(())
    }

    /// [`RangeGuard::check`], reporting the violation at ERROR.
    pub fn screen<S: DiagnosticSink>(
        &self,
        temp_c: f32,
        set_c: f32,
        diag: &mut Diagnostics<S>,
    ) -> Result<(), RangeViolation> {
        self.check(temp_c, set_c).inspect_err(|violation| {
            diag.value(LogLevel::Error, violation.label(), violation.value());
        })
    }

    pub fn validate<S: DiagnosticSink>(&self, temp_c: f32, set_c: f32, diag: &mut Diagnostics<S>) -> bool {
        self.screen(temp_c, set_c, diag).is_ok()
    }
}
